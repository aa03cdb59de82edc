//! Request cache implementation.
//!
//! The table maps each key to a [`Slot`]: either a fetch still in flight or a
//! resolved value with the instant it resolved. The table lock is only taken
//! for synchronous bookkeeping and is never held across an `.await`.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use docket_core::{CacheError, DocketError, DocketResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::InvalidationTarget;
use super::stats::{CacheStats, StatsCounters};

/// Default time-to-live for resolved entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(45);

type StoredValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, DocketResult<StoredValue>>>;

/// Configuration for the request cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used by [`RequestCache::get_default`] when no override matches.
    pub default_ttl: Duration,
    /// Per-prefix TTLs; the longest matching prefix wins.
    pub ttl_overrides: Vec<(String, Duration)>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            ttl_overrides: Vec::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Use `ttl` for every key starting with `prefix`.
    pub fn with_ttl_override(mut self, prefix: impl Into<String>, ttl: Duration) -> Self {
        let prefix = prefix.into();
        self.ttl_overrides.retain(|(existing, _)| *existing != prefix);
        self.ttl_overrides.push((prefix, ttl));
        self
    }

    /// TTL that applies to `key`.
    pub fn ttl_for(&self, key: &str) -> Duration {
        self.ttl_overrides
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, ttl)| *ttl)
            .unwrap_or(self.default_ttl)
    }
}

/// One cache entry. An entry is always exactly one of the two states.
enum Slot {
    Pending {
        generation: u64,
        fetch: SharedFetch,
    },
    Ready {
        value: StoredValue,
        cached_at: Instant,
    },
}

enum Lookup {
    Hit(StoredValue),
    Join(SharedFetch),
    Miss,
}

enum Prepared {
    Ready(StoredValue),
    Pending(SharedFetch),
}

struct Inner {
    entries: Mutex<HashMap<String, Slot>>,
    next_generation: AtomicU64,
    stats: StatsCounters,
    config: CacheConfig,
}

impl Inner {
    // Every mutation leaves the table consistent, so a poisoned lock is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of the fetch started as `generation`.
    ///
    /// Does nothing if the entry was invalidated, cleared, or replaced while
    /// the fetch was in flight.
    fn settle(&self, key: &str, generation: u64, outcome: &DocketResult<StoredValue>) {
        let mut entries = self.entries();
        let current = matches!(
            entries.get(key),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );
        if !current {
            debug!(key, generation, "Dropping stale fetch result");
            return;
        }

        match outcome {
            Ok(value) => {
                entries.insert(
                    key.to_string(),
                    Slot::Ready {
                        value: Arc::clone(value),
                        cached_at: Instant::now(),
                    },
                );
            }
            Err(err) => {
                entries.remove(key);
                self.stats.record_failure();
                warn!(key, error = %err, "Request cache fetch failed");
            }
        }
    }
}

fn lookup(entries: &HashMap<String, Slot>, key: &str, ttl: Duration) -> Lookup {
    match entries.get(key) {
        Some(Slot::Ready { value, cached_at }) if cached_at.elapsed() < ttl => {
            Lookup::Hit(Arc::clone(value))
        }
        Some(Slot::Pending { fetch, .. }) => Lookup::Join(fetch.clone()),
        _ => Lookup::Miss,
    }
}

fn downcast<T: Send + Sync + 'static>(key: &str, value: StoredValue) -> DocketResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
        CacheError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        }
        .into()
    })
}

/// In-memory request cache with in-flight coalescing.
///
/// Cloning is cheap and every clone shares the same table, so one instance
/// is created at startup and handed to whatever needs it.
///
/// Values of any `Send + Sync + 'static` type can be stored; they come back
/// as `Arc<T>`, and repeated hits on the same entry return the same `Arc`.
///
/// Fetches are spawned onto the current Tokio runtime and always run to
/// completion, even if every caller stops waiting for them. A miss outside a
/// runtime is an error.
#[derive(Clone)]
pub struct RequestCache {
    inner: Arc<Inner>,
}

impl RequestCache {
    /// Create a new request cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                stats: StatsCounters::default(),
                config,
            }),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the value cached under `key`, fetching it if needed.
    ///
    /// - A resolved entry younger than `ttl` is returned as is.
    /// - A fetch already in flight for `key` is awaited instead of starting
    ///   another, regardless of `ttl`.
    /// - Otherwise `fetcher` is called once and its future is recorded before
    ///   this call first suspends.
    ///
    /// `fetcher` runs while the table is locked. It should only build the
    /// future and must not call into this cache itself; the future it returns
    /// is free to do anything.
    ///
    /// If the fetch fails the entry is removed and every caller waiting on it
    /// receives the error; the next call starts a fresh fetch.
    ///
    /// # Errors
    ///
    /// Besides the fetch's own error, a miss outside a Tokio runtime returns
    /// [`CacheError::NoRuntime`] without calling `fetcher`.
    pub async fn get<K, T, F, Fut>(
        &self,
        key: K,
        fetcher: F,
        ttl: Duration,
    ) -> DocketResult<Arc<T>>
    where
        K: AsRef<str>,
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocketResult<T>> + Send + 'static,
    {
        let key = key.as_ref();
        let fetch = match self.prepare(key, ttl, fetcher)? {
            Prepared::Ready(value) => return downcast(key, value),
            Prepared::Pending(fetch) => fetch,
        };
        let value = fetch.await?;
        downcast(key, value)
    }

    /// [`get`](Self::get) with the TTL configured for `key`.
    pub async fn get_default<K, T, F, Fut>(&self, key: K, fetcher: F) -> DocketResult<Arc<T>>
    where
        K: AsRef<str>,
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocketResult<T>> + Send + 'static,
    {
        let ttl = self.inner.config.ttl_for(key.as_ref());
        self.get(key, fetcher, ttl).await
    }

    fn prepare<T, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> DocketResult<Prepared>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocketResult<T>> + Send + 'static,
    {
        let mut entries = self.inner.entries();
        match lookup(&entries, key, ttl) {
            Lookup::Hit(value) => return Ok(self.hit(key, value)),
            Lookup::Join(fetch) => return Ok(self.join(key, fetch)),
            Lookup::Miss => {}
        }

        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime {
            key: key.to_string(),
        })?;

        // The fetcher is called with the table locked so that the miss check
        // and the pending insert form one step.
        self.inner.stats.record_miss();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let fetch = self.spawn_fetch(&runtime, key, generation, fetcher());
        entries.insert(
            key.to_string(),
            Slot::Pending {
                generation,
                fetch: fetch.clone(),
            },
        );
        debug!(key, generation, "Request cache miss, fetching");
        Ok(Prepared::Pending(fetch))
    }

    fn hit(&self, key: &str, value: StoredValue) -> Prepared {
        self.inner.stats.record_hit();
        debug!(key, "Request cache hit");
        Prepared::Ready(value)
    }

    fn join(&self, key: &str, fetch: SharedFetch) -> Prepared {
        self.inner.stats.record_coalesced();
        debug!(key, "Joining in-flight fetch");
        Prepared::Pending(fetch)
    }

    fn spawn_fetch<T, Fut>(
        &self,
        runtime: &Handle,
        key: &str,
        generation: u64,
        future: Fut,
    ) -> SharedFetch
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = DocketResult<T>> + Send + 'static,
    {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        let task_inner = inner.clone();
        let task_key = key.to_string();
        let handle = runtime.spawn(async move {
            let outcome = future.await.map(|value| Arc::new(value) as StoredValue);
            if let Some(inner) = task_inner.upgrade() {
                inner.settle(&task_key, generation, &outcome);
            }
            outcome
        });

        let key = key.to_string();
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let aborted = CacheError::FetchAborted {
                        key: key.clone(),
                        reason: join_error.to_string(),
                    };
                    let outcome = Err(DocketError::from(aborted));
                    if let Some(inner) = inner.upgrade() {
                        inner.settle(&key, generation, &outcome);
                    }
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Remove every entry whose key equals or starts with one of the
    /// patterns, applying the patterns in order.
    ///
    /// Fetches still in flight for removed keys keep running and resolve for
    /// their callers, but their results are not stored.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate<I: InvalidationTarget>(&self, target: I) -> usize {
        let patterns = target.into_patterns();
        let mut entries = self.inner.entries();
        let mut removed = 0;
        for pattern in &patterns {
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(pattern.as_str()));
            removed += before - entries.len();
        }
        drop(entries);

        self.inner.stats.record_invalidated(removed);
        debug!(?patterns, removed, "Request cache invalidated");
        removed
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.inner.entries();
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.inner.stats.record_invalidated(removed);
        debug!(removed, "Request cache cleared");
        removed
    }

    /// True if `key` has an entry, pending or resolved, fresh or not.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries().contains_key(key)
    }

    /// True if a fetch for `key` is in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        matches!(self.inner.entries().get(key), Some(Slot::Pending { .. }))
    }

    /// True if `key` holds a resolved value younger than `ttl`.
    pub fn is_fresh(&self, key: &str, ttl: Duration) -> bool {
        matches!(
            self.inner.entries().get(key),
            Some(Slot::Ready { cached_at, .. }) if cached_at.elapsed() < ttl
        )
    }

    /// Number of entries, pending or resolved.
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entry_count = self.len();
        self.inner.stats.snapshot(entry_count)
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish()
    }
}
