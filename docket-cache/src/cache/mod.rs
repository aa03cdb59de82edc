//! Request cache with in-flight coalescing.
//!
//! # Semantics
//!
//! - A key with a resolved value younger than the caller's TTL is a hit and
//!   returns the stored `Arc` without calling the fetcher.
//! - A key with a fetch in flight is joined: every caller awaits the same
//!   future, whatever its TTL.
//! - Anything else is a miss: the fetcher runs once, under the table lock,
//!   and the pending fetch is recorded in the same critical section, so
//!   racing callers join it. Fetchers must only build their future and not
//!   touch the cache synchronously.
//! - A failed fetch removes the entry and every waiter receives the error.
//!   The cache never retries on its own.
//!
//! # Example
//!
//! ```ignore
//! let cache = RequestCache::new(CacheConfig::default());
//!
//! let clients = cache
//!     .get("clients:list", || api.list_clients(), Duration::from_secs(45))
//!     .await?;
//!
//! // After a write, drop every cached client read.
//! cache.invalidate("clients:");
//! ```

pub mod key;
pub mod request_cache;
pub mod stats;

pub use key::{CacheKey, InvalidationTarget};
pub use request_cache::{CacheConfig, RequestCache};
pub use stats::CacheStats;
