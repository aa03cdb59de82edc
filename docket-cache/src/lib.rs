//! Docket Cache
//!
//! In-memory request cache for API reads. Concurrent callers asking for the
//! same key share one in-flight fetch, resolved values are kept for a TTL,
//! and entries are dropped by exact key or key prefix after writes.

pub mod cache;

pub use cache::{CacheConfig, CacheKey, CacheStats, InvalidationTarget, RequestCache};
