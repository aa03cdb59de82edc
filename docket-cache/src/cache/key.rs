//! Cache keys and invalidation targets.
//!
//! Keys are colon-joined segments with the resource first, so that a
//! resource's prefix (`"cases:"`) covers its list, page, and item entries.

use docket_core::{RecordId, ResourceKind};
use std::fmt;

/// Separator between key segments.
pub const SEPARATOR: char = ':';

/// A request cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Start a key from its first segment.
    pub fn new(first: impl fmt::Display) -> Self {
        Self(first.to_string())
    }

    /// Append a segment.
    pub fn push(mut self, segment: impl fmt::Display) -> Self {
        self.0.push(SEPARATOR);
        self.0.push_str(&segment.to_string());
        self
    }

    /// `"<resource>:list"`
    pub fn list(kind: ResourceKind) -> Self {
        Self::new(kind.cache_prefix()).push("list")
    }

    /// `"<resource>:list:page=<n>"`
    pub fn page(kind: ResourceKind, page: u32) -> Self {
        Self::list(kind).push(format_args!("page={}", page))
    }

    /// `"<resource>:<id>"`
    pub fn item(kind: ResourceKind, id: &RecordId) -> Self {
        Self::new(kind.cache_prefix()).push(id)
    }

    /// `"<resource>:"`, matching every key of the resource.
    pub fn prefix(kind: ResourceKind) -> Self {
        let mut key = Self::new(kind.cache_prefix());
        key.0.push(SEPARATOR);
        key
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `self` is the exact key or a prefix of it.
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(self.0.as_str())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// What [`RequestCache::invalidate`](super::RequestCache::invalidate)
/// accepts: one key or prefix, or an ordered sequence of them.
pub trait InvalidationTarget {
    /// Patterns in the order they are applied.
    fn into_patterns(self) -> Vec<String>;
}

impl InvalidationTarget for &str {
    fn into_patterns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl InvalidationTarget for String {
    fn into_patterns(self) -> Vec<String> {
        vec![self]
    }
}

impl InvalidationTarget for &String {
    fn into_patterns(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl InvalidationTarget for CacheKey {
    fn into_patterns(self) -> Vec<String> {
        vec![self.0]
    }
}

impl InvalidationTarget for &CacheKey {
    fn into_patterns(self) -> Vec<String> {
        vec![self.0.clone()]
    }
}

impl<T: AsRef<str>> InvalidationTarget for Vec<T> {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|p| p.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>> InvalidationTarget for &[T] {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|p| p.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>, const N: usize> InvalidationTarget for [T; N] {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|p| p.as_ref().to_string()).collect()
    }
}
