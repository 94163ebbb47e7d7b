//! Content-hash keyed store for serialized structural records.

use crate::errors::ParseError;

/// Cache key: content hash plus the unit kind tag the record was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_hash: u64,
    pub unit_kind: &'static str,
}

/// Append-only store mapping a content hash to its serialized record.
///
/// Writers of the same key always carry identical payloads, so a store only
/// needs per-write atomicity; `put` on an existing key must not fail.
pub trait ParseCacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, ParseError>;

    fn put(&self, key: &CacheKey, record_json: &str) -> Result<(), ParseError>;

    fn len(&self) -> Result<usize, ParseError>;

    fn is_empty(&self) -> Result<bool, ParseError> {
        Ok(self.len()? == 0)
    }
}
