//! Parse cache: moka in front of an optional persistent store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use depgraph_core::traits::{CacheKey, ParseCacheStore};
use moka::sync::Cache;
use serde::Serialize;

use super::types::StructuralRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Records keyed by (content hash, unit kind). Holds no graph identity.
pub struct ParseCache {
    memory: Cache<CacheKey, Arc<StructuralRecord>>,
    store: Option<Arc<dyn ParseCacheStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ParseCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            memory: Cache::builder().max_capacity(capacity).build(),
            store: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ParseCacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Look up a record, promoting persistent hits into memory.
    /// Store errors and undecodable payloads count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<StructuralRecord>> {
        if let Some(record) = self.memory.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(record);
        }
        if let Some(store) = &self.store {
            match store.get(key) {
                Ok(Some(json)) => match serde_json::from_str::<StructuralRecord>(&json) {
                    Ok(record) => {
                        let record = Arc::new(record);
                        self.memory.insert(*key, Arc::clone(&record));
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Some(record);
                    }
                    Err(e) => {
                        tracing::warn!(hash = key.content_hash, error = %e, "discarding undecodable cached record");
                    }
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "parse cache store read failed"),
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: CacheKey, record: Arc<StructuralRecord>) {
        if let Some(store) = &self.store {
            match serde_json::to_string(record.as_ref()) {
                Ok(json) => {
                    if let Err(e) = store.put(&key, &json) {
                        tracing::warn!(error = %e, "parse cache store write failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "cannot serialize structural record"),
            }
        }
        self.memory.insert(key, record);
    }

    pub fn stats(&self) -> CacheStats {
        self.memory.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.memory.entry_count(),
        }
    }

    /// Drop in-memory entries; the persistent store is untouched.
    pub fn clear_memory(&self) {
        self.memory.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::errors::ParseError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<(u64, &'static str), String>>);

    impl ParseCacheStore for MapStore {
        fn get(&self, key: &CacheKey) -> Result<Option<String>, ParseError> {
            Ok(self.0.lock().unwrap().get(&(key.content_hash, key.unit_kind)).cloned())
        }
        fn put(&self, key: &CacheKey, json: &str) -> Result<(), ParseError> {
            self.0
                .lock()
                .unwrap()
                .insert((key.content_hash, key.unit_kind), json.to_string());
            Ok(())
        }
        fn len(&self) -> Result<usize, ParseError> {
            Ok(self.0.lock().unwrap().len())
        }
    }

    fn key(hash: u64) -> CacheKey {
        CacheKey {
            content_hash: hash,
            unit_kind: "source_module",
        }
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = ParseCache::new(16);
        assert!(cache.get(&key(1)).is_none());
        cache.put(key(1), Arc::new(StructuralRecord::default()));
        assert!(cache.get(&key(1)).is_some());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn persistent_store_survives_memory_loss() {
        let store = Arc::new(MapStore::default());
        let cache = ParseCache::new(16).with_store(store.clone());
        let record = StructuralRecord {
            loc: 7,
            ..Default::default()
        };
        cache.put(key(9), Arc::new(record.clone()));
        assert_eq!(store.len().unwrap(), 1);

        let fresh = ParseCache::new(16).with_store(store);
        assert_eq!(fresh.get(&key(9)).as_deref(), Some(&record));
    }
}
