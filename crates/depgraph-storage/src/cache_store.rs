//! Persistent `ParseCacheStore` on the `parse_cache` table.

use std::path::Path;
use std::sync::Arc;

use depgraph_core::errors::{ParseError, StorageError};
use depgraph_core::traits::{CacheKey, ParseCacheStore};

use crate::connection::DatabaseManager;
use crate::queries::parse_cache;

pub struct SqliteParseCacheStore {
    db: Arc<DatabaseManager>,
}

fn cache_err(e: StorageError) -> ParseError {
    ParseError::Cache {
        message: e.to_string(),
    }
}

impl SqliteParseCacheStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open(path)?)))
    }

    /// Drop entries created before `cutoff` (unix seconds).
    pub fn prune_older_than(&self, cutoff: i64) -> Result<usize, StorageError> {
        let removed = self
            .db
            .with_writer(|conn| parse_cache::prune_older_than(conn, cutoff))?;
        tracing::info!(removed, "parse cache pruned");
        Ok(removed)
    }
}

impl ParseCacheStore for SqliteParseCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, ParseError> {
        self.db
            .with_reader(|conn| parse_cache::get(conn, key.content_hash, key.unit_kind))
            .map_err(cache_err)
    }

    fn put(&self, key: &CacheKey, record_json: &str) -> Result<(), ParseError> {
        let inserted = self
            .db
            .with_writer(|conn| {
                parse_cache::insert(conn, key.content_hash, key.unit_kind, record_json)
            })
            .map_err(cache_err)?;
        if !inserted {
            tracing::trace!(hash = key.content_hash, kind = key.unit_kind, "parse cache entry already present");
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, ParseError> {
        self.db.with_reader(parse_cache::count).map_err(cache_err)
    }
}
