//! depgraph-storage: SQLite persistence for the dependency graph.
//!
//! One serialized writer plus a round-robin read pool (`connection`),
//! `PRAGMA user_version` migrations, plain query functions per table, and
//! the two trait implementations the analysis crate plugs in:
//! `SqliteGraphBackend` and `SqliteParseCacheStore`.

pub mod backend;
pub mod cache_store;
pub mod connection;
pub mod migrations;
pub mod queries;

pub use backend::SqliteGraphBackend;
pub use cache_store::SqliteParseCacheStore;
pub use connection::DatabaseManager;

use depgraph_core::errors::StorageError;

pub(crate) fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
