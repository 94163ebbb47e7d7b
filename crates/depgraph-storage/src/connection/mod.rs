//! Connection management: one serialized writer, pooled readers.

pub mod pool;
pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use depgraph_core::errors::StorageError;
use rusqlite::Connection;

use self::pool::ReadPool;
use self::pragmas::apply_pragmas;
use crate::{migrations, sqlite_err};

/// Owns the write connection and, for file databases, the read pool.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    /// `None` for in-memory databases, which are private to one connection;
    /// reads then go through the writer.
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open (or create) a database file, apply pragmas, run migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_readers(path, ReadPool::default_size())
    }

    pub fn open_with_readers(path: &Path, readers: usize) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(sqlite_err)?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let readers = ReadPool::open(path, readers)?;
        tracing::debug!(path = %path.display(), readers = readers.size(), "database opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (tests, throwaway graphs).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(sqlite_err)?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: None,
            path: None,
        })
    }

    /// Run `f` on the serialized write connection.
    pub fn with_writer<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::SqliteError {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Run `f` on a pooled read connection.
    pub fn with_reader<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        match self.readers {
            Some(ref pool) => pool.with_conn(f),
            None => self.with_writer(f),
        }
    }

    /// Truncate the WAL after a large ingestion.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(sqlite_err)
        })
    }

    /// Database file path, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<u32, StorageError> {
        self.with_writer(|conn| migrations::current_version(conn))
    }
}
