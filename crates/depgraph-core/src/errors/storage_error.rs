//! SQLite storage errors.

use super::error_code::{self, DepgraphErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Migration to v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },
}

impl DepgraphErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        error_code::STORAGE_ERROR
    }
}
