//! PRAGMA configuration applied to every connection.
//!
//! WAL, NORMAL sync, foreign keys ON (edge rows cascade with their nodes),
//! 5s busy timeout.

use depgraph_core::errors::StorageError;
use rusqlite::Connection;

pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

pub fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA query_only = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply read pragmas: {e}"),
    })
}

/// True when the connection runs in WAL mode. In-memory databases report
/// `memory` and return false.
pub fn is_wal(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
