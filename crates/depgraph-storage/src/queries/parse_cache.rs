//! parse_cache queries: get by (content hash, unit kind), insert-once, count.

use depgraph_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::sqlite_err;

/// SQLite integers are signed; the hash is stored bit-for-bit.
fn to_sql_hash(hash: u64) -> i64 {
    hash as i64
}

pub fn get(conn: &Connection, content_hash: u64, unit_kind: &str) -> Result<Option<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT record_json FROM parse_cache
             WHERE content_hash = ?1 AND unit_kind = ?2",
        )
        .map_err(sqlite_err)?;
    stmt.query_row(params![to_sql_hash(content_hash), unit_kind], |row| row.get(0))
        .optional()
        .map_err(sqlite_err)
}

/// Insert unless the key already exists. Same key means same content, so
/// the first writer wins and later writes are no-ops.
pub fn insert(
    conn: &Connection,
    content_hash: u64,
    unit_kind: &str,
    record_json: &str,
) -> Result<bool, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO parse_cache (content_hash, unit_kind, record_json)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(sqlite_err)?;
    let inserted = stmt
        .execute(params![to_sql_hash(content_hash), unit_kind, record_json])
        .map_err(sqlite_err)?;
    Ok(inserted > 0)
}

pub fn count(conn: &Connection) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM parse_cache", [], |row| row.get(0))
        .map_err(sqlite_err)?;
    Ok(n as usize)
}

/// Drop entries older than `cutoff` (unix seconds). Returns rows removed.
pub fn prune_older_than(conn: &Connection, cutoff: i64) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM parse_cache WHERE created_at < ?1", params![cutoff])
        .map_err(sqlite_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn high_bit_hashes_survive() {
        let conn = setup_db();
        let hash = u64::MAX - 7;
        assert!(insert(&conn, hash, "module", "{}").unwrap());
        assert_eq!(get(&conn, hash, "module").unwrap().as_deref(), Some("{}"));
        assert!(get(&conn, hash, "metadata").unwrap().is_none());
    }

    #[test]
    fn second_insert_is_ignored() {
        let conn = setup_db();
        assert!(insert(&conn, 1, "module", "first").unwrap());
        assert!(!insert(&conn, 1, "module", "second").unwrap());
        assert_eq!(get(&conn, 1, "module").unwrap().as_deref(), Some("first"));
        assert_eq!(count(&conn).unwrap(), 1);
    }
}
