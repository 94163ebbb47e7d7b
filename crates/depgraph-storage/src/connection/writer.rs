//! Write transactions.

use depgraph_core::errors::StorageError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::sqlite_err;

/// Run `f` inside a `BEGIN IMMEDIATE` transaction: the write lock is taken
/// up front, and an `Err` from `f` rolls everything back.
pub fn with_immediate_transaction<F, T, E>(conn: &Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| StorageError::SqliteError {
            message: format!("failed to begin immediate transaction: {e}"),
        })?;

    let result = f(&tx)?;

    tx.commit().map_err(sqlite_err)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL) STRICT;")
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn commits_on_ok() {
        let conn = conn();
        with_immediate_transaction::<_, _, StorageError>(&conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", []).map_err(sqlite_err)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn rolls_back_on_err() {
        let conn = conn();
        let result = with_immediate_transaction::<_, (), StorageError>(&conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", []).map_err(sqlite_err)?;
            Err(StorageError::SqliteError {
                message: "boom".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }
}
