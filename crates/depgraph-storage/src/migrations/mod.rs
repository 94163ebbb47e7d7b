//! Schema migrations keyed on `PRAGMA user_version`.

pub mod v001_initial;

use depgraph_core::errors::StorageError;
use rusqlite::Connection;

const MIGRATIONS: &[(&str, u32)] = &[(v001_initial::MIGRATION_SQL, 1)];

/// Apply every migration newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = conn
        .pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })?;

    for &(sql, version) in MIGRATIONS {
        if current >= version {
            continue;
        }
        conn.execute_batch(sql)
            .map_err(|e| StorageError::MigrationFailed {
                version,
                message: e.to_string(),
            })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| StorageError::MigrationFailed {
                version,
                message: e.to_string(),
            })?;
        tracing::info!(version, "applied migration");
    }
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

/// Highest version this build knows how to apply.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |&(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }
}
