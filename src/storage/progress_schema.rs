//! Progress database schema and migrations.
//!
//! Migrations are applied in order inside a transaction each, and recorded in
//! `schema_migrations` so reopening a database is a no-op.

use rusqlite::Connection;

use crate::error::{GymError, Result};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("../../migrations/001_gym_progress.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("../../migrations/002_gym_history.sql"),
    },
];

/// Newest schema version this build knows about.
#[must_use]
pub fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Bring the schema up to date. Returns the version now in place.
///
/// # Errors
/// Returns [`GymError::Database`] if a migration fails, or if the database was
/// written by a newer build.
pub fn run_migrations(conn: &mut Connection) -> Result<i32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
            version INTEGER PRIMARY KEY,\
            applied_at TEXT DEFAULT (datetime('now'))\
        );",
    )?;

    let mut current = schema_version(conn)?;
    if current > latest_version() {
        return Err(GymError::Database(format!(
            "database schema version {current} is newer than supported version {}",
            latest_version()
        )));
    }

    let start = current;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| GymError::Database(format!("apply migration {}: {e}", migration.version)))?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [migration.version],
        )?;
        tx.commit()?;
        tracing::debug!(version = migration.version, "Applied migration");
        current = migration.version;
    }

    Ok(current)
}

fn schema_version(conn: &Connection) -> Result<i32> {
    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i32>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn creates_both_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), 2);
        assert!(table_exists(&conn, "gym_progress"));
        assert!(table_exists(&conn, "gym_history"));
    }

    #[test]
    fn rerun_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), 2);
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn partial_schema_is_upgraded() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (\
                version INTEGER PRIMARY KEY,\
                applied_at TEXT DEFAULT (datetime('now'))\
            );",
        )
        .unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])
            .unwrap();
        assert!(!table_exists(&conn, "gym_history"));

        assert_eq!(run_migrations(&mut conn).unwrap(), 2);
        assert!(table_exists(&conn, "gym_history"));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (99)", [])
            .unwrap();
        assert!(matches!(
            run_migrations(&mut conn),
            Err(GymError::Database(_))
        ));
    }

    #[test]
    fn box_level_is_checked() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        let err = conn.execute(
            "INSERT INTO gym_progress (skill_key, box_level, next_review, last_result) \
             VALUES ('x', 9, 0, 'correct')",
            [],
        );
        assert!(err.is_err());
    }
}
