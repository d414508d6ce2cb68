//! Lightweight migration runner for rusqlite.
//!
//! Migrations are compiled into the binary from the `migrations/` directory,
//! applied versions are tracked in `schema_versions`, and pending ones run in
//! order the first time a store is opened.

use std::collections::HashSet;

use rusqlite::{params, Connection};
use tracing::{debug, info};

/// `(version, name, sql)` in ascending version order.
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "001_thread_records",
    include_str!("../migrations/001_thread_records.sql"),
)];

/// Pragmas every connection sets for safe access from concurrent hook processes.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
}

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<usize> {
    configure_connection(conn)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )?;

    let applied: HashSet<i64> = conn
        .prepare("SELECT version FROM schema_versions")?
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    let mut pending = 0;
    for (version, name, sql) in MIGRATIONS {
        if applied.contains(version) {
            continue;
        }

        // Another hook process may be migrating the same file; the DDL is
        // idempotent and the version insert is OR IGNORE.
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT OR IGNORE INTO schema_versions (version, name) VALUES (?1, ?2)",
            params![version, name],
        )?;
        tx.commit()?;

        info!(
            component = "migrations",
            event = "migration.applied",
            version = version,
            name = %name,
            "Applied migration"
        );
        pending += 1;
    }

    debug!(
        component = "migrations",
        event = "migrations.complete",
        total = MIGRATIONS.len(),
        applied = pending,
        "Migration check complete"
    );

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once() {
        let mut conn = Connection::open_in_memory().expect("open");
        assert_eq!(run_migrations(&mut conn).expect("first run"), MIGRATIONS.len());
        assert_eq!(run_migrations(&mut conn).expect("second run"), 0);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'thread_records'",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(tables, 1);
    }

    #[test]
    fn versions_are_ascending() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|(v, _, _)| *v).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }
}
