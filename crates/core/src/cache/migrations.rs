//! Schema migrations for the stats database.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its bookkeeping row, so a
//! failed batch leaves the schema at the previous version.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;
use crate::aggregate::timestamp_now;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version; never edit an entry once released, append a new one.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "cache_entries",
        sql: include_str!("../../migrations/001_cache_entries.sql"),
    },
    Migration {
        version: 2,
        name: "aggregate_snapshots",
        sql: include_str!("../../migrations/002_aggregate_snapshots.sql"),
    },
];

/// Bring the schema up to the latest version. Returns how many migrations ran.
///
/// # Errors
///
/// `MigrationFailed` names the version whose SQL was rejected.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    conn.call(|conn| -> Result<usize, Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current = current_version(conn)?;
        let mut applied = 0;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql).map_err(|e| {
                Error::MigrationFailed(format!("version {} ({}): {e}", migration.version, migration.name))
            })?;
            tx.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, timestamp_now()],
            )?;
            tx.commit()?;

            tracing::debug!(version = migration.version, name = migration.name, "applied migration");
            applied += 1;
        }

        Ok(applied)
    })
    .await
    .map_err(Error::from)
}

fn current_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
}
