//! Database connection management with pragma configuration.
//!
//! This module handles opening the edstats SQLite database, applying
//! required pragmas for performance and concurrency (WAL mode), and running
//! migrations. One database holds both the cache entries and the aggregate
//! snapshot tables.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Stats database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the connection.
#[derive(Clone, Debug)]
pub struct StatsDb {
    pub(crate) conn: Connection,
}

impl StatsDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = StatsDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_file_twice_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edstats.sqlite");

        let db = StatsDb::open(&path).await.unwrap();
        drop(db);
        let db = StatsDb::open(&path).await.unwrap();

        let applied: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(applied, 2);
    }
}
