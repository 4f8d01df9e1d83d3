//! SQLite-backed cache entries.
//!
//! Implements [`CacheStore`] on the `cache_entries` table so several server
//! processes pointed at the same database share one cache.

use std::time::Duration;

use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::StatsDb;
use super::store::CacheStore;
use crate::Error;
use crate::aggregate::format_timestamp;

// Longer TTLs are clamped so the expiry stays a four-digit-year timestamp
// and keeps sorting correctly as text.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

fn expiry_after(ttl: Duration) -> String {
    let ttl = chrono::Duration::from_std(ttl.min(MAX_TTL)).unwrap_or_else(|_| chrono::Duration::zero());
    format_timestamp(Utc::now() + ttl)
}

#[async_trait::async_trait]
impl CacheStore for StatsDb {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        let now = format_timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                    params![key, now],
                    |row| row.get(0),
                );

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let created_at = format_timestamp(Utc::now());
        let expires_at = expiry_after(ttl);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, created_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at",
                    params![key, value, created_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1",
                    params![prefix],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = format_timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_set_and_get() {
        let db = StatsDb::open_in_memory().await.unwrap();
        db.set("edx_stats:default:total_stats", b"{\"a\":1}".to_vec(), HOUR)
            .await
            .unwrap();

        let value = db.get("edx_stats:default:total_stats").await.unwrap();
        assert_eq!(value, Some(b"{\"a\":1}".to_vec()));
        assert_eq!(db.get("edx_stats:default:yearly_stats").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = StatsDb::open_in_memory().await.unwrap();
        db.set("k", b"old".to_vec(), HOUR).await.unwrap();
        db.set("k", b"new".to_vec(), HOUR).await.unwrap();
        assert_eq!(db.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let db = StatsDb::open_in_memory().await.unwrap();
        db.set("k", b"v".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(db.get("k").await.unwrap(), None);
        assert_eq!(db.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_prefix_is_literal() {
        let db = StatsDb::open_in_memory().await.unwrap();
        db.set("edx_stats:a:yearly_stats", b"1".to_vec(), HOUR).await.unwrap();
        db.set("edx_stats:b:yearly_stats", b"2".to_vec(), HOUR).await.unwrap();
        db.set("edx_stats%:x", b"3".to_vec(), HOUR).await.unwrap();

        assert_eq!(db.delete_by_prefix("edx_stats:a:").await.unwrap(), 1);
        assert_eq!(db.delete_by_prefix("edx_stats:").await.unwrap(), 1);
        assert_eq!(db.get("edx_stats%:x").await.unwrap(), Some(b"3".to_vec()));
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let db = StatsDb::open_in_memory().await.unwrap();
        db.set("k", b"v".to_vec(), Duration::MAX).await.unwrap();
        assert_eq!(db.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
