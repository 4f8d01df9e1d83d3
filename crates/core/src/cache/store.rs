//! Cache store interface.

use std::time::Duration;

use crate::Error;

/// Key/value store with per-entry expiry.
///
/// Values are opaque bytes. Expired entries must read as absent.
/// `delete_by_prefix` must remove all matching keys in one atomic step so a
/// concurrent reader sees either the old entry or none.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Insert or overwrite an entry expiring `ttl` from now.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error>;

    /// Delete every entry whose key starts with `prefix`; returns the count.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error>;

    /// Drop entries that have already expired; returns the count.
    async fn purge_expired(&self) -> Result<u64, Error>;
}
