//! In-process cache store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::store::CacheStore;
use crate::Error;

// Keeps `Instant` arithmetic from overflowing on absurd TTLs.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache store held in a mutex-guarded map.
///
/// Entries are private to the process. Every operation takes the single lock,
/// so prefix deletion is atomic with respect to readers.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>, Error> {
        self.entries
            .lock()
            .map_err(|_| Error::CacheUnavailable("memory cache lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let expires_at = Instant::now() + ttl.min(MAX_TTL);
        self.lock()?.insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}
