//! Read-through cache over a [`CacheStore`].
//!
//! There is no single-flight guard: concurrent misses on one key each run the
//! computation and the last write wins. Computations are pure functions of the
//! source at call time, so every write is a valid value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::CacheStore;
use crate::Error;

/// Get-or-compute front end for a shared cache store.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// The backing store, shared with the invalidation hook.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the live entry under `key`, or run `compute`, store its result
    /// for `ttl` and return it.
    ///
    /// A failed computation is returned as-is and nothing is stored. If the
    /// store cannot be read the value is computed and returned without being
    /// cached; a failed write is logged and the value is still returned. An
    /// entry that no longer decodes counts as a miss.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, compute: F, ttl: Duration) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let store_reachable = match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    tracing::debug!(key, "aggregate cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    true
                }
            },
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache store unavailable, computing without caching");
                false
            }
        };

        tracing::debug!(key, "aggregate cache miss");
        let value = compute().await?;

        if store_reachable {
            match serde_json::to_vec(&value) {
                Ok(bytes) => {
                    if let Err(e) = self.store.set(key, bytes, ttl).await {
                        tracing::warn!(key, error = %e, "failed to cache aggregate");
                    }
                }
                Err(e) => tracing::warn!(key, error = %e, "failed to encode aggregate for caching"),
            }
        }

        Ok(value)
    }
}
