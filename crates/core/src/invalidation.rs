//! Coarse cache invalidation on LMS mutations.
//!
//! Any change to a course, enrollment, user or profile wipes every tenant's
//! cached aggregates under the reserved prefix. All tenants read the same LMS
//! database, so a mutation tagged for one site can make another site's
//! aggregates stale too; the tenant carried by the event is only logged.

use std::sync::Arc;

use crate::Error;
use crate::cache::{CacheStore, STATS_KEY_PREFIX};
use crate::notify::{EntityKind, MutationEvent, MutationNotifier, MutationSubscriber};

/// Subscribes to mutation events and deletes cached aggregates.
pub struct InvalidationHook {
    cache: Arc<dyn CacheStore>,
}

impl InvalidationHook {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Register one handler per watched entity kind.
    pub fn register(self: &Arc<Self>, notifier: &mut MutationNotifier) {
        for kind in EntityKind::ALL {
            notifier.subscribe(kind, self.clone());
        }
    }

    /// Wildcard delete of every cached aggregate for every tenant.
    pub async fn invalidate_all(&self) -> Result<u64, Error> {
        let deleted = self.cache.delete_by_prefix(STATS_KEY_PREFIX).await?;
        tracing::info!(prefix = STATS_KEY_PREFIX, deleted, "invalidated cached aggregates");
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl MutationSubscriber for InvalidationHook {
    async fn on_mutation(&self, event: &MutationEvent) -> Result<(), Error> {
        tracing::debug!(entity = %event.entity, tenant = ?event.tenant, "mutation received");
        self.invalidate_all().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AggregateName, MemoryCache, ReadThroughCache, cache_key};
    use crate::notify::MutationAction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn seed(cache: &MemoryCache) {
        for tenant in ["site-a", "site-b"] {
            for name in AggregateName::ALL {
                cache.set(&cache_key(tenant, name), b"1".to_vec(), HOUR).await.unwrap();
            }
        }
    }

    fn hooked(cache: Arc<MemoryCache>) -> MutationNotifier {
        let hook = Arc::new(InvalidationHook::new(cache));
        let mut notifier = MutationNotifier::new();
        hook.register(&mut notifier);
        notifier
    }

    #[test]
    fn test_register_covers_every_kind() {
        let notifier = hooked(Arc::new(MemoryCache::new()));
        assert!(EntityKind::ALL.iter().all(|kind| notifier.subscriber_count(*kind) == 1));
    }

    #[tokio::test]
    async fn test_any_mutation_clears_all_tenants() {
        for kind in EntityKind::ALL {
            let cache = Arc::new(MemoryCache::new());
            seed(&cache).await;
            let notifier = hooked(cache.clone());

            let event = MutationEvent::new(kind, MutationAction::Updated).for_tenant("site-a");
            notifier.publish(&event).await.unwrap();
            assert!(cache.is_empty(), "{kind} mutation left entries behind");
        }
    }

    #[tokio::test]
    async fn test_untagged_mutation_clears_all_tenants() {
        let cache = Arc::new(MemoryCache::new());
        seed(&cache).await;
        let notifier = hooked(cache.clone());

        notifier
            .publish(&MutationEvent::new(EntityKind::User, MutationAction::Deleted))
            .await
            .unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_all_reports_deleted_count() {
        let cache = Arc::new(MemoryCache::new());
        seed(&cache).await;
        cache.set("other:key", b"1".to_vec(), HOUR).await.unwrap();
        let hook = InvalidationHook::new(cache.clone());

        assert_eq!(hook.invalidate_all().await.unwrap(), 2 * AggregateName::ALL.len() as u64);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_next_read_after_mutation_recomputes() {
        let cache = Arc::new(MemoryCache::new());
        let read_through = ReadThroughCache::new(cache.clone());
        let notifier = hooked(cache);
        let calls = AtomicUsize::new(0);
        let key = cache_key("default", AggregateName::YearlyStats);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(vec![2020])
        };

        read_through.get_or_compute(&key, compute, HOUR).await.unwrap();
        read_through.get_or_compute(&key, compute, HOUR).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        notifier
            .publish(&MutationEvent::new(EntityKind::Enrollment, MutationAction::Created))
            .await
            .unwrap();

        read_through.get_or_compute(&key, compute, HOUR).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
