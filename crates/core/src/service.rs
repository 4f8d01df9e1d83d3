//! Aggregate read and refresh surface.
//!
//! [`StatsService`] is what outer layers call. Live reads go through the
//! read-through cache under tenant-scoped keys; snapshot reads go straight to
//! the durable tables. A source outage never fails a live read: it is logged
//! and the caller gets an empty list or zero totals, which are not cached.

use std::sync::Arc;
use std::time::Duration;

use crate::Error;
use crate::aggregate::{
    CountryAggregate, CourseAggregate, TotalsAggregate, YearlyAggregate, queries, timestamp_now,
};
use crate::cache::{AggregateName, CacheStore, ReadThroughCache, SnapshotStore, cache_key};
use crate::config::AppConfig;
use crate::refresh::{RefreshReport, SnapshotRefresher};
use crate::source::SourceStore;
use crate::tenant::TenantResolver;

/// Facade over the aggregate pipeline.
pub struct StatsService {
    source: Arc<dyn SourceStore>,
    snapshots: Arc<dyn SnapshotStore>,
    tenant: Arc<dyn TenantResolver>,
    cache: ReadThroughCache,
    refresher: SnapshotRefresher,
    ttl: Duration,
    top_items: usize,
}

impl StatsService {
    /// Wire the service from its collaborators and the loaded configuration.
    pub fn new(
        config: &AppConfig, source: Arc<dyn SourceStore>, cache: Arc<dyn CacheStore>,
        snapshots: Arc<dyn SnapshotStore>, tenant: Arc<dyn TenantResolver>,
    ) -> Self {
        let refresher =
            SnapshotRefresher::new(source.clone(), snapshots.clone()).with_prune_orphans(config.prune_orphans);
        Self {
            source,
            snapshots,
            tenant,
            cache: ReadThroughCache::new(cache),
            refresher,
            ttl: config.cache_ttl(),
            top_items: config.dashboard_top_items,
        }
    }

    pub fn tenant_id(&self) -> String {
        self.tenant.resolve_tenant_id()
    }

    pub fn top_items(&self) -> usize {
        self.top_items
    }

    pub fn cache_store(&self) -> &Arc<dyn CacheStore> {
        self.cache.store()
    }

    /// Courses by enrollment count; all of them, or the first `top_n`.
    pub async fn get_course_aggregates(&self, top_n: Option<usize>) -> Vec<CourseAggregate> {
        let (name, limit) = self.list_slot(AggregateName::CourseStatsTop, AggregateName::CourseStatsAll, top_n);
        let key = cache_key(&self.tenant_id(), name);
        let source = self.source.as_ref();

        let result = self
            .cache
            .get_or_compute(
                &key,
                || async move { queries::course_aggregates(source, limit, &timestamp_now()).await },
                self.ttl,
            )
            .await;

        let mut rows = degrade(result, "course", Vec::new);
        if let Some(n) = top_n {
            rows.truncate(n);
        }
        rows
    }

    /// Countries by user count; all of them, or the first `top_n`.
    pub async fn get_country_aggregates(&self, top_n: Option<usize>) -> Vec<CountryAggregate> {
        let (name, limit) = self.list_slot(AggregateName::CountryStatsTop, AggregateName::CountryStatsAll, top_n);
        let key = cache_key(&self.tenant_id(), name);
        let source = self.source.as_ref();

        let result = self
            .cache
            .get_or_compute(
                &key,
                || async move { queries::country_aggregates(source, limit, &timestamp_now()).await },
                self.ttl,
            )
            .await;

        let mut rows = degrade(result, "country", Vec::new);
        if let Some(n) = top_n {
            rows.truncate(n);
        }
        rows
    }

    /// New users and enrollments per year, ascending.
    pub async fn get_yearly_aggregates(&self) -> Vec<YearlyAggregate> {
        let key = cache_key(&self.tenant_id(), AggregateName::YearlyStats);
        let source = self.source.as_ref();

        let result = self
            .cache
            .get_or_compute(
                &key,
                || async move { queries::yearly_aggregates(source, &timestamp_now()).await },
                self.ttl,
            )
            .await;

        degrade(result, "yearly", Vec::new)
    }

    /// Platform totals; zeros when the source is unavailable.
    pub async fn get_totals(&self) -> TotalsAggregate {
        let key = cache_key(&self.tenant_id(), AggregateName::TotalStats);
        let source = self.source.as_ref();

        let result = self
            .cache
            .get_or_compute(
                &key,
                || async move { queries::totals_aggregate(source, &timestamp_now()).await },
                self.ttl,
            )
            .await;

        degrade(result, "totals", || TotalsAggregate::zero(timestamp_now()))
    }

    /// Recompute every aggregate into snapshot storage.
    pub async fn trigger_refresh(&self) -> Result<RefreshReport, Error> {
        self.refresher.refresh().await
    }

    pub async fn snapshot_courses(&self, top_n: Option<usize>) -> Result<Vec<CourseAggregate>, Error> {
        self.snapshots.top_courses(top_n).await
    }

    pub async fn snapshot_countries(&self, top_n: Option<usize>) -> Result<Vec<CountryAggregate>, Error> {
        self.snapshots.top_countries(top_n).await
    }

    pub async fn snapshot_years(&self) -> Result<Vec<YearlyAggregate>, Error> {
        self.snapshots.years().await
    }

    pub async fn latest_totals_snapshot(&self) -> Result<Option<TotalsAggregate>, Error> {
        self.snapshots.latest_totals().await
    }

    // Requests up to the dashboard size share the "top" entry, which holds
    // exactly `top_items` rows; anything larger reads the full list.
    fn list_slot(
        &self, top: AggregateName, all: AggregateName, top_n: Option<usize>,
    ) -> (AggregateName, Option<usize>) {
        match top_n {
            Some(n) if n <= self.top_items => (top, Some(self.top_items)),
            _ => (all, None),
        }
    }
}

fn degrade<T>(result: Result<T, Error>, aggregate: &str, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(aggregate, error = %e, "serving empty aggregate");
            fallback()
        }
    }
}
