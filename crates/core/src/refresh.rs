//! Snapshot refresh pipeline.
//!
//! A refresh recomputes every aggregate and persists it as the new durable
//! baseline. All source reads happen before the first write, so an outage
//! part-way through leaves the previous snapshots untouched instead of
//! replacing them with zeros.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::aggregate::{queries, timestamp_now};
use crate::cache::SnapshotStore;
use crate::source::SourceStore;

/// Summary of one refresh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefreshReport {
    /// Timestamp stamped on every row written by this run.
    pub refreshed_at: String,
    pub courses: u64,
    pub countries: u64,
    pub years: u64,
    /// Snapshot rows deleted because their key left the source.
    pub pruned: u64,
}

/// Recomputes aggregates and upserts them into snapshot storage.
pub struct SnapshotRefresher {
    source: Arc<dyn SourceStore>,
    snapshots: Arc<dyn SnapshotStore>,
    prune_orphans: bool,
}

impl SnapshotRefresher {
    pub fn new(source: Arc<dyn SourceStore>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { source, snapshots, prune_orphans: false }
    }

    /// Also delete snapshot rows whose natural key is gone from the source.
    pub fn with_prune_orphans(mut self, prune: bool) -> Self {
        self.prune_orphans = prune;
        self
    }

    /// Run one refresh.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` (nothing written) if any source query
    /// fails, or a store error if a write fails. Each aggregate kind is
    /// written in its own transaction.
    pub async fn refresh(&self) -> Result<RefreshReport, Error> {
        let stamp = timestamp_now();
        let source = self.source.as_ref();

        let courses = queries::course_aggregates(source, None, &stamp).await?;
        let countries = queries::country_aggregates(source, None, &stamp).await?;
        let years = queries::yearly_aggregates(source, &stamp).await?;
        let totals = queries::totals_aggregate(source, &stamp).await?;

        let prune_stamp = self.prune_orphans.then_some(stamp.as_str());
        let course_outcome = self.snapshots.upsert_courses(&courses, prune_stamp).await?;
        let country_outcome = self.snapshots.upsert_countries(&countries, prune_stamp).await?;
        let year_outcome = self.snapshots.upsert_years(&years, prune_stamp).await?;
        self.snapshots.append_totals(&totals).await?;

        let report = RefreshReport {
            refreshed_at: stamp,
            courses: course_outcome.written,
            countries: country_outcome.written,
            years: year_outcome.written,
            pruned: course_outcome.pruned + country_outcome.pruned + year_outcome.pruned,
        };

        tracing::info!(
            refreshed_at = %report.refreshed_at,
            courses = report.courses,
            countries = report.countries,
            years = report.years,
            pruned = report.pruned,
            "aggregate snapshots refreshed"
        );

        Ok(report)
    }
}
