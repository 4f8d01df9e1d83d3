//! Background snapshot refresh scheduler.
//!
//! Runs a refresh on startup and then every `refresh_interval_secs`, and
//! drops expired cache entries on the same tick. Failures are logged and the
//! loop carries on; the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use edstats_core::StatsService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Periodic driver for [`StatsService::trigger_refresh`].
pub struct RefreshScheduler {
    service: Arc<StatsService>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(service: Arc<StatsService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Start the background task. Abort the handle to stop it.
    pub fn start(self) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "Starting snapshot refresh scheduler");

        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately.
            interval.tick().await;
            self.run_cycle().await;
        }
    }

    /// One refresh plus expired-entry purge. Returns whether the refresh succeeded.
    pub async fn run_cycle(&self) -> bool {
        debug!("Running snapshot refresh cycle");

        match self.service.cache_store().purge_expired().await {
            Ok(purged) if purged > 0 => debug!(purged, "purged expired cache entries"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "failed to purge expired cache entries"),
        }

        match self.service.trigger_refresh().await {
            Ok(report) => {
                debug!(refreshed_at = %report.refreshed_at, "Snapshot refresh cycle completed");
                true
            }
            Err(e) => {
                error!(error = %e, "Scheduled snapshot refresh failed");
                false
            }
        }
    }
}
