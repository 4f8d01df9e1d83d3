//! refresh_snapshots tool implementation.
//!
//! Recomputes every aggregate and upserts it into the snapshot tables.

use edstats_core::{RefreshReport, StatsService};
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Run one refresh. A source outage fails the call and leaves snapshots as they were.
pub async fn refresh_impl(service: &StatsService) -> Result<CallToolResult, McpError> {
    let report: RefreshReport = service.trigger_refresh().await?;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, output};
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_refresh_reports_counts() {
        let fx = fixture().await;
        let report: RefreshReport = output(&refresh_impl(&fx.service).await.unwrap());

        assert_eq!((report.courses, report.countries, report.years, report.pruned), (3, 2, 2, 0));
        assert!(fx.service.latest_totals_snapshot().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_with_source_down_is_an_error() {
        let fx = fixture().await;
        fx.source.set_available(false);

        let err = refresh_impl(&fx.service).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32020));
        assert!(fx.service.latest_totals_snapshot().await.unwrap().is_none());
    }
}
