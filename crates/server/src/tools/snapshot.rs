//! snapshot_get tool implementation.
//!
//! Reads the durable snapshot tables written by refresh_snapshots. Unlike
//! the live tools this never touches the LMS database.

use edstats_core::StatsService;
use edstats_core::aggregate::{CountryAggregate, CourseAggregate, TotalsAggregate, YearlyAggregate};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{check_top_n, json_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Courses,
    Countries,
    Years,
    Totals,
}

/// Parameters for the snapshot_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotGetParams {
    /// Which snapshot table to read.
    pub aggregate: SnapshotKind,

    /// Limit course or country rows to the first N. Ignored for years and totals.
    #[serde(default)]
    pub top_n: Option<usize>,
}

/// Output from the snapshot_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "aggregate", rename_all = "lowercase")]
pub enum SnapshotGetOutput {
    Courses { rows: Vec<CourseAggregate> },
    Countries { rows: Vec<CountryAggregate> },
    Years { rows: Vec<YearlyAggregate> },
    /// Most recent totals record, or null before the first refresh.
    Totals { latest: Option<TotalsAggregate> },
}

pub async fn snapshot_get_impl(service: &StatsService, params: SnapshotGetParams) -> Result<CallToolResult, McpError> {
    check_top_n(params.top_n)?;

    let output = match params.aggregate {
        SnapshotKind::Courses => SnapshotGetOutput::Courses { rows: service.snapshot_courses(params.top_n).await? },
        SnapshotKind::Countries => {
            SnapshotGetOutput::Countries { rows: service.snapshot_countries(params.top_n).await? }
        }
        SnapshotKind::Years => SnapshotGetOutput::Years { rows: service.snapshot_years().await? },
        SnapshotKind::Totals => SnapshotGetOutput::Totals { latest: service.latest_totals_snapshot().await? },
    };

    json_result(&output)
}
