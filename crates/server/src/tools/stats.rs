//! Live aggregate tools: course_stats, country_stats, yearly_stats, total_stats.
//!
//! Each reads through the tenant-scoped cache. When the LMS database is
//! unreachable the tools still succeed with empty lists or zero totals.

use edstats_core::StatsService;
use edstats_core::aggregate::{CountryAggregate, CourseAggregate, TotalsAggregate, YearlyAggregate};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{check_top_n, json_result};

/// Parameters for the course_stats and country_stats tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TopNParams {
    /// Return only the first N rows. Omit for every row.
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseStatsOutput {
    /// Tenant the aggregates were computed for.
    pub tenant: String,
    /// Courses by enrollment count, descending.
    pub courses: Vec<CourseAggregate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CountryStatsOutput {
    pub tenant: String,
    /// Countries by user count, descending.
    pub countries: Vec<CountryAggregate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct YearlyStatsOutput {
    pub tenant: String,
    /// One row per year, ascending.
    pub years: Vec<YearlyAggregate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TotalStatsOutput {
    pub tenant: String,
    pub totals: TotalsAggregate,
}

pub async fn course_stats_impl(service: &StatsService, params: TopNParams) -> Result<CallToolResult, McpError> {
    check_top_n(params.top_n)?;
    let courses = service.get_course_aggregates(params.top_n).await;
    json_result(&CourseStatsOutput { tenant: service.tenant_id(), courses })
}

pub async fn country_stats_impl(service: &StatsService, params: TopNParams) -> Result<CallToolResult, McpError> {
    check_top_n(params.top_n)?;
    let countries = service.get_country_aggregates(params.top_n).await;
    json_result(&CountryStatsOutput { tenant: service.tenant_id(), countries })
}

pub async fn yearly_stats_impl(service: &StatsService) -> Result<CallToolResult, McpError> {
    let years = service.get_yearly_aggregates().await;
    json_result(&YearlyStatsOutput { tenant: service.tenant_id(), years })
}

pub async fn total_stats_impl(service: &StatsService) -> Result<CallToolResult, McpError> {
    let totals = service.get_totals().await;
    json_result(&TotalStatsOutput { tenant: service.tenant_id(), totals })
}
