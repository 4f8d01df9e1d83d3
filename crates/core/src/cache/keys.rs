//! Tenant-scoped cache key generation.
//!
//! Keys have the form `edx_stats:<tenant>:<aggregate>`. Aggregate names never
//! contain `:`, so the tenant is everything between the prefix and the last
//! `:` and keys of distinct tenants cannot collide.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved prefix shared by every aggregate key; wildcard invalidation
/// deletes everything under it.
pub const STATS_KEY_PREFIX: &str = "edx_stats:";

/// Cached aggregate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateName {
    CourseStatsTop,
    CourseStatsAll,
    CountryStatsTop,
    CountryStatsAll,
    YearlyStats,
    TotalStats,
}

impl AggregateName {
    pub const ALL: [AggregateName; 6] = [
        AggregateName::CourseStatsTop,
        AggregateName::CourseStatsAll,
        AggregateName::CountryStatsTop,
        AggregateName::CountryStatsAll,
        AggregateName::YearlyStats,
        AggregateName::TotalStats,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateName::CourseStatsTop => "course_stats_top",
            AggregateName::CourseStatsAll => "course_stats_all",
            AggregateName::CountryStatsTop => "country_stats_top",
            AggregateName::CountryStatsAll => "country_stats_all",
            AggregateName::YearlyStats => "yearly_stats",
            AggregateName::TotalStats => "total_stats",
        }
    }
}

impl fmt::Display for AggregateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the cache key for `name` under `tenant`.
pub fn cache_key(tenant: &str, name: AggregateName) -> String {
    format!("{STATS_KEY_PREFIX}{tenant}:{}", name.as_str())
}

/// Prefix covering every key of one tenant.
pub fn tenant_prefix(tenant: &str) -> String {
    format!("{STATS_KEY_PREFIX}{tenant}:")
}
