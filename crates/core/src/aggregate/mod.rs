//! Aggregate records and the queries that produce them.
//!
//! Rows coming out of the [`SourceStore`](crate::source::SourceStore) are raw
//! counts; the types here are what gets cached, persisted as snapshots, and
//! handed to tool callers.

pub mod combine;
pub mod queries;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use combine::combine_yearly;

/// Enrollment count for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CourseAggregate {
    pub course_id: String,
    pub display_name: String,
    pub enrollment_count: u64,
    pub last_updated: String,
}

/// Registered users for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CountryAggregate {
    pub country_code: String,
    pub country_name: String,
    pub user_count: u64,
    pub last_updated: String,
}

/// New users and enrollments within one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct YearlyAggregate {
    pub year: i32,
    pub new_users: u64,
    pub new_enrollments: u64,
    pub last_updated: String,
}

/// Platform-wide totals.
///
/// Snapshots of this type are append-only; the newest `recorded_at` is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TotalsAggregate {
    pub total_users: u64,
    pub total_courses: u64,
    pub total_enrollments: u64,
    pub recorded_at: String,
}

impl TotalsAggregate {
    /// All-zero totals, served when the source cannot be reached.
    pub fn zero(recorded_at: impl Into<String>) -> Self {
        Self { total_users: 0, total_courses: 0, total_enrollments: 0, recorded_at: recorded_at.into() }
    }

    /// True when every count is zero.
    pub fn is_zero(&self) -> bool {
        self.total_users == 0 && self.total_courses == 0 && self.total_enrollments == 0
    }
}

/// Current time in the RFC 3339 form used for every stored timestamp.
///
/// Fixed-width microseconds with a `Z` suffix, so stored values sort as text.
pub fn timestamp_now() -> String {
    format_timestamp(chrono::Utc::now())
}

pub(crate) fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
