//! Read-only access to the LMS transactional data.
//!
//! The [`SourceStore`] trait is the only seam between the aggregate pipeline
//! and the LMS database. Implementations return raw counts; ordering and
//! filtering rules are enforced by [`crate::aggregate::queries`].

mod memory;

pub use memory::MemorySource;

use crate::Error;

/// One course with its current enrollment count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRow {
    pub course_id: String,
    pub display_name: String,
    pub enrollment_count: u64,
}

/// Users registered under one country code.
///
/// `country_code` may be empty here; the query layer drops such rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRow {
    pub country_code: String,
    pub country_name: String,
    pub user_count: u64,
}

/// A count attributed to one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

impl YearCount {
    pub fn new(year: i32, count: u64) -> Self {
        Self { year, count }
    }
}

/// Scalar platform counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceTotals {
    pub users: u64,
    pub courses: u64,
    pub enrollments: u64,
}

/// Read queries against the LMS database.
///
/// Every method covers all data visible to the deployment; there are no
/// caller-supplied filters. An unreachable store must fail with
/// [`Error::SourceUnavailable`].
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    /// Courses joined with their enrollment counts, in source row order.
    async fn course_rows(&self) -> Result<Vec<CourseRow>, Error>;

    /// User counts grouped by profile country.
    async fn country_rows(&self) -> Result<Vec<CountryRow>, Error>;

    /// New users grouped by the year they joined.
    async fn users_by_year(&self) -> Result<Vec<YearCount>, Error>;

    /// New enrollments grouped by the year they were created.
    async fn enrollments_by_year(&self) -> Result<Vec<YearCount>, Error>;

    /// Total users, courses and enrollments.
    async fn totals(&self) -> Result<SourceTotals, Error>;
}
