//! Aggregate queries over a [`SourceStore`].
//!
//! These wrap the raw store methods with the ordering and filtering rules the
//! rest of the system relies on, so a backend that returns rows in a
//! different order cannot break them:
//!
//! - courses: enrollment count descending, ties in source row order
//! - countries: empty codes dropped, user count descending, ties in source row order
//! - years: ascending, user and enrollment series merged with zero-fill
//!
//! Sorting is stable, so repeated calls against unchanged data return rows in
//! the same order.

use super::{CountryAggregate, CourseAggregate, TotalsAggregate, YearlyAggregate, combine_yearly};
use crate::Error;
use crate::source::SourceStore;

/// All courses by enrollment count, optionally cut to the first `limit`.
pub async fn course_aggregates(
    source: &dyn SourceStore, limit: Option<usize>, last_updated: &str,
) -> Result<Vec<CourseAggregate>, Error> {
    let mut rows = source.course_rows().await?;
    rows.sort_by(|a, b| b.enrollment_count.cmp(&a.enrollment_count));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    Ok(rows
        .into_iter()
        .map(|row| CourseAggregate {
            course_id: row.course_id,
            display_name: row.display_name,
            enrollment_count: row.enrollment_count,
            last_updated: last_updated.to_string(),
        })
        .collect())
}

/// Countries with a non-empty code by user count, optionally cut to `limit`.
pub async fn country_aggregates(
    source: &dyn SourceStore, limit: Option<usize>, last_updated: &str,
) -> Result<Vec<CountryAggregate>, Error> {
    let mut rows: Vec<_> = source
        .country_rows()
        .await?
        .into_iter()
        .filter(|row| !row.country_code.trim().is_empty())
        .collect();
    rows.sort_by(|a, b| b.user_count.cmp(&a.user_count));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    Ok(rows
        .into_iter()
        .map(|row| CountryAggregate {
            country_code: row.country_code,
            country_name: row.country_name,
            user_count: row.user_count,
            last_updated: last_updated.to_string(),
        })
        .collect())
}

/// New users and enrollments per year, ascending.
pub async fn yearly_aggregates(source: &dyn SourceStore, last_updated: &str) -> Result<Vec<YearlyAggregate>, Error> {
    let users = source.users_by_year().await?;
    let enrollments = source.enrollments_by_year().await?;
    Ok(combine_yearly(&users, &enrollments, last_updated))
}

/// Platform totals.
pub async fn totals_aggregate(source: &dyn SourceStore, recorded_at: &str) -> Result<TotalsAggregate, Error> {
    let totals = source.totals().await?;
    Ok(TotalsAggregate {
        total_users: totals.users,
        total_courses: totals.courses,
        total_enrollments: totals.enrollments,
        recorded_at: recorded_at.to_string(),
    })
}
