//! Durable aggregate snapshots.
//!
//! Courses, countries and years are upserted by natural key; totals are
//! appended and read back newest-first. Nothing here expires on its own.

use super::connection::StatsDb;
use crate::Error;
use crate::aggregate::{CountryAggregate, CourseAggregate, TotalsAggregate, YearlyAggregate};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Outcome of writing one aggregate kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Rows inserted or overwritten.
    pub written: u64,
    /// Rows deleted because their key was absent from the batch.
    pub pruned: u64,
}

/// Snapshot storage interface.
///
/// `prune_stamp`: when set, rows whose `last_updated` differs from it are
/// deleted after the batch is written, in the same transaction. Callers pass
/// the timestamp carried by the batch rows, so only rows that were not part
/// of the batch go away.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert_courses(&self, rows: &[CourseAggregate], prune_stamp: Option<&str>)
    -> Result<UpsertOutcome, Error>;

    async fn upsert_countries(
        &self, rows: &[CountryAggregate], prune_stamp: Option<&str>,
    ) -> Result<UpsertOutcome, Error>;

    async fn upsert_years(&self, rows: &[YearlyAggregate], prune_stamp: Option<&str>)
    -> Result<UpsertOutcome, Error>;

    async fn append_totals(&self, totals: &TotalsAggregate) -> Result<(), Error>;

    /// Courses by enrollment count descending, ties in first-insert order.
    async fn top_courses(&self, limit: Option<usize>) -> Result<Vec<CourseAggregate>, Error>;

    /// Countries by user count descending, ties in first-insert order.
    async fn top_countries(&self, limit: Option<usize>) -> Result<Vec<CountryAggregate>, Error>;

    /// Years ascending.
    async fn years(&self) -> Result<Vec<YearlyAggregate>, Error>;

    /// Newest totals record, if any refresh has run.
    async fn latest_totals(&self) -> Result<Option<TotalsAggregate>, Error>;
}

// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1)
}

fn count_param(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn count_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}

#[async_trait::async_trait]
impl SnapshotStore for StatsDb {
    async fn upsert_courses(
        &self, rows: &[CourseAggregate], prune_stamp: Option<&str>,
    ) -> Result<UpsertOutcome, Error> {
        let rows = rows.to_vec();
        let prune_stamp = prune_stamp.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<UpsertOutcome, Error> {
                let tx = conn.transaction()?;
                let mut outcome = UpsertOutcome::default();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO course_stats (course_id, display_name, enrollment_count, last_updated)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(course_id) DO UPDATE SET
                            display_name = excluded.display_name,
                            enrollment_count = excluded.enrollment_count,
                            last_updated = excluded.last_updated",
                    )?;
                    for row in &rows {
                        outcome.written += stmt.execute(params![
                            &row.course_id,
                            &row.display_name,
                            count_param(row.enrollment_count),
                            &row.last_updated,
                        ])? as u64;
                    }
                }
                if let Some(stamp) = &prune_stamp {
                    outcome.pruned =
                        tx.execute("DELETE FROM course_stats WHERE last_updated <> ?1", params![stamp])? as u64;
                }
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(Error::from)
    }

    async fn upsert_countries(
        &self, rows: &[CountryAggregate], prune_stamp: Option<&str>,
    ) -> Result<UpsertOutcome, Error> {
        let rows = rows.to_vec();
        let prune_stamp = prune_stamp.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<UpsertOutcome, Error> {
                let tx = conn.transaction()?;
                let mut outcome = UpsertOutcome::default();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO country_stats (country_code, country_name, user_count, last_updated)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(country_code) DO UPDATE SET
                            country_name = excluded.country_name,
                            user_count = excluded.user_count,
                            last_updated = excluded.last_updated",
                    )?;
                    for row in &rows {
                        outcome.written += stmt.execute(params![
                            &row.country_code,
                            &row.country_name,
                            count_param(row.user_count),
                            &row.last_updated,
                        ])? as u64;
                    }
                }
                if let Some(stamp) = &prune_stamp {
                    outcome.pruned =
                        tx.execute("DELETE FROM country_stats WHERE last_updated <> ?1", params![stamp])? as u64;
                }
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(Error::from)
    }

    async fn upsert_years(
        &self, rows: &[YearlyAggregate], prune_stamp: Option<&str>,
    ) -> Result<UpsertOutcome, Error> {
        let rows = rows.to_vec();
        let prune_stamp = prune_stamp.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<UpsertOutcome, Error> {
                let tx = conn.transaction()?;
                let mut outcome = UpsertOutcome::default();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO yearly_stats (year, new_users, new_enrollments, last_updated)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(year) DO UPDATE SET
                            new_users = excluded.new_users,
                            new_enrollments = excluded.new_enrollments,
                            last_updated = excluded.last_updated",
                    )?;
                    for row in &rows {
                        outcome.written += stmt.execute(params![
                            row.year,
                            count_param(row.new_users),
                            count_param(row.new_enrollments),
                            &row.last_updated,
                        ])? as u64;
                    }
                }
                if let Some(stamp) = &prune_stamp {
                    outcome.pruned =
                        tx.execute("DELETE FROM yearly_stats WHERE last_updated <> ?1", params![stamp])? as u64;
                }
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(Error::from)
    }

    async fn append_totals(&self, totals: &TotalsAggregate) -> Result<(), Error> {
        let totals = totals.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO totals_stats (total_users, total_courses, total_enrollments, recorded_at)
                    VALUES (?1, ?2, ?3, ?4)",
                    params![
                        count_param(totals.total_users),
                        count_param(totals.total_courses),
                        count_param(totals.total_enrollments),
                        &totals.recorded_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn top_courses(&self, limit: Option<usize>) -> Result<Vec<CourseAggregate>, Error> {
        let limit = sql_limit(limit);
        self.conn
            .call(move |conn| -> Result<Vec<CourseAggregate>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT course_id, display_name, enrollment_count, last_updated
                    FROM course_stats
                    ORDER BY enrollment_count DESC, rowid ASC
                    LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok(CourseAggregate {
                            course_id: row.get(0)?,
                            display_name: row.get(1)?,
                            enrollment_count: count_column(row, 2)?,
                            last_updated: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    async fn top_countries(&self, limit: Option<usize>) -> Result<Vec<CountryAggregate>, Error> {
        let limit = sql_limit(limit);
        self.conn
            .call(move |conn| -> Result<Vec<CountryAggregate>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT country_code, country_name, user_count, last_updated
                    FROM country_stats
                    ORDER BY user_count DESC, rowid ASC
                    LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok(CountryAggregate {
                            country_code: row.get(0)?,
                            country_name: row.get(1)?,
                            user_count: count_column(row, 2)?,
                            last_updated: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    async fn years(&self) -> Result<Vec<YearlyAggregate>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<YearlyAggregate>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT year, new_users, new_enrollments, last_updated
                    FROM yearly_stats
                    ORDER BY year ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(YearlyAggregate {
                            year: row.get(0)?,
                            new_users: count_column(row, 1)?,
                            new_enrollments: count_column(row, 2)?,
                            last_updated: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    async fn latest_totals(&self) -> Result<Option<TotalsAggregate>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<TotalsAggregate>, Error> {
                let result = conn.query_row(
                    "SELECT total_users, total_courses, total_enrollments, recorded_at
                    FROM totals_stats
                    ORDER BY recorded_at DESC, id DESC
                    LIMIT 1",
                    [],
                    |row| {
                        Ok(TotalsAggregate {
                            total_users: count_column(row, 0)?,
                            total_courses: count_column(row, 1)?,
                            total_enrollments: count_column(row, 2)?,
                            recorded_at: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(totals) => Ok(Some(totals)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

impl StatsDb {
    /// Number of stored totals records.
    pub async fn totals_history_len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM totals_stats", [], |row| row.get(0))?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}
