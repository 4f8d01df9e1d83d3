//! Read-only SQLite client for the LMS database.
//!
//! The connection is opened lazily on first use with read-only flags. A
//! failed open is not remembered, so the next query tries again and the
//! aggregates recover once the database is reachable.

use std::path::PathBuf;

use edstats_core::Error;
use edstats_core::source::{CountryRow, CourseRow, SourceStore, SourceTotals, YearCount};
use tokio::sync::OnceCell;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, OpenFlags};

const COURSE_ROWS: &str = "SELECT c.id, COALESCE(c.display_name, ''), COUNT(ce.id) AS enrollment_count
    FROM course_overviews_courseoverview c
    LEFT JOIN student_courseenrollment ce ON c.id = ce.course_id
    GROUP BY c.id
    ORDER BY enrollment_count DESC, MIN(c.rowid) ASC";

const COUNTRY_ROWS: &str = "SELECT up.country, up.country, COUNT(u.id) AS user_count
    FROM auth_user u
    JOIN auth_userprofile up ON u.id = up.user_id
    WHERE up.country IS NOT NULL AND TRIM(up.country) != ''
    GROUP BY up.country
    ORDER BY user_count DESC, MIN(up.rowid) ASC";

const USERS_BY_YEAR: &str = "SELECT CAST(strftime('%Y', date_joined) AS INTEGER) AS year, COUNT(*)
    FROM auth_user
    GROUP BY year
    HAVING year IS NOT NULL
    ORDER BY year";

const ENROLLMENTS_BY_YEAR: &str = "SELECT CAST(strftime('%Y', created) AS INTEGER) AS year, COUNT(*)
    FROM student_courseenrollment
    GROUP BY year
    HAVING year IS NOT NULL
    ORDER BY year";

const TOTALS: &str = "SELECT
    (SELECT COUNT(*) FROM auth_user),
    (SELECT COUNT(*) FROM course_overviews_courseoverview),
    (SELECT COUNT(*) FROM student_courseenrollment)";

/// LMS database handle implementing [`SourceStore`].
pub struct SourceDb {
    path: Option<PathBuf>,
    conn: OnceCell<Connection>,
}

impl SourceDb {
    /// Point at an LMS database file. Nothing is opened until the first query.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), conn: OnceCell::new() }
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { path: None, conn: OnceCell::new_with(Some(conn)) }
    }

    async fn connection(&self) -> Result<&Connection, Error> {
        self.conn
            .get_or_try_init(|| async {
                let Some(path) = &self.path else {
                    return Err(Error::SourceUnavailable("no source database configured".into()));
                };

                let flags =
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
                let conn = Connection::open_with_flags(path, flags).await.map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "failed to open source database");
                    Error::SourceUnavailable(format!("{}: {e}", path.display()))
                })?;

                tracing::info!(path = %path.display(), "opened source database");
                Ok(conn)
            })
            .await
    }

    async fn query<T, F>(&self, what: &'static str, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.connection().await?;
        conn.call(f).await.map_err(|e: tokio_rusqlite::Error<rusqlite::Error>| {
            tracing::warn!(query = what, error = %e, "source query failed");
            Error::SourceUnavailable(format!("{what}: {e}"))
        })
    }
}

fn count(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}

fn year_counts(conn: &mut rusqlite::Connection, sql: &str) -> rusqlite::Result<Vec<YearCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            let year: i64 = row.get(0)?;
            Ok((i32::try_from(year).ok(), count(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .filter_map(|(year, n)| year.map(|year| YearCount::new(year, n)))
        .collect())
}

#[async_trait::async_trait]
impl SourceStore for SourceDb {
    async fn course_rows(&self) -> Result<Vec<CourseRow>, Error> {
        self.query("course_rows", |conn| {
            let mut stmt = conn.prepare(COURSE_ROWS)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CourseRow {
                        course_id: row.get(0)?,
                        display_name: row.get(1)?,
                        enrollment_count: count(row, 2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn country_rows(&self) -> Result<Vec<CountryRow>, Error> {
        self.query("country_rows", |conn| {
            let mut stmt = conn.prepare(COUNTRY_ROWS)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CountryRow { country_code: row.get(0)?, country_name: row.get(1)?, user_count: count(row, 2)? })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn users_by_year(&self) -> Result<Vec<YearCount>, Error> {
        self.query("users_by_year", |conn| year_counts(conn, USERS_BY_YEAR)).await
    }

    async fn enrollments_by_year(&self) -> Result<Vec<YearCount>, Error> {
        self.query("enrollments_by_year", |conn| year_counts(conn, ENROLLMENTS_BY_YEAR))
            .await
    }

    async fn totals(&self) -> Result<SourceTotals, Error> {
        self.query("totals", |conn| {
            conn.query_row(TOTALS, [], |row| {
                Ok(SourceTotals { users: count(row, 0)?, courses: count(row, 1)?, enrollments: count(row, 2)? })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "
        CREATE TABLE course_overviews_courseoverview (id TEXT PRIMARY KEY, display_name TEXT);
        CREATE TABLE student_courseenrollment (id INTEGER PRIMARY KEY, course_id TEXT, user_id INTEGER, created TEXT);
        CREATE TABLE auth_user (id INTEGER PRIMARY KEY, username TEXT, date_joined TEXT);
        CREATE TABLE auth_userprofile (id INTEGER PRIMARY KEY, user_id INTEGER, country TEXT);
    ";

    const DATA: &str = "
        INSERT INTO course_overviews_courseoverview VALUES
            ('course-v1:A+1+T', 'Alpha'), ('course-v1:B+1+T', 'Beta'),
            ('course-v1:C+1+T', 'Gamma'), ('course-v1:D+1+T', NULL);
        INSERT INTO auth_user VALUES
            (1, 'ann', '2020-02-01 09:00:00'), (2, 'bob', '2021-05-06 10:00:00'),
            (3, 'cat', '2021-11-30 23:59:59'), (4, 'dan', NULL);
        INSERT INTO auth_userprofile VALUES
            (1, 1, 'US'), (2, 2, 'KE'), (3, 3, 'US'), (4, 4, '');
        INSERT INTO student_courseenrollment VALUES
            (1, 'course-v1:A+1+T', 1, '2021-01-01 00:00:00'),
            (2, 'course-v1:A+1+T', 2, '2021-06-01 00:00:00'),
            (3, 'course-v1:B+1+T', 1, '2022-01-01 00:00:00'),
            (4, 'course-v1:B+1+T', 3, '2022-03-01 00:00:00'),
            (5, 'course-v1:C+1+T', 1, '2022-04-01 00:00:00'),
            (6, 'course-v1:C+1+T', 2, '2022-05-01 00:00:00'),
            (7, 'course-v1:C+1+T', 3, '2022-06-01 00:00:00');
    ";

    async fn seeded() -> SourceDb {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.execute_batch(&format!("{SCHEMA}{DATA}")))
            .await
            .unwrap();
        SourceDb::from_connection(conn)
    }

    #[tokio::test]
    async fn test_course_rows_ordered_with_stable_ties() {
        let db = seeded().await;
        let rows = db.course_rows().await.unwrap();

        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.course_id.as_str(), r.display_name.as_str(), r.enrollment_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("course-v1:C+1+T", "Gamma", 3),
                ("course-v1:A+1+T", "Alpha", 2),
                ("course-v1:B+1+T", "Beta", 2),
                ("course-v1:D+1+T", "", 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_country_rows_skip_empty_codes() {
        let db = seeded().await;
        let rows = db.country_rows().await.unwrap();

        let summary: Vec<_> = rows.iter().map(|r| (r.country_code.as_str(), r.user_count)).collect();
        assert_eq!(summary, vec![("US", 2), ("KE", 1)]);
        assert_eq!(rows[0].country_name, "US");
    }

    #[tokio::test]
    async fn test_year_counts_skip_missing_dates() {
        let db = seeded().await;

        assert_eq!(db.users_by_year().await.unwrap(), vec![YearCount::new(2020, 1), YearCount::new(2021, 2)]);
        assert_eq!(db.enrollments_by_year().await.unwrap(), vec![YearCount::new(2021, 2), YearCount::new(2022, 5)]);
    }

    #[tokio::test]
    async fn test_totals() {
        let db = seeded().await;
        assert_eq!(db.totals().await.unwrap(), SourceTotals { users: 4, courses: 4, enrollments: 7 });
    }

    #[tokio::test]
    async fn test_missing_schema_is_source_unavailable() {
        let db = SourceDb::from_connection(Connection::open_in_memory().await.unwrap());
        assert!(matches!(db.totals().await, Err(Error::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_file_fails_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lms.sqlite");
        let db = SourceDb::new(&path);

        assert!(matches!(db.course_rows().await, Err(Error::SourceUnavailable(_))));

        let writer = Connection::open(&path).await.unwrap();
        writer
            .call(|conn| conn.execute_batch(&format!("{SCHEMA}{DATA}")))
            .await
            .unwrap();

        assert_eq!(db.course_rows().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_connection_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lms.sqlite");
        let writer = Connection::open(&path).await.unwrap();
        writer.call(|conn| conn.execute_batch(SCHEMA)).await.unwrap();

        let db = SourceDb::new(&path);
        let result = db
            .query("write", |conn| conn.execute("INSERT INTO auth_user (username) VALUES ('eve')", []))
            .await;
        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
    }
}
