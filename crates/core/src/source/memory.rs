//! In-process source store.
//!
//! Holds the rows directly. Used by callers that already have the counts in
//! hand and by the test suites, which also use it to simulate an outage.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{CountryRow, CourseRow, SourceStore, SourceTotals, YearCount};
use crate::Error;

#[derive(Debug, Default, Clone)]
struct Tables {
    courses: Vec<CourseRow>,
    countries: Vec<CountryRow>,
    users_by_year: Vec<YearCount>,
    enrollments_by_year: Vec<YearCount>,
    totals: SourceTotals,
}

/// Source store backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courses(self, courses: Vec<CourseRow>) -> Self {
        self.update(|t| t.courses = courses);
        self
    }

    pub fn with_countries(self, countries: Vec<CountryRow>) -> Self {
        self.update(|t| t.countries = countries);
        self
    }

    pub fn with_years(self, users: Vec<YearCount>, enrollments: Vec<YearCount>) -> Self {
        self.update(|t| {
            t.users_by_year = users;
            t.enrollments_by_year = enrollments;
        });
        self
    }

    pub fn with_totals(self, totals: SourceTotals) -> Self {
        self.update(|t| t.totals = totals);
        self
    }

    /// Replace the course rows in place.
    pub fn set_courses(&self, courses: Vec<CourseRow>) {
        self.update(|t| t.courses = courses);
    }

    /// Toggle the simulated outage. While unavailable every query fails.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of queries answered or refused so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl FnOnce(&mut Tables)) {
        let mut tables = self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut tables);
    }

    fn read(&self) -> Result<Tables, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::SourceUnavailable("memory source marked unavailable".into()));
        }
        let tables = self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(tables.clone())
    }
}

#[async_trait::async_trait]
impl SourceStore for MemorySource {
    async fn course_rows(&self) -> Result<Vec<CourseRow>, Error> {
        Ok(self.read()?.courses)
    }

    async fn country_rows(&self) -> Result<Vec<CountryRow>, Error> {
        Ok(self.read()?.countries)
    }

    async fn users_by_year(&self) -> Result<Vec<YearCount>, Error> {
        Ok(self.read()?.users_by_year)
    }

    async fn enrollments_by_year(&self) -> Result<Vec<YearCount>, Error> {
        Ok(self.read()?.enrollments_by_year)
    }

    async fn totals(&self) -> Result<SourceTotals, Error> {
        Ok(self.read()?.totals)
    }
}
