//! Per-year merge of user and enrollment counts.

use std::collections::BTreeMap;

use super::YearlyAggregate;
use crate::source::YearCount;

/// Full outer join of the two per-year series on `year`.
///
/// Every year present in either input appears exactly once, ascending, with
/// a missing side filled with zero. A year repeated within one input has its
/// counts summed.
pub fn combine_yearly(users: &[YearCount], enrollments: &[YearCount], last_updated: &str) -> Vec<YearlyAggregate> {
    let mut years: BTreeMap<i32, (u64, u64)> = BTreeMap::new();

    for row in users {
        years.entry(row.year).or_default().0 += row.count;
    }
    for row in enrollments {
        years.entry(row.year).or_default().1 += row.count;
    }

    years
        .into_iter()
        .map(|(year, (new_users, new_enrollments))| YearlyAggregate {
            year,
            new_users,
            new_enrollments,
            last_updated: last_updated.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(rows: &[YearlyAggregate]) -> Vec<(i32, u64, u64)> {
        rows.iter().map(|r| (r.year, r.new_users, r.new_enrollments)).collect()
    }

    #[test]
    fn test_outer_join_with_zero_fill() {
        let users = [YearCount::new(2020, 5), YearCount::new(2021, 3)];
        let enrollments = [YearCount::new(2021, 7), YearCount::new(2022, 2)];

        let combined = combine_yearly(&users, &enrollments, "t");
        assert_eq!(triples(&combined), vec![(2020, 5, 0), (2021, 3, 7), (2022, 0, 2)]);
        assert!(combined.iter().all(|r| r.last_updated == "t"));
    }

    #[test]
    fn test_unsorted_input_comes_out_ascending() {
        let users = [YearCount::new(2023, 1), YearCount::new(2019, 4)];
        let combined = combine_yearly(&users, &[], "t");
        assert_eq!(triples(&combined), vec![(2019, 4, 0), (2023, 1, 0)]);
    }

    #[test]
    fn test_repeated_year_is_summed_not_duplicated() {
        let enrollments = [YearCount::new(2020, 2), YearCount::new(2020, 3)];
        let combined = combine_yearly(&[], &enrollments, "t");
        assert_eq!(triples(&combined), vec![(2020, 0, 5)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(combine_yearly(&[], &[], "t").is_empty());
    }
}
