//! Business-day arithmetic used wherever a leave duration matters.
//!
//! Weekends are Saturday and Sunday. Public holidays are not considered.

use chrono::{Datelike, NaiveDate};
use peoplehub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Counts weekdays between `start` and `end`, both inclusive.
///
/// Returns zero when `start` is after `end`.
#[must_use]
pub fn business_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }

    let calendar_days = (end - start).num_days() + 1;
    let full_weeks = calendar_days / 7;
    let remainder = calendar_days % 7;
    let first_weekday = i64::from(start.weekday().num_days_from_monday());

    let trailing = (0..remainder)
        .filter(|offset| (first_weekday + offset) % 7 < 5)
        .count();

    full_weeks * 5 + i64::try_from(trailing).unwrap_or(0)
}

/// Inclusive calendar range of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl LeaveDateRange {
    /// Creates a validated range.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<Self> {
        if start_date > end_date {
            return Err(AppError::Validation(format!(
                "start date {start_date} must not be after end date {end_date}"
            )));
        }

        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Returns the first day of leave.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the last day of leave.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the number of business days covered.
    #[must_use]
    pub fn business_days(&self) -> i64 {
        business_days(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Days, NaiveDate, Weekday};
    use proptest::prelude::*;

    use super::{LeaveDateRange, business_days};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(value) => value,
            None => panic!("invalid test date {year}-{month}-{day}"),
        }
    }

    fn counted_day_by_day(start: NaiveDate, end: NaiveDate) -> i64 {
        let count = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }

    #[test]
    fn monday_to_friday_is_five_days() {
        // 2024-03-04 is a Monday.
        assert_eq!(business_days(date(2024, 3, 4), date(2024, 3, 8)), 5);
    }

    #[test]
    fn monday_to_next_monday_skips_one_weekend() {
        assert_eq!(business_days(date(2024, 3, 4), date(2024, 3, 11)), 6);
    }

    #[test]
    fn weekend_only_range_is_zero() {
        assert_eq!(business_days(date(2024, 3, 9), date(2024, 3, 10)), 0);
    }

    #[test]
    fn single_weekday_counts_once() {
        assert_eq!(business_days(date(2024, 3, 6), date(2024, 3, 6)), 1);
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(LeaveDateRange::new(date(2024, 3, 8), date(2024, 3, 4)).is_err());
        assert_eq!(business_days(date(2024, 3, 8), date(2024, 3, 4)), 0);
    }

    proptest! {
        #[test]
        fn matches_day_by_day_count(offset in 0_u64..20_000, length in 0_u64..400) {
            let start = date(2000, 1, 1) + Days::new(offset);
            let end = start + Days::new(length);
            prop_assert_eq!(business_days(start, end), counted_day_by_day(start, end));
        }

        #[test]
        fn never_exceeds_calendar_days(offset in 0_u64..20_000, length in 0_u64..400) {
            let start = date(2000, 1, 1) + Days::new(offset);
            let end = start + Days::new(length);
            let calendar_days = i64::try_from(length + 1).unwrap_or(i64::MAX);
            prop_assert!(business_days(start, end) <= calendar_days);
        }
    }
}
