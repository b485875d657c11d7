//! Annual leave balance arithmetic.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{LeaveAllowance, LeaveRequest, LeaveStatus};

/// Returns January 1 of the leave year containing `today`. Balances reset then.
#[must_use]
pub fn leave_year_start(today: NaiveDate) -> NaiveDate {
    today.with_ordinal(1).unwrap_or(today)
}

/// Returns December 31 of the leave year containing `day`.
#[must_use]
pub fn leave_year_end(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), 12, 31).unwrap_or(day)
}

/// Business days consumed by requests of one leave type, grouped by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveUsage {
    /// Days on approved requests.
    pub used_days: i64,
    /// Days on requests still awaiting decisions.
    pub pending_days: i64,
    /// Days on rejected requests.
    pub rejected_days: i64,
}

impl LeaveUsage {
    /// Sums durations of requests starting inside the leave year that begins at `year_start`.
    #[must_use]
    pub fn tally<'a>(
        requests: impl IntoIterator<Item = &'a LeaveRequest>,
        year_start: NaiveDate,
    ) -> Self {
        requests
            .into_iter()
            .filter(|request| {
                let start = request.date_range().start_date();
                start >= year_start && start <= leave_year_end(year_start)
            })
            .fold(Self::default(), |mut usage, request| {
                let days = request.duration_days();
                match request.status() {
                    LeaveStatus::Approved => usage.used_days += days,
                    LeaveStatus::Pending => usage.pending_days += days,
                    LeaveStatus::Rejected => usage.rejected_days += days,
                }
                usage
            })
    }
}

/// Balance report for one leave entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    /// Allowance the balance is computed against.
    pub entitlement: LeaveAllowance,
    /// Business days on approved requests this year.
    pub used_leave_days: i64,
    /// Business days on pending requests this year.
    pub pending_leave_days: i64,
    /// Business days on rejected requests this year.
    pub rejected_leave_days: i64,
    /// Allowance minus used days. Pending days are not subtracted.
    pub balance: i64,
    /// Allowance unit.
    pub unit: String,
}

impl LeaveBalance {
    /// Builds a balance report.
    #[must_use]
    pub fn new(entitlement: LeaveAllowance, usage: LeaveUsage) -> Self {
        let balance = entitlement.value - usage.used_days;
        let unit = entitlement.unit.clone();

        Self {
            entitlement,
            used_leave_days: usage.used_days,
            pending_leave_days: usage.pending_days,
            rejected_leave_days: usage.rejected_days,
            balance,
            unit,
        }
    }

    /// Days a new request may still claim once pending requests are honored.
    #[must_use]
    pub fn available_days(&self) -> i64 {
        self.balance - self.pending_leave_days
    }
}
