//! Resume-time calculation for wait nodes.
//!
//! Precedence: an absolute `exactDateTime` always wins; otherwise the
//! relative `duration`/`unit` pair is added to the moment the applicant
//! entered the wait. With `workingDaysOnly`, day and week waits count
//! Monday to Friday only (one week is five working days), and shorter waits
//! that would end on a weekend roll forward to Monday at the same time.

use crate::node::{WaitTask, WaitUnit};
use chrono::{DateTime, Datelike, TimeDelta, Utc, Weekday};

impl WaitUnit {
    /// Calendar span of `amount` units, or `None` if it does not fit a
    /// [`TimeDelta`].
    #[must_use]
    pub fn span(self, amount: i64) -> Option<TimeDelta> {
        match self {
            Self::Minutes => TimeDelta::try_minutes(amount),
            Self::Hours => TimeDelta::try_hours(amount),
            Self::Days => TimeDelta::try_days(amount),
            Self::Weeks => TimeDelta::try_weeks(amount),
        }
    }
}

impl WaitTask {
    /// When a wait entered at `entered_at` elapses.
    ///
    /// Returns `None` when the resume time falls outside the representable
    /// date range.
    #[must_use]
    pub fn resume_at(&self, entered_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(exact) = self.exact_date_time {
            return Some(exact);
        }

        let amount = i64::from(self.duration);
        if !self.working_days_only {
            return entered_at.checked_add_signed(self.unit.span(amount)?);
        }

        match self.unit {
            WaitUnit::Days => add_working_days(entered_at, amount),
            WaitUnit::Weeks => add_working_days(entered_at, amount.checked_mul(5)?),
            WaitUnit::Minutes | WaitUnit::Hours => {
                roll_past_weekend(entered_at.checked_add_signed(self.unit.span(amount)?)?)
            }
        }
    }

    /// Whether the relative duration is overridden by an absolute time.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.exact_date_time.is_some()
    }
}

fn add_days(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    at.checked_add_signed(TimeDelta::try_days(days)?)
}

fn add_working_days(from: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if days == 0 {
        return roll_past_weekend(from);
    }

    // Count from the preceding Friday so every five working days span a week.
    let base = match from.weekday() {
        Weekday::Sat => add_days(from, -1)?,
        Weekday::Sun => add_days(from, -2)?,
        _ => from,
    };
    let mut at = add_days(base, (days / 5).checked_mul(7)?)?;
    for _ in 0..days % 5 {
        at = match at.weekday() {
            Weekday::Fri => add_days(at, 3)?,
            _ => add_days(at, 1)?,
        };
    }
    Some(at)
}

fn roll_past_weekend(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match at.weekday() {
        Weekday::Sat => add_days(at, 2),
        Weekday::Sun => add_days(at, 1),
        _ => Some(at),
    }
}
