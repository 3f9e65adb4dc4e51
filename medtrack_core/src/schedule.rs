//! Calendar and clock-time mathematics for dose schedules.
//!
//! Pure date-window functions used by the reconciliation engine, the dose
//! recorder, and display code. Active-window checks compare calendar days
//! only; due checks compare clock times for today and calendar days for
//! everything else.

use crate::{Error, Medication, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Parse a 24h "HH:MM" clock-time string
pub fn parse_clock_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| Error::MalformedSchedule(format!("invalid clock time {:?}: {}", s, e)))
}

/// Parse the leading whole-day count of a duration text.
///
/// Returns `None` for ongoing durations: non-numeric text, a missing
/// leading token, or a count below one day.
pub fn duration_days(duration: &str) -> Option<i64> {
    let token = duration.trim().split_whitespace().next()?;
    let days: i64 = token.parse().ok()?;
    (days >= 1).then_some(days)
}

impl Medication {
    /// Whether this medication's course covers `date`.
    ///
    /// True iff `date` is on or after the start day and, for a finite
    /// duration, within `start + days - 1`. Time-of-day plays no part.
    /// A day count too large to land on a representable end date is
    /// effectively ongoing.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        let start = self.start_date.date_naive();
        if date < start {
            return false;
        }
        match duration_days(&self.duration) {
            None => true,
            Some(days) => match start.checked_add_days(Days::new((days - 1) as u64)) {
                Some(end) => date <= end,
                None => true,
            },
        }
    }

    /// Whether at least one dose on `date` has come due relative to `now`.
    ///
    /// A day after today's is never due; a day before today's is always
    /// due (historical). For today, an as-needed medication is always due
    /// and a scheduled one is due once any slot's clock-time has passed.
    /// Malformed slots are skipped rather than failing the whole check.
    pub fn is_due(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if date > today {
            return false;
        }
        if date < today {
            return true;
        }
        if self.times.is_empty() {
            return true;
        }
        let wall_clock = now.time();
        self.times.iter().any(|slot| match parse_clock_time(slot) {
            Ok(clock) => clock <= wall_clock,
            Err(e) => {
                tracing::warn!(medication = %self.name, %slot, "skipping malformed scheduled time: {}", e);
                false
            }
        })
    }
}
