use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar-aware distance between two dates, broken down into whole years,
/// whole months and remaining days.
///
/// Components are signed and share the sign of the overall distance, so
/// `between(a, b)` is the negation of `between(b, a)` except where month
/// lengths differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPeriod {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl fmt::Display for CalendarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}Y{}M{}D", self.years, self.months, self.days)
    }
}

impl CalendarPeriod {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        let mut total_months = proleptic_month(end) - proleptic_month(start);
        let mut days = i64::from(end.day()) - i64::from(start.day());

        if total_months > 0 && days < 0 {
            total_months -= 1;
            // Month addition clamps to the last day of shorter months.
            if let Some(anchor) = u32::try_from(total_months)
                .ok()
                .and_then(|n| start.checked_add_months(Months::new(n)))
            {
                days = (end - anchor).num_days();
            }
        } else if total_months < 0 && days > 0 {
            total_months += 1;
            days -= days_in_month(end);
        }

        CalendarPeriod {
            years: (total_months / 12) as i32,
            months: (total_months % 12) as i32,
            days: days as i32,
        }
    }

    /// True when the period has no year or month component and at most
    /// `max_days` days in either direction.
    pub fn within_days(self, max_days: u32) -> bool {
        self.years == 0 && self.months == 0 && self.days.unsigned_abs() <= max_days
    }
}

fn proleptic_month(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn days_in_month(date: NaiveDate) -> i64 {
    let first = date - Duration::days(i64::from(date.day0()));
    first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days())
        .unwrap_or(31)
}
