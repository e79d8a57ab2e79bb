//! Labor and holiday calendar.
//!
//! Each date at a producing site is either a fixed-labor day (a committed
//! crew with `fixed_hours` at the regular rate, overtime above that) or a
//! non-fixed day (weekend/holiday: all hours at the overtime rate, with a
//! minimum paid block when anything at all is produced).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labor terms for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborDay {
    pub date: NaiveDate,
    /// Fixed-labor day (weekday with a committed crew)
    pub is_fixed: bool,
    /// Hours available at the regular rate (0 on non-fixed days)
    pub fixed_hours: f64,
    pub regular_rate: f64,
    pub overtime_rate: f64,
    /// Minimum hours paid on a non-fixed day with any production
    pub minimum_paid_hours: f64,
}

impl LaborDay {
    pub fn fixed(date: NaiveDate, fixed_hours: f64, regular_rate: f64, overtime_rate: f64) -> Self {
        LaborDay {
            date,
            is_fixed: true,
            fixed_hours,
            regular_rate,
            overtime_rate,
            minimum_paid_hours: 0.0,
        }
    }

    pub fn non_fixed(date: NaiveDate, overtime_rate: f64) -> Self {
        LaborDay {
            date,
            is_fixed: false,
            fixed_hours: 0.0,
            regular_rate: overtime_rate,
            overtime_rate,
            minimum_paid_hours: 4.0,
        }
    }
}

/// Calendar over the planning horizon, keyed by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaborCalendar {
    pub days: BTreeMap<NaiveDate, LaborDay>,
}

impl LaborCalendar {
    pub fn new() -> Self {
        LaborCalendar::default()
    }

    pub fn add(&mut self, day: LaborDay) {
        self.days.insert(day.date, day);
    }

    pub fn day(&self, date: NaiveDate) -> Option<&LaborDay> {
        self.days.get(&date)
    }

    /// Dates in `[start, end]` with no calendar entry.
    pub fn missing_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.days.contains_key(d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_missing_dates() {
        let mut cal = LaborCalendar::new();
        cal.add(LaborDay::fixed(d("2025-06-02"), 12.0, 50.0, 75.0));
        cal.add(LaborDay::non_fixed(d("2025-06-04"), 75.0));

        let missing = cal.missing_dates(d("2025-06-02"), d("2025-06-04"));
        assert_eq!(missing, vec![d("2025-06-03")]);
    }

    #[test]
    fn test_non_fixed_defaults() {
        let day = LaborDay::non_fixed(d("2025-06-07"), 75.0);
        assert!(!day.is_fixed);
        assert_eq!(day.fixed_hours, 0.0);
        assert_eq!(day.minimum_paid_hours, 4.0);
    }
}
