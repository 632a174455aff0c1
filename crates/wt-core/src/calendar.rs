//! Business-day calendar.
//!
//! A business day is any calendar day that is neither a Saturday, a Sunday,
//! nor a registered holiday. Every capacity and leave computation in the
//! engine counts days through [`BusinessCalendar`].

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_WORKDAY_HOURS;
use crate::error::EngineError;

/// Calendar date format used at every boundary (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An organization holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Holiday-aware working-day arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCalendar {
    holidays: HashSet<NaiveDate>,
    workday_hours: u32,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::new(std::iter::empty(), DEFAULT_WORKDAY_HOURS)
    }
}

impl BusinessCalendar {
    /// Builds a calendar from holiday dates and the configured workday length.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>, workday_hours: u32) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            workday_hours,
        }
    }

    /// Builds a calendar from holiday records.
    pub fn from_holidays<'a>(
        holidays: impl IntoIterator<Item = &'a Holiday>,
        workday_hours: u32,
    ) -> Self {
        Self::new(holidays.into_iter().map(|h| h.date), workday_hours)
    }

    pub const fn workday_hours(&self) -> u32 {
        self.workday_hours
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Returns false iff `date` is a weekend day or a holiday.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Counts working days in `[start, end]`, both ends inclusive.
    ///
    /// Returns 0 when `start > end`.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let count = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working_day(*day))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Converts working days into capacity hours.
    pub const fn working_days_to_hours(&self, days: u32) -> u32 {
        days.saturating_mul(self.workday_hours)
    }

    /// Calendar capacity of `[start, end]` in hours.
    ///
    /// Unlike [`Self::count_working_days`], an inverted range is an error here:
    /// estimation is a planning action and should surface the mistake.
    pub fn estimate_hours(&self, start: NaiveDate, end: NaiveDate) -> Result<u32, EngineError> {
        if start > end {
            return Err(EngineError::invalid_range(start, end));
        }
        Ok(self.working_days_to_hours(self.count_working_days(start, end)))
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| EngineError::InvalidRange {
        message: format!("not a valid calendar date: {value}"),
    })
}

/// Closed-interval intersection of two date ranges.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
