//! Date bounds for the activity search.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::{BackupError, BackupResult};

/// Which end of a range a user-supplied date stands for. A bare year expands
/// to its first day as a start bound and to its last day as an end bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Inclusive range of local dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Start bound used when the user gives none.
pub fn earliest() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn parse_date(input: &str, bound: Bound) -> BackupResult<NaiveDate> {
    let s = input.trim();
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s
            .parse()
            .map_err(|_| BackupError::InvalidDate(input.to_string()))?;
        let (month, day) = match bound {
            Bound::Start => (1, 1),
            Bound::End => (12, 31),
        };
        return NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| BackupError::InvalidDate(input.to_string()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    // A full timestamp is accepted too; only its date matters.
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(BackupError::InvalidDate(input.to_string()))
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> BackupResult<Self> {
        if start > end {
            return Err(BackupError::Input(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build the search range from the command line options.
    ///
    /// Missing bounds default to 1900-01-01 and `today`; `current_year`
    /// means January 1st of this year up to `today`.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        current_year: bool,
        today: NaiveDate,
    ) -> BackupResult<Self> {
        if current_year {
            let jan_first = NaiveDate::from_ymd_opt(today.year(), 1, 1)
                .ok_or_else(|| BackupError::InvalidDate(today.to_string()))?;
            return Self::new(jan_first, today);
        }
        let start = start
            .map(|s| parse_date(s, Bound::Start))
            .transpose()?
            .unwrap_or_else(earliest);
        let end = end
            .map(|s| parse_date(s, Bound::End))
            .transpose()?
            .unwrap_or(today);
        Self::new(start, end)
    }
}
