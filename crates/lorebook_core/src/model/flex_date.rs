//! Partial ("flexible") dates with explicit precision.
//!
//! # Responsibility
//! - Parse `YYYY`, `YYYY-MM` and `YYYY-MM-DD` strings into a day plus precision.
//! - Format a stored day back to the string width implied by its precision.
//! - Supply open-ended bounds for timeline range queries.
//!
//! # Invariants
//! - Missing month/day components are padded with `01` before conversion.
//! - `FlexDate::parse(s)?.format() == s` for every well-formed `s`.
//! - An empty string is "no date", never an error.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const FULL_DATE_FORMAT: &str = "%Y-%m-%d";

pub type DateResult<T> = Result<T, DateError>;

/// Error for date strings that are neither empty nor a supported partial date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    Malformed(String),
}

impl Display for DateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(
                f,
                "invalid date `{value}`; expected YYYY, YYYY-MM or YYYY-MM-DD"
            ),
        }
    }
}

impl Error for DateError {}

/// How much of a [`FlexDate`] was actually specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

impl DatePrecision {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
        }
    }

    /// Parses a storage name produced by [`DatePrecision::as_str`].
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Self::Year => 4,
            Self::Month => 7,
            Self::Day => 10,
        }
    }
}

/// A calendar day together with the precision it was written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlexDate {
    pub date: NaiveDate,
    pub precision: DatePrecision,
}

impl FlexDate {
    pub fn new(date: NaiveDate, precision: DatePrecision) -> Self {
        Self { date, precision }
    }

    /// Parses a partial date string.
    ///
    /// Returns `Ok(None)` for blank input.
    ///
    /// # Errors
    /// - Returns [`DateError::Malformed`] when the string has an unsupported
    ///   width or does not name a real calendar day.
    pub fn parse(value: &str) -> DateResult<Option<Self>> {
        let trimmed = value.trim();
        let (padded, precision) = match trimmed.len() {
            0 => return Ok(None),
            4 => (format!("{trimmed}-01-01"), DatePrecision::Year),
            7 => (format!("{trimmed}-01"), DatePrecision::Month),
            10 => (trimmed.to_string(), DatePrecision::Day),
            _ => return Err(DateError::Malformed(trimmed.to_string())),
        };

        if !is_date_shaped(&padded) {
            return Err(DateError::Malformed(trimmed.to_string()));
        }

        let date = NaiveDate::parse_from_str(&padded, FULL_DATE_FORMAT)
            .map_err(|_| DateError::Malformed(trimmed.to_string()))?;
        Ok(Some(Self { date, precision }))
    }

    /// Formats the date truncated to its precision.
    pub fn format(&self) -> String {
        let full = self.date.format(FULL_DATE_FORMAT).to_string();
        full.chars().take(self.precision.width()).collect()
    }

    /// Stable integer form used for storage and range comparisons.
    pub fn day_number(&self) -> i32 {
        self.date.num_days_from_ce()
    }

    /// Rebuilds a date from its stored day number and precision.
    ///
    /// Returns `None` when `day` is outside the supported calendar range.
    pub fn from_day_number(day: i32, precision: DatePrecision) -> Option<Self> {
        NaiveDate::from_num_days_from_ce_opt(day).map(|date| Self { date, precision })
    }
}

impl Display for FlexDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// Formats an optional date; "no date" becomes the empty string.
pub fn format_flex_date(value: Option<&FlexDate>) -> String {
    value.map(FlexDate::format).unwrap_or_default()
}

/// Lower bound for range queries; blank input means the beginning of time.
///
/// # Errors
/// - Returns [`DateError::Malformed`] for non-blank invalid input.
pub fn range_start(value: &str) -> DateResult<NaiveDate> {
    Ok(FlexDate::parse(value)?.map_or(NaiveDate::MIN, |parsed| parsed.date))
}

/// Upper bound for range queries; blank input means the end of time.
///
/// # Errors
/// - Returns [`DateError::Malformed`] for non-blank invalid input.
pub fn range_end(value: &str) -> DateResult<NaiveDate> {
    Ok(FlexDate::parse(value)?.map_or(NaiveDate::MAX, |parsed| parsed.date))
}

fn is_date_shaped(value: &str) -> bool {
    value.len() == 10
        && value.char_indices().all(|(idx, ch)| match idx {
            4 | 7 => ch == '-',
            _ => ch.is_ascii_digit(),
        })
}
