//! Reporting period (calendar month) keys

use crate::error::{CalcError, CalcResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, written "YYYY-MM"
///
/// Ordering is chronological, so a sorted `Vec<Period>` is in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period from a year and a 1-based month
    pub fn new(year: i32, month: u32) -> CalcResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CalcError::InvalidPeriod(format!("{}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Parse a "YYYY-MM" month key
    pub fn parse(key: &str) -> CalcResult<Self> {
        let key = key.trim();
        let date = NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
            .map_err(|_| CalcError::InvalidPeriod(key.to_string()))?;
        Ok(Self::from_date(date))
    }

    /// Period containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Period `n` months later
    pub fn plus_months(&self, n: u32) -> Self {
        let index = self.month_index() + n as i64;
        Self::from_month_index(index)
    }

    /// Signed number of months from `earlier` to `self`
    pub fn months_since(&self, earlier: &Period) -> i64 {
        self.month_index() - earlier.month_index()
    }

    fn month_index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_month_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
