// Month-granularity period keys.
//
// A `PeriodKey` is a (year, month) pair. Ordering is chronological and
// subtraction yields the distance in months, so "the previous month" is
// plain integer arithmetic on the month ordinal, including across year
// boundaries.
use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    /// `month` is 1-based (1 = January). Months outside 1..=12 carry
    /// into the neighbouring years: `new(2019, 13)` is January 2020 and
    /// `new(2019, 0)` is December 2018.
    pub fn new(year: i32, month: u32) -> Self {
        let ordinal = i64::from(year) * 12 + i64::from(month) - 1;
        PeriodKey {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn try_new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(PeriodKey { year, month })
    }

    /// Day and time of day are discarded.
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        PeriodKey::new(ts.year(), ts.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed since January of year 0.
    pub fn ordinal(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }

    pub fn from_ordinal(ordinal: i32) -> Self {
        PeriodKey {
            year: ordinal.div_euclid(12),
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn previous(&self) -> Self {
        PeriodKey::from_ordinal(self.ordinal() - 1)
    }

    pub fn next(&self) -> Self {
        PeriodKey::from_ordinal(self.ordinal() + 1)
    }

    /// Short label such as `Jan/2019`.
    pub fn label(&self) -> String {
        format!("{}/{}", MONTH_ABBR[(self.month - 1) as usize], self.year)
    }
}

impl Sub for PeriodKey {
    type Output = i32;

    fn sub(self, rhs: PeriodKey) -> i32 {
        self.ordinal() - rhs.ordinal()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePeriodError(String);

impl fmt::Display for ParsePeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid period '{}': expected YYYY-MM or Mon/YYYY", self.0)
    }
}

impl std::error::Error for ParsePeriodError {}

impl FromStr for PeriodKey {
    type Err = ParsePeriodError;

    /// Accepts `2019-01` or `Jan/2019` (month name is case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParsePeriodError(s.to_string());

        if let Some((year, month)) = s.split_once('-') {
            let year: i32 = year.parse().map_err(|_| err())?;
            let month: u32 = month.parse().map_err(|_| err())?;
            return PeriodKey::try_new(year, month).ok_or_else(err);
        }

        let (name, year) = s.split_once('/').ok_or_else(err)?;
        let month = MONTH_ABBR
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        Ok(PeriodKey::new(year, month as u32 + 1))
    }
}
