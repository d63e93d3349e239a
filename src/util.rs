// Parsing and formatting helpers.
//
// All the loose string handling of the input feed lives here: decimal
// conventions and the mixed date layouts. Formatting helpers at the bottom
// are only used by the console/CSV presentation.
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use num_format::{Locale, ToFormattedString};

/// Decimal and grouping separators used by numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal: char,
    pub thousands: Option<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal: ',',
            thousands: None,
        }
    }
}

impl NumberFormat {
    pub const DOT: NumberFormat = NumberFormat {
        decimal: '.',
        thousands: None,
    };
}

/// Parse a numeric cell under the given separator convention.
///
/// Returns `None` for empty cells, cells containing letters, and anything
/// that does not parse to a finite number.
pub fn parse_f64_safe(s: Option<&str>, fmt: NumberFormat) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut normalized: String = match fmt.thousands {
        Some(sep) => s.chars().filter(|c| *c != sep).collect(),
        None => s.to_string(),
    };
    if fmt.decimal != '.' {
        normalized = normalized.replace(fmt.decimal, ".");
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

const YEAR_FIRST: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DAY_FIRST: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];
const TIME_LAYOUTS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

fn parse_with(s: &str, layouts: &[&str]) -> Option<NaiveDate> {
    layouts
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
}

/// Resolve a date string with no time part. Each string is handled on its
/// own: year-first layouts are unambiguous, everything else is read
/// day-first, and month-first is only tried when day-first cannot be valid
/// (`1/25/2019`). The year must be written with exactly four digits.
pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let mut digit_runs = s.split(|c: char| !c.is_ascii_digit()).filter(|t| !t.is_empty());
    if digit_runs.next()?.len() == 4 {
        return parse_with(s, YEAR_FIRST);
    }
    // %Y accepts 1 to 4 digits, so `05/01/19` would otherwise land in year 19
    if digit_runs.last()?.len() != 4 {
        return None;
    }
    parse_with(s, DAY_FIRST).or_else(|| parse_with(s, MONTH_FIRST))
}

pub fn parse_time_safe(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveTime::parse_from_str(s, layout).ok())
}

/// Parse a date or date-time string into a timezone-naive timestamp.
///
/// Strings carrying an offset (RFC 3339) keep their wall-clock time and
/// drop the offset. Returns the timestamp and whether a time of day was
/// present in the string.
pub fn parse_timestamp(s: &str) -> Option<(NaiveDateTime, bool)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some((dt.naive_local(), true));
    }
    match s.split_once(['T', ' ']) {
        Some((date, time)) => {
            let date = parse_date_safe(date)?;
            let time = parse_time_safe(time)?;
            Some((date.and_time(time), true))
        }
        None => Some((parse_date_safe(s)?.and_time(NaiveTime::MIN), false)),
    }
}

/// Fixed-decimal formatting with `en` thousands separators
/// (`1234567.891` → `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|v| v.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    let sign = if n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn format_money(currency: &str, amount: f64) -> String {
    if currency.is_empty() {
        format_number(amount, 2)
    } else {
        format!("{} {}", currency, format_number(amount, 2))
    }
}

/// Signed percentage with one decimal (`+33.3%`).
pub fn format_percent_signed(p: f64) -> String {
    format!("{:+.1}%", p)
}
