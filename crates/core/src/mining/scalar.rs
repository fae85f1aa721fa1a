//! Interpreting raw JSON values as booleans, numbers and dates.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;

/// Date-like shapes a string must have before we try to parse it as a date.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // ISO-8601 date-time, optional seconds/fraction/offset
        r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$",
        // ISO date
        r"^\d{4}-\d{2}-\d{2}$",
        // MM/DD/YYYY
        r"^\d{1,2}/\d{1,2}/\d{4}$",
        // DD-MM-YYYY
        r"^\d{1,2}-\d{1,2}-\d{4}$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Whether the string form of `value` is `true` or `false` (any case).
#[must_use]
pub fn is_boolean_like(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

/// Interpret a value as a finite number.
///
/// Native numbers are taken as-is; strings must parse completely (after
/// trimming), so `"50abc"` is not a number.
#[must_use]
pub fn as_finite_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Whether a string has one of the recognised date shapes.
#[must_use]
pub fn looks_like_date(text: &str) -> bool {
    DATE_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}

/// Parse a date or date-time string into a UTC timestamp.
///
/// Strings with an offset are normalised to UTC. Plain dates resolve to
/// midnight.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    for format in DATE_TIME_FORMATS {
        if format.ends_with("%z") {
            if let Ok(dt) = DateTime::parse_from_str(text, format) {
                return Some(dt.naive_utc());
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// A value that both looks like a date and parses as a real calendar date.
#[must_use]
pub fn as_date_like(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) if looks_like_date(s.trim()) => parse_timestamp(s),
        _ => None,
    }
}
