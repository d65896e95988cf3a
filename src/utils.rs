use std::fmt::Write;

use crate::model::Timestamp;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIME_WITH_SECONDS_FORMAT: &str = "%H:%M:%S";

/// Formats `timestamp` in its own offset using a strftime `pattern`. An
/// invalid pattern yields an empty string.
pub fn format_timestamp(timestamp: &Timestamp, pattern: &str) -> String {
    let mut result = String::new();
    if write!(result, "{}", timestamp.0.format(pattern)).is_err() {
        result.clear();
    }
    result
}

/// Seconds as minutes with two decimals; empty when absent.
pub fn as_minutes(seconds: Option<f64>) -> String {
    match seconds {
        None => String::new(),
        Some(seconds) => format!("{:.2}", seconds / 60.0),
    }
}

/// Whole minutes from `start` to `end`, truncated towards zero.
pub fn minutes_between(start: &Timestamp, end: &Timestamp) -> i64 {
    (end.0 - start.0).num_minutes()
}
