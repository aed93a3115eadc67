//! Shared utility functions used across multiple modules.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::DateTime;
use serde_json::Value;

/// Source of "now" for store writes and watermarks.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        unix_millis_now()
    }
}

/// Manually driven clock for tests and replays.
///
/// Every read advances the clock by `step` milliseconds so consecutive writes never share a
/// timestamp unless `step` is zero.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    pub const fn new(start: i64, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }

    /// Move the clock to an absolute time.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Peek at the next value without advancing.
    pub fn peek(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A wire value that cannot be read as a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTimestamp;

/// Parse a wire timestamp into epoch milliseconds.
///
/// Accepts integers, integral floats, numeric strings and RFC 3339 strings. `null` yields
/// `Ok(None)`; anything else is rejected.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_timestamp(value: &Value) -> Result<Option<i64>, InvalidTimestamp> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => {
            if let Some(millis) = number.as_i64() {
                return Ok(Some(millis));
            }
            number
                .as_f64()
                .filter(|float| float.is_finite() && float.fract() == 0.0)
                .map(|float| Some(float as i64))
                .ok_or(InvalidTimestamp)
        }
        Value::String(text) => {
            let text = text.trim();
            if let Ok(millis) = text.parse::<i64>() {
                return Ok(Some(millis));
            }
            DateTime::parse_from_rfc3339(text)
                .map(|parsed| Some(parsed.timestamp_millis()))
                .map_err(|_| InvalidTimestamp)
        }
        _ => Err(InvalidTimestamp),
    }
}

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_timestamp_accepts_integers_and_strings() {
        assert_eq!(parse_timestamp(&json!(1_700_000_000_000_i64)), Ok(Some(1_700_000_000_000)));
        assert_eq!(parse_timestamp(&json!("1700000000000")), Ok(Some(1_700_000_000_000)));
        assert_eq!(parse_timestamp(&json!(1_700_000_000_000.0)), Ok(Some(1_700_000_000_000)));
        assert_eq!(parse_timestamp(&Value::Null), Ok(None));
    }

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        assert_eq!(
            parse_timestamp(&json!("2024-01-01T00:00:00.250Z")),
            Ok(Some(1_704_067_200_250))
        );
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday")).is_err());
        assert!(parse_timestamp(&json!(true)).is_err());
        assert!(parse_timestamp(&json!(1.5)).is_err());
    }

    #[test]
    fn manual_clock_advances_by_step() {
        let clock = ManualClock::new(100, 10);
        assert_eq!(clock.now_millis(), 100);
        assert_eq!(clock.now_millis(), 110);
        clock.set(5);
        assert_eq!(clock.peek(), 5);
    }

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" device-a ".to_string())),
            Some("device-a".to_string())
        );
    }
}
