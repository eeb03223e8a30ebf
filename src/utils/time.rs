//! Time utilities

use chrono::{DateTime, Utc};

/// Current epoch seconds
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Current epoch seconds with millisecond precision, for history ordering
pub fn now_epoch_f64() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Parse an RFC 3339 datetime string into epoch seconds
pub fn parse_start_time(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).timestamp())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_start_time() {
        let ts = parse_start_time("2024-01-15T12:00:00Z");
        assert_eq!(ts, Some(1705320000));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_start_time("not a date").is_none());
        assert!(parse_start_time("2024-01-15 12:00").is_none());
    }

    #[test]
    fn epoch_f64_has_subsecond_precision() {
        let a = now_epoch_f64();
        assert!(a > 1_600_000_000.0);
    }
}
