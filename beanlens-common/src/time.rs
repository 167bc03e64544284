//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC timestamp as RFC 3339 text (microsecond precision, `+00:00` offset)
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Convert fractional seconds to a duration
///
/// Negatives and NaN clamp to zero; values too large for a `Duration`
/// saturate to `Duration::MAX`.
pub fn secs_to_duration(secs: f64) -> std::time::Duration {
    if secs > 0.0 {
        std::time::Duration::try_from_secs_f64(secs).unwrap_or(std::time::Duration::MAX)
    } else {
        std::time::Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_now_rfc3339_parses_back() {
        let text = now_rfc3339();
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(text.ends_with("+00:00"));
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(2.0), Duration::from_secs(2));
        assert_eq!(secs_to_duration(0.5), Duration::from_millis(500));
    }

    #[test]
    fn test_secs_to_duration_rejects_negative_and_nan() {
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_secs_to_duration_saturates() {
        assert_eq!(secs_to_duration(1e30), Duration::MAX);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::MAX);
    }
}
