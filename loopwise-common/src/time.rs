//! Time value utilities
//!
//! All media times in Loopwise are `f64` seconds. Samples coming from a media
//! backend are checked here before use: non-finite or negative values are
//! discarded rather than propagated.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Accept a raw time sample only if it is finite and non-negative
///
/// # Examples
///
/// ```
/// use loopwise_common::time::sanitize_seconds;
///
/// assert_eq!(sanitize_seconds(12.5), Some(12.5));
/// assert_eq!(sanitize_seconds(f64::NAN), None);
/// assert_eq!(sanitize_seconds(-0.1), None);
/// ```
pub fn sanitize_seconds(raw: f64) -> Option<f64> {
    if raw.is_finite() && raw >= 0.0 {
        Some(raw)
    } else {
        None
    }
}

/// Sanitize a duration, mapping unusable values to zero
///
/// A file with unknown duration is still playable, so callers get `0.0`
/// instead of an error.
pub fn duration_or_zero(raw: f64) -> f64 {
    sanitize_seconds(raw).unwrap_or(0.0)
}

/// Format a playback position for display
///
/// Under one hour: `M:SS.t` (tenths). One hour or more: `H:MM:SS`.
/// Unusable values render as `--:--`.
///
/// # Examples
///
/// ```
/// use loopwise_common::time::format_position;
///
/// assert_eq!(format_position(0.0), "0:00.0");
/// assert_eq!(format_position(65.5), "1:05.5");
/// assert_eq!(format_position(3725.0), "1:02:05");
/// assert_eq!(format_position(f64::INFINITY), "--:--");
/// ```
pub fn format_position(seconds: f64) -> String {
    let Some(seconds) = sanitize_seconds(seconds) else {
        return "--:--".to_string();
    };

    // Round once, up front, so 59.96 becomes 1:00.0 rather than 0:60.0
    let tenths = (seconds * 10.0).round() as u64;
    if tenths < 36_000 {
        let minutes = tenths / 600;
        let rem = tenths % 600;
        format!("{}:{:02}.{}", minutes, rem / 10, rem % 10)
    } else {
        let whole = tenths / 10;
        format!("{}:{:02}:{:02}", whole / 3600, (whole % 3600) / 60, whole % 60)
    }
}

/// Format an A-B region as `start - end`
pub fn format_region(start: f64, end: f64) -> String {
    format!("{} - {}", format_position(start), format_position(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_non_finite() {
        assert_eq!(sanitize_seconds(f64::INFINITY), None);
        assert_eq!(sanitize_seconds(f64::NEG_INFINITY), None);
        assert_eq!(sanitize_seconds(f64::NAN), None);
    }

    #[test]
    fn test_sanitize_accepts_zero() {
        assert_eq!(sanitize_seconds(0.0), Some(0.0));
    }

    #[test]
    fn test_duration_or_zero() {
        assert_eq!(duration_or_zero(120.0), 120.0);
        assert_eq!(duration_or_zero(f64::NAN), 0.0);
        assert_eq!(duration_or_zero(-3.0), 0.0);
    }

    #[test]
    fn test_format_position_rounding_carries_into_minutes() {
        assert_eq!(format_position(59.96), "1:00.0");
        assert_eq!(format_position(3599.96), "1:00:00");
    }

    #[test]
    fn test_format_position_negative() {
        assert_eq!(format_position(-1.0), "--:--");
    }

    #[test]
    fn test_format_region() {
        assert_eq!(format_region(10.0, 20.0), "0:10.0 - 0:20.0");
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }
}
