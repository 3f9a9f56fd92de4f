//! Encoding of timestamps on the container time axis.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// CF units string of the time coordinate.
pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// CF calendar of the time coordinate.
pub const TIME_CALENDAR: &str = "standard";

/// Resolution of the time axis in microseconds. Timestamps within the same
/// microsecond share a time slot.
pub const TIME_RESOLUTION_MICROS: i64 = 1;

/// Truncate `time` to whole microseconds; the value the time axis stores
/// and returns for it.
pub fn quantize(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_nanosecond(time.timestamp_subsec_micros() * 1_000)
        .unwrap_or(time)
}

/// Seconds since the Unix epoch, truncated to whole microseconds.
///
/// Distinct microseconds map to distinct values within a few centuries of
/// the epoch, and [`from_epoch_seconds`] recovers [`quantize`]`(time)`.
pub fn to_epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_micros()) / 1e6
}

/// Inverse of [`to_epoch_seconds`], rounded to the nearest microsecond.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1e6).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Parse an ISO 8601 timestamp, a naive datetime (assumed UTC) or a bare date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
