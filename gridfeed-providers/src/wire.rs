//! Timestamp helpers shared by the wire parsers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Parse an instant as written by the upstream feeds.
///
/// Accepts RFC 3339 (`2024-06-01T12:00:00Z`, offsets, fractional seconds)
/// and the minute-precision form `2024-06-01T12:00Z`.
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Unix seconds to an instant.
#[must_use]
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
