//! Time helpers.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a UTC time as RFC 3339 with millisecond precision and a `Z` suffix.
///
/// This is the wire format the chat backend uses for message timestamps.
pub fn to_rfc3339_millis(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a UTC time as a `HH:MM` clock in JST for terminal display.
pub fn to_jst_clock(time: &DateTime<Utc>) -> String {
    match FixedOffset::east_opt(9 * 3600) {
        Some(jst) => time.with_timezone(&jst).format("%H:%M").to_string(),
        None => time.format("%H:%M").to_string(),
    }
}
