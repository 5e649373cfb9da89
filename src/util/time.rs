//! Millisecond timestamp helpers.
//!
//! Progress records store epoch milliseconds; these helpers convert them for
//! display and supply the current time.

use chrono::{DateTime, TimeZone, Utc};

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC datetime.
///
/// Out-of-range values collapse to the Unix epoch.
#[must_use]
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Describe when a review falls due relative to `now_ms`.
#[must_use]
pub fn format_due(next_review_at: i64, now_ms: i64) -> String {
    let delta = next_review_at - now_ms;
    if delta <= 0 {
        return "due now".to_string();
    }

    let minutes = delta / 60_000;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("in {days} day{}", if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        "in <1m".to_string()
    }
}

/// Format a `YYYY-MM` month key for an epoch-millisecond timestamp.
#[must_use]
pub fn month_key(ms: i64) -> String {
    ms_to_datetime(ms).format("%Y-%m").to_string()
}
