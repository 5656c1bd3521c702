use chrono::{TimeZone, Utc};

/// Render an epoch-millisecond instant as RFC 3339 for log output.
///
/// Falls back to the raw millisecond value when the timestamp is outside
/// chrono's representable range.
pub fn format_instant(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{timestamp_ms}ms"),
    }
}
