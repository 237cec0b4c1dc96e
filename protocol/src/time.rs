use chrono::DateTime;
use chrono::Utc;

/// Epoch values below this are seconds, above it milliseconds.
const EPOCH_MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// Interpret an event time for display and ordering.
///
/// Accepts RFC 3339 (the server emits nanosecond precision) and integer
/// epochs. Returns `None` for anything else; callers must still treat the
/// raw string as the authoritative cursor.
pub fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    let n: i64 = raw.parse().ok()?;
    if n.unsigned_abs() < EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp(n, 0)
    } else {
        DateTime::from_timestamp_millis(n)
    }
}
