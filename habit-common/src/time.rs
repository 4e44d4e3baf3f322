//! Timestamp utilities and query windows
//!
//! All windows are inclusive on both ends and expressed in UTC so they can be
//! compared directly against parsed event timestamps.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};

/// Get current local timestamp
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Local midnight at the start of the day containing `at`
pub fn local_midnight(at: DateTime<Local>) -> DateTime<Local> {
    let naive = at.date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        // Midnight skipped by a DST jump: fall back to the instant itself
        .unwrap_or(at)
}

/// Window used by the default `fetch_recent`: from local midnight `days` days
/// ago up to `now`
///
/// Spans reaching past the representable range start at the earliest instant.
pub fn recent_window(now: DateTime<Local>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(now)
        .with_timezone(&Utc)
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    (start, now.with_timezone(&Utc))
}

/// Today from local midnight through the next local midnight
pub fn today_window(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(now);
    let end = start + Duration::days(1);
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

/// Trailing window `[now - span, now]`
pub fn trailing_window(now: DateTime<Local>, span: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    ((now - span).with_timezone(&Utc), now.with_timezone(&Utc))
}

/// Convert seconds to a std duration, used for per-adapter network timeouts
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}
