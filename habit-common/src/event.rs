//! Canonical habit event model
//!
//! Every source adapter normalizes its records into [`Event`]. Events are
//! read-only snapshots: adapters build them, the aggregator stamps the
//! `source` field, and nothing mutates them afterwards.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single habit occurrence
///
/// Field names on the wire follow the HTTP contract used by the dashboard
/// (`date`, `duration`), so `timestamp` and `duration_minutes` are renamed
/// during (de)serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque identifier, unique within one source's result set
    pub id: String,

    /// Display label
    pub name: String,

    /// ISO-8601 text as stored by the source (may be a bare date)
    #[serde(rename = "date")]
    pub timestamp: String,

    /// `None` means participants are not tracked, which differs from an empty list
    #[serde(default)]
    pub participants: Option<Vec<String>>,

    /// Duration in minutes; zero for all-day markers
    #[serde(rename = "duration")]
    pub duration_minutes: u32,

    /// Free-text tags, not validated against the taxonomy at ingestion
    #[serde(default)]
    pub categories: Vec<String>,

    /// Name of the adapter that produced this event
    #[serde(default)]
    pub source: Option<String>,
}

impl Event {
    /// Parse the stored timestamp text into a UTC instant
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// `YYYY-MM-DD` prefix of the timestamp text, used for per-day bucketing
    pub fn date_key(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }

    /// True when the timestamp parses and lies within `[start, end]` (both inclusive)
    pub fn falls_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.parsed_timestamp()
            .map(|ts| start <= ts && ts <= end)
            .unwrap_or(false)
    }
}

/// Overwrite the `source` field of every event with `source_name`
pub fn stamp_source(events: &mut [Event], source_name: &str) {
    for event in events.iter_mut() {
        event.source = Some(source_name.to_string());
    }
}

/// Parse an event timestamp
///
/// Accepted forms:
/// - RFC 3339 with `Z` or an explicit offset
/// - naive `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DD HH:MM:SS[.fff]`, taken as local time
/// - bare `YYYY-MM-DD`, taken as local midnight (all-day marker)
///
/// Surrounding whitespace and double quotes are ignored. Returns `None` for
/// anything else.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim().trim_matches('"').trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_utc(naive);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_to_utc)
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(timestamp: &str) -> Event {
        Event {
            id: "e1".to_string(),
            name: "Morning Workout".to_string(),
            timestamp: timestamp.to_string(),
            participants: None,
            duration_minutes: 60,
            categories: vec!["health".to_string()],
            source: None,
        }
    }

    #[test]
    fn test_parse_rfc3339_zulu() {
        let ts = parse_timestamp("2025-01-14T06:00:00.000Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 14, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_offset() {
        let ts = parse_timestamp("2025-01-14T08:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 14, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_strips_quotes_and_whitespace() {
        assert!(parse_timestamp("  \"2025-01-14T06:00:00Z\" ").is_some());
    }

    #[test]
    fn test_parse_naive_is_local_time() {
        let ts = parse_timestamp("2025-01-14T06:00:00").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 1, 14, 6, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_parse_bare_date_is_local_midnight() {
        let ts = parse_timestamp("2025-01-14").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 1, 14, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2025-13-40").is_none());
    }

    #[test]
    fn test_falls_within_is_inclusive() {
        let event = sample("2025-01-14T06:00:00Z");
        let at = Utc.with_ymd_and_hms(2025, 1, 14, 6, 0, 0).unwrap();
        assert!(event.falls_within(at, at));
        assert!(!event.falls_within(at + chrono::Duration::seconds(1), at + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_falls_within_unparseable_is_excluded() {
        let event = sample("not a date");
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert!(!event.falls_within(start, end));
    }

    #[test]
    fn test_date_key() {
        assert_eq!(sample("2025-01-14T06:00:00Z").date_key(), "2025-01-14");
        assert_eq!(sample("short").date_key(), "short");
    }

    #[test]
    fn test_stamp_source_overwrites() {
        let mut events = vec![sample("2025-01-14"), sample("2025-01-15")];
        events[0].source = Some("upstream".to_string());
        stamp_source(&mut events, "mock_data");
        assert!(events.iter().all(|e| e.source.as_deref() == Some("mock_data")));
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample("2025-01-14T06:00:00Z")).unwrap();
        assert_eq!(json["date"], "2025-01-14T06:00:00Z");
        assert_eq!(json["duration"], 60);
        assert!(json["participants"].is_null());
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_deserialize_without_source() {
        let event: Event = serde_json::from_str(
            r#"{"id":"x","name":"Walk","date":"2025-01-14","duration":0,"categories":[]}"#,
        )
        .unwrap();
        assert_eq!(event.source, None);
        assert_eq!(event.participants, None);
        assert_eq!(event.duration_minutes, 0);
    }
}
