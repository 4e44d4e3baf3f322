//! Event source adapters
//!
//! Every backend implements [`EventSource`]. Implementors provide the fallible
//! `try_*` methods; the provided boundary methods turn any failure into an
//! empty result (logged at warn) and stamp each returned event with the
//! adapter's name. Callers above this layer never see adapter errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_common::event::stamp_source;
use habit_common::{time, Event};
use tracing::warn;

use crate::error::SourceError;

pub mod calendar;
pub mod database;
pub mod mock;
pub mod sheets;

pub use calendar::CalendarSource;
pub use database::DatabaseSource;
pub use mock::MockSource;
pub use sheets::SheetsSource;

/// Pluggable habit-event backend
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Adapter identifier (e.g. "mock_data", "supabase")
    fn name(&self) -> &str;

    /// Whether the backend is reachable and configured right now
    ///
    /// Never fails; any probe error means `false`.
    async fn is_available(&self) -> bool;

    /// Every event the backend holds
    async fn try_fetch_all(&self) -> Result<Vec<Event>, SourceError>;

    /// Events whose timestamp lies in `[start, end]`
    async fn try_fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, SourceError>;

    /// Every event, or empty on any failure
    async fn fetch_all(&self) -> Vec<Event> {
        let result = self.try_fetch_all().await;
        collapse(self.name(), "fetch_all", result)
    }

    /// Events in `[start, end]`, or empty on any failure
    async fn fetch_by_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Event> {
        let result = self.try_fetch_by_range(start, end).await;
        collapse(self.name(), "fetch_by_range", result)
    }

    /// Events from local midnight `days` days ago up to now
    async fn fetch_recent(&self, days: u32) -> Vec<Event> {
        let (start, end) = time::recent_window(time::now(), days);
        self.fetch_by_range(start, end).await
    }
}

/// Calendar-style feed of today's upcoming entries
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    fn name(&self) -> &str;

    /// Display strings for entries later today
    async fn try_upcoming_today(&self) -> Result<Vec<String>, SourceError>;

    /// Display strings for entries later today, or empty on any failure
    async fn upcoming_today(&self) -> Vec<String> {
        match self.try_upcoming_today().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = self.name(), error = %e, "Upcoming entries unavailable");
                Vec::new()
            }
        }
    }
}

fn collapse(
    source_name: &str,
    operation: &str,
    result: Result<Vec<Event>, SourceError>,
) -> Vec<Event> {
    match result {
        Ok(mut events) => {
            stamp_source(&mut events, source_name);
            events
        }
        Err(e) => {
            warn!(
                source = source_name,
                operation,
                error = %e,
                "Source fetch failed, returning no events"
            );
            Vec::new()
        }
    }
}

/// Keep events whose timestamp parses and falls inside `[start, end]`
///
/// Unparseable timestamps are skipped with a warning.
pub(crate) fn retain_in_range(
    source_name: &str,
    events: Vec<Event>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| {
            if event.falls_within(start, end) {
                return true;
            }
            if event.parsed_timestamp().is_none() {
                warn!(
                    source = source_name,
                    id = %event.id,
                    date = %event.timestamp,
                    "Skipping event with unparseable timestamp"
                );
            }
            false
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FailingSource;

    #[async_trait]
    impl EventSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn is_available(&self) -> bool {
            false
        }

        async fn try_fetch_all(&self) -> Result<Vec<Event>, SourceError> {
            Err(SourceError::NotConfigured("no backend".to_string()))
        }

        async fn try_fetch_by_range(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Event>, SourceError> {
            Err(SourceError::Parse("bad payload".to_string()))
        }
    }

    fn event(id: &str, date: &str) -> Event {
        Event {
            id: id.to_string(),
            name: format!("Event {}", id),
            timestamp: date.to_string(),
            participants: None,
            duration_minutes: 10,
            categories: vec![],
            source: None,
        }
    }

    #[tokio::test]
    async fn test_failures_collapse_to_empty() {
        let source = FailingSource;
        assert!(source.fetch_all().await.is_empty());
        assert!(source.fetch_recent(7).await.is_empty());
    }

    #[test]
    fn test_retain_in_range_is_inclusive_and_skips_garbage() {
        let start = Utc.with_ymd_and_hms(2025, 1, 14, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
        let events = vec![
            event("a", "2025-01-14T00:00:00Z"),
            event("b", "2025-01-14T12:00:00Z"),
            event("c", "2025-01-14T12:00:01Z"),
            event("d", "not a date"),
        ];

        let kept = retain_in_range("test", events, start, end);
        let ids: Vec<_> = kept.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fetch_recent_huge_span_keeps_everything() {
        let source = MockSource::with_events(
            "fixture",
            vec![event("old", "1900-01-01T00:00:00Z"), event("bad", "someday")],
        );
        let events = source.fetch_recent(u32::MAX).await;
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["old"]);
    }
}
