//! In-memory fixture source
//!
//! Always available. Serves six sample events spread over 2025-01-13 and
//! 2025-01-14 unless constructed with explicit events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_common::Event;

use super::{retain_in_range, EventSource};
use crate::error::SourceError;

pub const MOCK_SOURCE_NAME: &str = "mock_data";

/// Fixture-backed adapter
pub struct MockSource {
    name: String,
    events: Vec<Event>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Adapter serving the built-in sample events
    pub fn new() -> Self {
        Self::with_events(MOCK_SOURCE_NAME, sample_events())
    }

    /// Adapter serving caller-supplied events under `name`
    pub fn with_events(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

#[async_trait]
impl EventSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn try_fetch_all(&self) -> Result<Vec<Event>, SourceError> {
        Ok(self.events.clone())
    }

    async fn try_fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, SourceError> {
        Ok(retain_in_range(&self.name, self.events.clone(), start, end))
    }
}

fn sample(
    id: &str,
    name: &str,
    date: &str,
    participants: Option<&[&str]>,
    duration: u32,
    categories: &[&str],
) -> Event {
    Event {
        id: id.to_string(),
        name: name.to_string(),
        timestamp: date.to_string(),
        participants: participants.map(|p| p.iter().map(|s| s.to_string()).collect()),
        duration_minutes: duration,
        categories: categories.iter().map(|s| s.to_string()).collect(),
        source: None,
    }
}

/// The fixture data set
pub fn sample_events() -> Vec<Event> {
    vec![
        sample(
            "cal_001",
            "Morning Workout",
            "2025-01-14T06:00:00.000Z",
            None,
            60,
            &["fitness", "morning"],
        ),
        sample(
            "cal_002",
            "Grocery Shopping",
            "2025-01-14T10:30:00.000Z",
            None,
            45,
            &["food", "errands"],
        ),
        sample(
            "cal_003",
            "Cooking Dinner",
            "2025-01-14T18:00:00.000Z",
            Some(&["partner"]),
            90,
            &["food", "cooking"],
        ),
        sample(
            "cal_004",
            "Interview Study",
            "2025-01-14T20:00:00.000Z",
            None,
            120,
            &["career", "learning"],
        ),
        sample(
            "cal_005",
            "Evening Run",
            "2025-01-13T19:00:00.000Z",
            None,
            30,
            &["fitness", "cardio"],
        ),
        sample(
            "cal_006",
            "Meal Prep",
            "2025-01-13T14:00:00.000Z",
            None,
            120,
            &["food", "cooking", "prep"],
        ),
    ]
}
