//! Source aggregator
//!
//! Holds the registered adapters in registration order, tracks which one is
//! primary, and merges results across adapters. Adapters are registered at
//! startup and never removed; only the primary selection changes afterwards.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use habit_common::Event;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::sources::{CalendarFeed, EventSource};

/// Pseudo source name selecting the merged view of every adapter
pub const ALL_SOURCES: &str = "all";

/// Shown when no calendar adapter can supply today's entries
pub const FALLBACK_UPCOMING: [&str; 2] = ["Evening meditation", "Reading session"];

/// Ordered adapter registry with a primary selection
pub struct SourceAggregator {
    sources: Vec<Arc<dyn EventSource>>,
    primary: RwLock<Option<Arc<dyn EventSource>>>,
    calendar: Option<Arc<dyn CalendarFeed>>,
}

impl Default for SourceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAggregator {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            primary: RwLock::new(None),
            calendar: None,
        }
    }

    /// Append an adapter; the first one registered becomes primary
    pub fn register(&mut self, source: Arc<dyn EventSource>) {
        info!(source = source.name(), "Registered event source");
        let primary = self.primary.get_mut();
        if primary.is_none() {
            *primary = Some(source.clone());
        }
        self.sources.push(source);
    }

    /// Attach the calendar feed used for today's upcoming entries
    pub fn set_calendar(&mut self, calendar: Arc<dyn CalendarFeed>) {
        info!(source = calendar.name(), "Attached calendar feed");
        self.calendar = Some(calendar);
    }

    pub fn calendar(&self) -> Option<&Arc<dyn CalendarFeed>> {
        self.calendar.as_ref()
    }

    /// Registered adapter names in registration order
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub async fn primary_name(&self) -> Option<String> {
        self.primary
            .read()
            .await
            .as_ref()
            .map(|s| s.name().to_string())
    }

    fn find(&self, name: &str) -> Option<Arc<dyn EventSource>> {
        self.sources.iter().find(|s| s.name() == name).cloned()
    }

    /// Make the named adapter primary; `false` (and no change) for an unknown name
    pub async fn set_primary(&self, name: &str) -> bool {
        match self.find(name) {
            Some(source) => {
                *self.primary.write().await = Some(source);
                info!(source = name, "Primary source changed");
                true
            }
            None => {
                warn!(source = name, "Cannot set unknown source as primary");
                false
            }
        }
    }

    /// The named adapter, or the primary when `name` is `None`
    async fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn EventSource>> {
        match name {
            Some(name) => {
                let found = self.find(name);
                if found.is_none() {
                    debug!(source = name, "Unknown source requested");
                }
                found
            }
            None => self.primary.read().await.clone(),
        }
    }

    /// Names of adapters reporting themselves available, in registration order
    pub async fn available_sources(&self) -> Vec<String> {
        let checks = join_all(self.sources.iter().map(|s| s.is_available())).await;
        self.sources
            .iter()
            .zip(checks)
            .filter(|(_, available)| *available)
            .map(|(s, _)| s.name().to_string())
            .collect()
    }

    /// All events from the named adapter (primary when `None`); empty for unknown names
    pub async fn fetch_all(&self, name: Option<&str>) -> Vec<Event> {
        match self.resolve(name).await {
            Some(source) => source.fetch_all().await,
            None => Vec::new(),
        }
    }

    /// Events in `[start, end]` from the named adapter (primary when `None`)
    pub async fn fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name: Option<&str>,
    ) -> Vec<Event> {
        match self.resolve(name).await {
            Some(source) => source.fetch_by_range(start, end).await,
            None => Vec::new(),
        }
    }

    /// Recent events from the named adapter (primary when `None`)
    pub async fn fetch_recent(&self, days: u32, name: Option<&str>) -> Vec<Event> {
        match self.resolve(name).await {
            Some(source) => source.fetch_recent(days).await,
            None => Vec::new(),
        }
    }

    /// Merge every available adapter's events, dropping duplicate ids
    ///
    /// Adapters are queried concurrently; results are concatenated in
    /// registration order. When an id appears more than once, the copy from
    /// the latest-registered adapter wins; see [`dedupe_prefer_later`].
    pub async fn fetch_from_all_sources(&self) -> Vec<Event> {
        let fetches = self.sources.iter().map(|source| async move {
            if source.is_available().await {
                source.fetch_all().await
            } else {
                debug!(source = source.name(), "Skipping unavailable source");
                Vec::new()
            }
        });

        let combined: Vec<Event> = join_all(fetches).await.into_iter().flatten().collect();
        dedupe_prefer_later(combined)
    }

    /// Display strings for calendar entries later today
    ///
    /// Falls back to a fixed list when no calendar feed is attached or the
    /// feed fails in transport or at the API. A feed without usable
    /// credentials, or an empty calendar, yields an empty list.
    pub async fn upcoming_today(&self) -> Vec<String> {
        let Some(calendar) = &self.calendar else {
            return fallback_upcoming();
        };

        match calendar.try_upcoming_today().await {
            Ok(entries) => entries,
            Err(SourceError::NotConfigured(reason)) => {
                debug!(source = calendar.name(), reason = %reason, "Calendar not authorized");
                Vec::new()
            }
            Err(e) => {
                warn!(source = calendar.name(), error = %e, "Calendar unavailable, using fallback entries");
                fallback_upcoming()
            }
        }
    }
}

fn fallback_upcoming() -> Vec<String> {
    FALLBACK_UPCOMING.iter().map(|s| s.to_string()).collect()
}

/// Drop duplicate ids, keeping the last occurrence of each
///
/// Works by reversing the list, keeping first-seen ids, and reversing back.
/// Survivors therefore sit where their last occurrence sat, so a duplicated
/// event appears at the position of the later adapter's copy.
pub fn dedupe_prefer_later(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Event> = events
        .into_iter()
        .rev()
        .filter(|event| seen.insert(event.id.clone()))
        .collect();
    kept.reverse();
    kept
}
