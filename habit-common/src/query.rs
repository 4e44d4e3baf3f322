//! Filtering, sorting and aggregate metrics over event lists
//!
//! Pure functions used by the HTTP layer. Inputs are small in-memory lists;
//! nothing here performs I/O.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::event::Event;

// ============================================================================
// Metrics
// ============================================================================

/// Totals over a set of events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub total_events: usize,
    pub total_duration: u64,
    pub categories_count: BTreeMap<String, usize>,
    pub average_duration: f64,
}

/// Compute totals, per-category counts and the mean duration
pub fn daily_metrics(events: &[Event]) -> DailyMetrics {
    let total_duration: u64 = events.iter().map(|e| u64::from(e.duration_minutes)).sum();

    let mut categories_count = BTreeMap::new();
    for category in events.iter().flat_map(|e| e.categories.iter()) {
        *categories_count.entry(category.clone()).or_insert(0) += 1;
    }

    let average_duration = if events.is_empty() {
        0.0
    } else {
        total_duration as f64 / events.len() as f64
    };

    DailyMetrics {
        total_events: events.len(),
        total_duration,
        categories_count,
        average_duration,
    }
}

/// One event as listed under a category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEvent {
    pub name: String,
    pub date: String,
    pub duration: u32,
}

/// Per-category statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub count: usize,
    pub total_duration: u64,
    pub average_duration: f64,
    pub events: Vec<CategoryEvent>,
}

/// Group events by category; an event with several categories counts once in each
pub fn category_analytics(events: &[Event]) -> BTreeMap<String, CategoryStats> {
    let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();

    for event in events {
        for category in &event.categories {
            let entry = stats.entry(category.clone()).or_insert_with(|| CategoryStats {
                count: 0,
                total_duration: 0,
                average_duration: 0.0,
                events: Vec::new(),
            });
            entry.count += 1;
            entry.total_duration += u64::from(event.duration_minutes);
            entry.events.push(CategoryEvent {
                name: event.name.clone(),
                date: event.timestamp.clone(),
                duration: event.duration_minutes,
            });
        }
    }

    for entry in stats.values_mut() {
        if entry.count > 0 {
            entry.average_duration = entry.total_duration as f64 / entry.count as f64;
        }
    }

    stats
}

/// Activity on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: String,
    pub total_events: usize,
    pub total_duration: u64,
    pub categories: Vec<String>,
    pub unique_categories: usize,
}

/// Bucket events by the `YYYY-MM-DD` prefix of their timestamp, sorted by day
pub fn trend_analytics(events: &[Event]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<String, (usize, u64, BTreeSet<String>)> = BTreeMap::new();

    for event in events {
        let bucket = days.entry(event.date_key().to_string()).or_default();
        bucket.0 += 1;
        bucket.1 += u64::from(event.duration_minutes);
        bucket.2.extend(event.categories.iter().cloned());
    }

    days.into_iter()
        .map(|(date, (total_events, total_duration, categories))| DailyTrend {
            date,
            total_events,
            total_duration,
            unique_categories: categories.len(),
            categories: categories.into_iter().collect(),
        })
        .collect()
}

/// Summary block of the analytics tab
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_categories: usize,
    pub total_events: usize,
    pub total_duration: u64,
    pub average_events_per_category: f64,
    pub time_range_days: u32,
    pub category_filter: Option<String>,
}

/// Summarize category statistics
///
/// `total_events` sums per-category counts, so an event tagged twice counts twice.
pub fn analytics_summary(
    categories: &BTreeMap<String, CategoryStats>,
    time_range_days: u32,
    category_filter: Option<String>,
) -> AnalyticsSummary {
    let total_events: usize = categories.values().map(|c| c.count).sum();
    let total_duration: u64 = categories.values().map(|c| c.total_duration).sum();
    let average_events_per_category = if categories.is_empty() {
        0.0
    } else {
        total_events as f64 / categories.len() as f64
    };

    AnalyticsSummary {
        total_categories: categories.len(),
        total_events,
        total_duration,
        average_events_per_category,
        time_range_days,
        category_filter,
    }
}

// ============================================================================
// Filtering and sorting
// ============================================================================

/// Sort key for habit listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Duration,
    Name,
}

impl SortKey {
    /// Parse a sort key; unknown keys yield `None` and leave order unchanged
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(Self::Date),
            "duration" => Some(Self::Duration),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

/// Filter and sort options for habit listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: String,
    pub sort_order: String,
    pub limit: Option<usize>,
}

impl Default for HabitQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            sort_by: "date".to_string(),
            sort_order: "desc".to_string(),
            limit: None,
        }
    }
}

/// Result of [`filter_and_sort`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitListing {
    pub habits: Vec<Event>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub available_categories: Vec<String>,
    pub applied_filters: HabitQuery,
}

/// Apply search, category filter, sort and limit
///
/// Search is a case-insensitive substring match over the name and every
/// category. The category filter is an exact match. Sorting is stable, so
/// ties keep their source order in both directions.
pub fn filter_and_sort(events: Vec<Event>, query: HabitQuery) -> HabitListing {
    let total_count = events.len();
    let available_categories: Vec<String> = events
        .iter()
        .flat_map(|e| e.categories.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut habits: Vec<Event> = events;

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        habits.retain(|e| {
            e.name.to_lowercase().contains(&needle)
                || e.categories.iter().any(|c| c.to_lowercase().contains(&needle))
        });
    }

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        habits.retain(|e| e.categories.iter().any(|c| c == category));
    }

    let descending = query.sort_order == "desc";
    match SortKey::parse(&query.sort_by) {
        Some(SortKey::Date) => sort_stable(&mut habits, descending, |a, b| a.timestamp.cmp(&b.timestamp)),
        Some(SortKey::Duration) => {
            sort_stable(&mut habits, descending, |a, b| a.duration_minutes.cmp(&b.duration_minutes))
        }
        Some(SortKey::Name) => sort_stable(&mut habits, descending, |a, b| {
            a.name.to_lowercase().cmp(&b.name.to_lowercase())
        }),
        None => {}
    }

    if let Some(limit) = query.limit {
        habits.truncate(limit);
    }

    HabitListing {
        filtered_count: habits.len(),
        habits,
        total_count,
        available_categories,
        applied_filters: query,
    }
}

fn sort_stable<F>(events: &mut [Event], descending: bool, compare: F)
where
    F: Fn(&Event, &Event) -> std::cmp::Ordering,
{
    if descending {
        events.sort_by(|a, b| compare(b, a));
    } else {
        events.sort_by(|a, b| compare(a, b));
    }
}
