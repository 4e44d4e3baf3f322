//! Public spreadsheet source via CSV export
//!
//! No authentication: the sheet must be shared for link access. The export
//! is expected to have the header columns `ID, Name, Date, Participants,
//! Duration, Categories` in any order. Rows that fail to parse are skipped
//! with a warning; the rest of the sheet is still returned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_common::config::SheetsConfig;
use habit_common::time::secs_to_duration;
use habit_common::Event;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{retain_in_range, EventSource};
use crate::error::SourceError;

pub const SHEETS_SOURCE_NAME: &str = "google_sheets_simple";

/// Quoted or backticked items inside a categories cell
static QUOTED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["`]([^"`]+)["`]"#).expect("static regex")
});

/// CSV export URL for a sheet id
pub fn export_url(sheet_id: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        sheet_id
    )
}

/// CSV-export adapter
pub struct SheetsSource {
    client: reqwest::Client,
    url: String,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl SheetsSource {
    /// Adapter for the sheet with id `sheet_id`
    pub fn new(sheet_id: &str, config: &SheetsConfig) -> Result<Self, SourceError> {
        Self::with_export_url(export_url(sheet_id), config)
    }

    /// Adapter reading CSV from an arbitrary URL
    pub fn with_export_url(url: impl Into<String>, config: &SheetsConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("habit-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            probe_timeout: secs_to_duration(config.probe_timeout_secs),
            fetch_timeout: secs_to_duration(config.timeout_secs),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSource for SheetsSource {
    fn name(&self) -> &str {
        SHEETS_SOURCE_NAME
    }

    async fn is_available(&self) -> bool {
        let response = match self
            .client
            .get(&self.url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Sheet availability check failed");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(url = %self.url, status = %response.status(), "Sheet not accessible");
            return false;
        }

        match response.bytes().await {
            Ok(body) => !body.is_empty(),
            Err(e) => {
                warn!(url = %self.url, error = %e, "Sheet availability check failed");
                false
            }
        }
    }

    async fn try_fetch_all(&self) -> Result<Vec<Event>, SourceError> {
        debug!(url = %self.url, "Fetching sheet export");

        let response = self
            .client
            .get(&self.url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::from_response(response).await);
        }

        let text = response.text().await?;
        let events = parse_csv(&text)?;
        info!(count = events.len(), "Parsed events from sheet");
        Ok(events)
    }

    async fn try_fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, SourceError> {
        let events = self.try_fetch_all().await?;
        Ok(retain_in_range(SHEETS_SOURCE_NAME, events, start, end))
    }
}

/// Header positions of the expected columns
struct Columns {
    id: usize,
    name: usize,
    date: usize,
    participants: Option<usize>,
    duration: Option<usize>,
    categories: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, SourceError> {
        let find = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);
        let require = |wanted: &str| {
            find(wanted).ok_or_else(|| SourceError::Parse(format!("missing column '{}'", wanted)))
        };

        Ok(Self {
            id: require("ID")?,
            name: require("Name")?,
            date: require("Date")?,
            participants: find("Participants"),
            duration: find("Duration"),
            categories: find("Categories"),
        })
    }
}

/// Parse a CSV export into events
///
/// Fails only when the header row lacks `ID`, `Name` or `Date`. Individual
/// malformed rows are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<Event>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Parse(format!("unreadable header row: {}", e)))?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut events = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|record| parse_row(&record, &columns));
        match parsed {
            Ok(event) => events.push(event),
            Err(reason) => warn!(row = index, error = %reason, "Skipping malformed sheet row"),
        }
    }
    Ok(events)
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> &str {
    index.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Result<Event, String> {
    let id = cell(record, Some(columns.id));
    if id.is_empty() {
        return Err("missing ID".to_string());
    }
    let name = cell(record, Some(columns.name));
    if name.is_empty() {
        return Err(format!("missing Name for '{}'", id));
    }
    let date = cell(record, Some(columns.date)).trim_matches('"').trim();
    if date.is_empty() {
        return Err(format!("missing Date for '{}'", id));
    }

    Ok(Event {
        id: id.to_string(),
        name: name.to_string(),
        timestamp: date.to_string(),
        participants: parse_participants(cell(record, columns.participants)),
        duration_minutes: parse_duration(cell(record, columns.duration))?,
        categories: parse_categories(cell(record, columns.categories)),
        source: None,
    })
}

fn is_null_marker(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null")
}

/// Minutes from a numeric cell; fractional values are truncated, blank is zero
fn parse_duration(value: &str) -> Result<u32, String> {
    if value.is_empty() {
        return Ok(0);
    }
    let minutes: f64 = value
        .parse()
        .map_err(|_| format!("invalid Duration '{}'", value))?;
    if !minutes.is_finite() || minutes < 0.0 || minutes > f64::from(u32::MAX) {
        return Err(format!("invalid Duration '{}'", value));
    }
    Ok(minutes.trunc() as u32)
}

/// Categories cell to tag list
///
/// Accepts JSON-ish lists with double quotes or backticks, e.g.
/// ``["`workout","exercise","self-care`"]``, and falls back to a plain
/// comma-separated list.
pub fn parse_categories(value: &str) -> Vec<String> {
    let value = value.trim();
    if is_null_marker(value) {
        return Vec::new();
    }

    let inner = value.trim_matches(|c| c == '[' || c == ']');

    let quoted: Vec<String> = QUOTED_ITEM
        .captures_iter(inner)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !quoted.is_empty() {
        return quoted;
    }

    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '"' || c == '`').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Participants cell to an optional name list
///
/// Blank, `none` and `null` mean "not tracked" and yield `None`.
pub fn parse_participants(value: &str) -> Option<Vec<String>> {
    let value = value.trim();
    if is_null_marker(value) {
        return None;
    }

    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("none"))
            .map(str::to_string)
            .collect(),
    )
}
