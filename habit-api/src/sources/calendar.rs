//! Google Calendar feed for "planned for today"
//!
//! Reads a stored OAuth token (refreshing it when expired) and lists today's
//! events on the primary calendar. Calendar entries are display strings only;
//! they never become habit events.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, SecondsFormat, Utc};
use habit_common::config::CalendarConfig;
use habit_common::time::{self, local_midnight, secs_to_duration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::CalendarFeed;
use crate::error::SourceError;

pub const CALENDAR_SOURCE_NAME: &str = "google_calendar";

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Treat tokens this close to expiry as already expired
const EXPIRY_SKEW_SECS: i64 = 10;

const MAX_RESULTS: &str = "20";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

/// Token file contents
///
/// Compatible with the `authorized_user` JSON written by Google's client
/// libraries, where the access token is stored under `token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "token")]
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Access token present and not about to expire
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_some()
            && self
                .expiry
                .map_or(true, |exp| exp > now + Duration::seconds(EXPIRY_SKEW_SECS))
    }

    fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = Some(grant.access_token);
        self.expiry = grant.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(refresh) = grant.refresh_token {
            self.refresh_token = Some(refresh);
        }
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// OAuth client secrets file (`installed` or `web` application)
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// `start`/`end` of a calendar item: exactly one of the fields is normally set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
}

/// Calendar item as returned by the events list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCalendarEvent {
    pub summary: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventsListing {
    #[serde(default)]
    items: Vec<RawCalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct CalendarListing {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Normalized calendar entry
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub summary: String,
    pub location: Option<String>,
    pub start: DateTime<Local>,
    pub all_day: bool,
}

impl CalendarEntry {
    /// Interpret a raw item; `None` when its start time cannot be parsed
    ///
    /// Items with no start at all are placed at `now`.
    pub fn from_raw(raw: RawCalendarEvent, now: DateTime<Local>) -> Option<Self> {
        let start = raw.start.unwrap_or_default();
        let (start, all_day) = match (start.date_time, start.date) {
            (Some(date_time), _) => (
                DateTime::parse_from_rfc3339(&date_time)
                    .ok()?
                    .with_timezone(&Local),
                false,
            ),
            (None, Some(date)) => {
                let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
                let noon = day.and_hms_opt(12, 0, 0)?.and_local_timezone(Local).earliest()?;
                (local_midnight(noon), true)
            }
            (None, None) => (now, false),
        };

        Some(Self {
            summary: raw
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Untitled Event".to_string()),
            location: raw.location.filter(|l| !l.trim().is_empty()),
            start,
            all_day,
        })
    }

    /// Starts later today
    pub fn is_upcoming_today(&self, now: DateTime<Local>) -> bool {
        self.start.date_naive() == now.date_naive() && self.start > now
    }

    /// `"9:05 AM"` style start time, or `"All day"`
    pub fn format_time(&self) -> String {
        if self.all_day {
            "All day".to_string()
        } else {
            self.start.format("%-I:%M %p").to_string()
        }
    }

    /// `"{time} - {summary}"`, plus `" ({location})"` when known
    pub fn display(&self) -> String {
        match &self.location {
            Some(location) => format!("{} - {} ({})", self.format_time(), self.summary, location),
            None => format!("{} - {}", self.format_time(), self.summary),
        }
    }
}

/// Display strings for raw items that start later today, in listing order
pub fn upcoming_display(items: Vec<RawCalendarEvent>, now: DateTime<Local>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|raw| {
            let entry = CalendarEntry::from_raw(raw, now);
            if entry.is_none() {
                warn!("Skipping calendar item with unparseable start time");
            }
            entry
        })
        .filter(|entry| entry.is_upcoming_today(now))
        .map(|entry| entry.display())
        .collect()
}

/// Result of [`CalendarSource::auth_status`]
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub message: String,
}

/// Google Calendar adapter
pub struct CalendarSource {
    client: reqwest::Client,
    credentials_file: PathBuf,
    token_file: PathBuf,
    redirect_uri: String,
    api_base: String,
}

impl CalendarSource {
    pub fn from_config(config: &CalendarConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("habit-api/", env!("CARGO_PKG_VERSION")))
            .timeout(secs_to_duration(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            credentials_file: config.credentials_file.clone(),
            token_file: config.token_file.clone(),
            redirect_uri: config.redirect_uri.clone(),
            api_base: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Point API calls at another base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    async fn load_token(&self) -> Result<StoredToken, SourceError> {
        if !self.token_file.exists() {
            return Err(SourceError::NotConfigured(
                "no stored calendar token; authorization needed".to_string(),
            ));
        }
        let text = tokio::fs::read_to_string(&self.token_file).await?;
        serde_json::from_str(&text)
            .map_err(|e| SourceError::Parse(format!("token file {}: {}", self.token_file.display(), e)))
    }

    async fn save_token(&self, token: &StoredToken) -> Result<(), SourceError> {
        let text = serde_json::to_string_pretty(token)
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        tokio::fs::write(&self.token_file, text).await?;
        Ok(())
    }

    async fn load_client_secrets(&self) -> Result<ClientSecrets, SourceError> {
        if !self.credentials_file.exists() {
            return Err(SourceError::NotConfigured(format!(
                "credentials file {} not found",
                self.credentials_file.display()
            )));
        }
        let text = tokio::fs::read_to_string(&self.credentials_file).await?;
        let file: ClientSecretsFile = serde_json::from_str(&text).map_err(|e| {
            SourceError::Parse(format!("credentials file {}: {}", self.credentials_file.display(), e))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            SourceError::Parse("credentials file has no 'installed' or 'web' section".to_string())
        })
    }

    /// Stored token, refreshed and re-saved when expired
    async fn credentials(&self) -> Result<StoredToken, SourceError> {
        let mut token = self.load_token().await?;
        let now = Utc::now();
        if token.is_fresh(now) {
            return Ok(token);
        }

        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.clone(),
            token.client_id.clone(),
            token.client_secret.clone(),
        ) else {
            return Err(SourceError::NotConfigured(
                "stored token expired and cannot be refreshed".to_string(),
            ));
        };

        debug!("Refreshing calendar access token");
        let response = self
            .client
            .post(&token.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::from_response(response).await);
        }
        let grant: TokenGrant = response.json().await?;
        token.apply_grant(grant, now);

        if let Err(e) = self.save_token(&token).await {
            warn!(error = %e, "Refreshed calendar token could not be saved");
        }
        Ok(token)
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        self.credentials()
            .await?
            .access_token
            .ok_or_else(|| SourceError::NotConfigured("stored token has no access token".to_string()))
    }

    /// Whether stored credentials work against the calendar API
    pub async fn auth_status(&self) -> AuthStatus {
        match self.check_access().await {
            Ok(()) => AuthStatus {
                authenticated: true,
                message: "Calendar access authorized".to_string(),
            },
            Err(SourceError::NotConfigured(reason)) => AuthStatus {
                authenticated: false,
                message: format!("Authorization required: {}", reason),
            },
            Err(e) => AuthStatus {
                authenticated: false,
                message: format!("Calendar check failed: {}", e),
            },
        }
    }

    async fn check_access(&self) -> Result<(), SourceError> {
        let access_token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/users/me/calendarList", self.api_base))
            .bearer_auth(access_token)
            .query(&[("maxResults", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::from_response(response).await);
        }
        let listing: CalendarListing = response.json().await?;
        if listing.items.is_empty() {
            return Err(SourceError::Auth("no calendars visible to this account".to_string()));
        }
        Ok(())
    }

    /// OAuth consent URL for offline, read-only calendar access
    pub async fn auth_url(&self) -> Result<String, SourceError> {
        let secrets = self.load_client_secrets().await?;
        let state = Uuid::new_v4().to_string();
        let url = reqwest::Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| SourceError::Parse(format!("invalid auth_uri '{}': {}", secrets.auth_uri, e)))?;
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens and store them
    pub async fn exchange_code(&self, code: &str) -> Result<(), SourceError> {
        let secrets = self.load_client_secrets().await?;
        let response = self
            .client
            .post(&secrets.token_uri)
            .form(&[
                ("code", code),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let err = SourceError::from_response(response).await;
            return Err(SourceError::Auth(format!("code exchange rejected: {}", err)));
        }
        let grant: TokenGrant = response.json().await?;

        let mut token = StoredToken {
            access_token: None,
            refresh_token: None,
            token_uri: secrets.token_uri,
            client_id: Some(secrets.client_id),
            client_secret: Some(secrets.client_secret),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            expiry: None,
        };
        token.apply_grant(grant, Utc::now());
        self.save_token(&token).await?;
        info!(path = %self.token_file.display(), "Stored calendar credentials");
        Ok(())
    }
}

#[async_trait]
impl CalendarFeed for CalendarSource {
    fn name(&self) -> &str {
        CALENDAR_SOURCE_NAME
    }

    async fn try_upcoming_today(&self) -> Result<Vec<String>, SourceError> {
        let access_token = self.access_token().await?;
        let now = time::now();
        let (start, end) = time::today_window(now);

        let response = self
            .client
            .get(format!("{}/calendars/primary/events", self.api_base))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("maxResults", MAX_RESULTS.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::from_response(response).await);
        }

        let listing: EventsListing = response.json().await?;
        debug!(count = listing.items.len(), "Fetched calendar items");
        Ok(upcoming_display(listing.items, now))
    }
}
