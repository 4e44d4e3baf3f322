//! Managed PostgreSQL source
//!
//! Expects a table (default `habit_events`) shaped like:
//!
//! ```sql
//! CREATE TABLE habit_events (
//!     id           TEXT PRIMARY KEY,
//!     name         TEXT NOT NULL,
//!     date         TIMESTAMPTZ NOT NULL,
//!     participants TEXT[],
//!     duration     INTEGER NOT NULL DEFAULT 0,
//!     categories   TEXT[] NOT NULL DEFAULT '{}'
//! );
//! ```
//!
//! The pool connects lazily, so construction never touches the network. A
//! missing URL or an invalid table name leaves the adapter unconfigured:
//! registered, but never available.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use habit_common::config::DatabaseConfig;
use habit_common::time::secs_to_duration;
use habit_common::Event;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use super::EventSource;
use crate::error::SourceError;

pub const DATABASE_SOURCE_NAME: &str = "supabase";

const MAX_CONNECTIONS: u32 = 5;

/// Result of [`DatabaseSource::connection_status`]
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub status: String,
    pub message: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<i64>,
}

/// PostgreSQL adapter
pub struct DatabaseSource {
    pool: Option<PgPool>,
    table: String,
}

impl DatabaseSource {
    /// Build from configuration; never fails, but may be unconfigured
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let table = config.table.clone();

        let pool = match config.url.as_deref().filter(|u| !u.trim().is_empty()) {
            None => {
                warn!("Database URL not configured; {} source disabled", DATABASE_SOURCE_NAME);
                None
            }
            Some(_) if !is_valid_table_name(&table) => {
                warn!(table = %table, "Invalid database table name; {} source disabled", DATABASE_SOURCE_NAME);
                None
            }
            Some(url) => match PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(secs_to_duration(config.acquire_timeout_secs))
                .connect_lazy(url)
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "Invalid database URL; {} source disabled", DATABASE_SOURCE_NAME);
                    None
                }
            },
        };

        Self { pool, table }
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn pool(&self) -> Result<&PgPool, SourceError> {
        self.pool
            .as_ref()
            .ok_or_else(|| SourceError::NotConfigured("database client not initialized".to_string()))
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT id, name, date, participants, duration, categories FROM {}",
            self.table
        )
    }

    /// Insert one event; `false` on any failure
    pub async fn create(&self, event: &Event) -> bool {
        match self.try_create(event).await {
            Ok(()) => {
                info!(id = %event.id, table = %self.table, "Created habit event");
                true
            }
            Err(e) => {
                warn!(id = %event.id, error = %e, "Failed to create habit event");
                false
            }
        }
    }

    async fn try_create(&self, event: &Event) -> Result<(), SourceError> {
        let pool = self.pool()?;
        let date = event.parsed_timestamp().ok_or_else(|| {
            SourceError::Parse(format!("unparseable timestamp '{}'", event.timestamp))
        })?;
        let duration = i32::try_from(event.duration_minutes)
            .map_err(|_| SourceError::Parse(format!("duration {} out of range", event.duration_minutes)))?;

        let sql = format!(
            "INSERT INTO {} (id, name, date, participants, duration, categories) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&event.id)
            .bind(&event.name)
            .bind(date)
            .bind(&event.participants)
            .bind(duration)
            .bind(&event.categories)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Probe the table and count its rows
    pub async fn connection_status(&self) -> DatabaseStatus {
        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(e) => {
                return DatabaseStatus {
                    status: "error".to_string(),
                    message: e.to_string(),
                    available: false,
                    table_name: None,
                    record_count: None,
                }
            }
        };

        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        match sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await {
            Ok(count) => DatabaseStatus {
                status: "success".to_string(),
                message: format!("Connected to table '{}'", self.table),
                available: true,
                table_name: Some(self.table.clone()),
                record_count: Some(count),
            },
            Err(e) => DatabaseStatus {
                status: "error".to_string(),
                message: format!("Connection test failed: {}", e),
                available: false,
                table_name: Some(self.table.clone()),
                record_count: None,
            },
        }
    }
}

#[async_trait]
impl EventSource for DatabaseSource {
    fn name(&self) -> &str {
        DATABASE_SOURCE_NAME
    }

    async fn is_available(&self) -> bool {
        let Ok(pool) = self.pool() else {
            return false;
        };

        let sql = format!("SELECT id FROM {} LIMIT 1", self.table);
        match sqlx::query(&sql).fetch_optional(pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Database availability check failed");
                false
            }
        }
    }

    async fn try_fetch_all(&self) -> Result<Vec<Event>, SourceError> {
        let pool = self.pool()?;
        let rows = sqlx::query(&self.select_sql()).fetch_all(pool).await?;
        debug!(count = rows.len(), "Fetched database rows");
        Ok(decode_rows(&rows))
    }

    async fn try_fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, SourceError> {
        let pool = self.pool()?;
        let sql = format!(
            "{} WHERE date >= $1 AND date <= $2 ORDER BY date ASC",
            self.select_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?;
        Ok(decode_rows(&rows))
    }
}

fn decode_rows(rows: &[PgRow]) -> Vec<Event> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match row_to_event(row) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(row = index, error = %e, "Skipping undecodable database row");
                None
            }
        })
        .collect()
}

fn row_to_event(row: &PgRow) -> Result<Event, sqlx::Error> {
    let date: DateTime<Utc> = row.try_get("date")?;
    let duration_minutes = checked_duration(row.try_get("duration")?)?;
    let categories: Option<Vec<String>> = row.try_get("categories")?;

    Ok(Event {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        timestamp: date.to_rfc3339_opts(SecondsFormat::Millis, true),
        participants: row.try_get("participants")?,
        duration_minutes,
        categories: categories.unwrap_or_default(),
        source: None,
    })
}

/// Stored durations must be non-negative; anything else fails the row
fn checked_duration(stored: i32) -> Result<u32, sqlx::Error> {
    u32::try_from(stored).map_err(|_| sqlx::Error::ColumnDecode {
        index: "duration".to_string(),
        source: format!("negative duration {}", stored).into(),
    })
}

/// Plain SQL identifier: ASCII alphanumerics and underscores, not starting
/// with a digit, shorter than 64 characters
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 64
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
