//! habit-api library - habit event aggregation service
//!
//! Collects habit events from pluggable sources (fixture data, a public
//! spreadsheet, a PostgreSQL table) and serves listings, metrics and tag
//! validation over HTTP. A calendar feed supplies today's upcoming entries.

use axum::http::{HeaderValue, Method};
use axum::Router;
use habit_common::config::TomlConfig;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod aggregator;
pub mod api;
pub mod cli;
pub mod error;
pub mod sources;

use aggregator::SourceAggregator;
use sources::sheets::SHEETS_SOURCE_NAME;
use sources::{CalendarSource, DatabaseSource, MockSource, SheetsSource};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<SourceAggregator>,
    /// Write path for `POST /api/habits`; `None` when no database URL is configured
    pub database: Option<Arc<DatabaseSource>>,
    /// OAuth operations; `None` when the calendar is disabled
    pub calendar: Option<Arc<CalendarSource>>,
    pub config: Arc<TomlConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        aggregator: SourceAggregator,
        database: Option<Arc<DatabaseSource>>,
        calendar: Option<Arc<CalendarSource>>,
        config: TomlConfig,
    ) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            database,
            calendar,
            config: Arc::new(config),
        }
    }

    /// Register adapters according to configuration
    ///
    /// Fixture data is always registered first. A configured spreadsheet takes
    /// over as primary; a configured database is registered but not made
    /// primary. `sources.default_source` then overrides the primary choice.
    /// A misconfigured adapter is skipped or left unavailable; startup
    /// continues regardless.
    pub async fn from_config(config: TomlConfig) -> Self {
        let mut aggregator = SourceAggregator::new();
        aggregator.register(Arc::new(MockSource::new()));

        let mut sheets_registered = false;
        if let Some(sheet_id) = config.sheets.sheet_id.as_deref().filter(|s| !s.trim().is_empty()) {
            match SheetsSource::new(sheet_id.trim(), &config.sheets) {
                Ok(sheets) => {
                    info!(url = sheets.url(), "Spreadsheet source configured");
                    aggregator.register(Arc::new(sheets));
                    sheets_registered = true;
                }
                Err(e) => warn!(error = %e, "Spreadsheet source could not be created"),
            }
        }

        let database = if config.database.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
            let database = Arc::new(DatabaseSource::from_config(&config.database));
            aggregator.register(database.clone());
            Some(database)
        } else {
            None
        };

        let calendar = if config.calendar.enabled {
            match CalendarSource::from_config(&config.calendar) {
                Ok(calendar) => {
                    let calendar = Arc::new(calendar);
                    info!(token_file = %calendar.token_file().display(), "Calendar feed configured");
                    aggregator.set_calendar(calendar.clone());
                    Some(calendar)
                }
                Err(e) => {
                    warn!(error = %e, "Calendar feed could not be created");
                    None
                }
            }
        } else {
            None
        };

        if sheets_registered {
            aggregator.set_primary(SHEETS_SOURCE_NAME).await;
        }
        if let Some(name) = config.sources.default_source.as_deref() {
            aggregator.set_primary(name).await;
        }

        info!(
            sources = ?aggregator.source_names(),
            primary = ?aggregator.primary_name().await,
            "Source aggregator ready"
        );

        Self::new(aggregator, database, calendar, config)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(api::health_routes())
        .merge(api::source_routes())
        .merge(api::habit_routes())
        .merge(api::analytics_routes())
        .merge(api::tag_routes())
        .merge(api::calendar_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}
