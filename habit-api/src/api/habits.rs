//! Habit listings and creation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use habit_common::{time, Event};
use serde::Deserialize;
use tracing::info;

use super::{day_range, source_name};
use crate::aggregator::ALL_SOURCES;
use crate::error::{ApiError, ApiResult};
use crate::sources::database::DATABASE_SOURCE_NAME;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SourceParams {
    pub source: Option<String>,
}

fn default_recent_days() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_recent_days")]
    pub days: i64,
    pub source: Option<String>,
}

/// GET /api/habits
///
/// `source=all` merges every available source.
pub async fn list_habits(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Json<Vec<Event>> {
    let events = match source_name(&params.source) {
        Some(ALL_SOURCES) => state.aggregator.fetch_from_all_sources().await,
        name => state.aggregator.fetch_all(name).await,
    };
    Json(events)
}

/// POST /api/habits
pub async fn create_habit(
    State(state): State<AppState>,
    Json(mut event): Json<Event>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    if event.id.trim().is_empty() || event.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Habit id and name must not be empty".to_string(),
        ));
    }

    let database = state.database.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Database source not configured".to_string())
    })?;

    if !database.create(&event).await {
        return Err(ApiError::BadGateway(format!(
            "Failed to create habit '{}'",
            event.id
        )));
    }

    info!(id = %event.id, "Habit created");
    event.source = Some(DATABASE_SOURCE_NAME.to_string());
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/habits/today
pub async fn today_habits(
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Json<Vec<Event>> {
    let (start, end) = time::today_window(time::now());
    Json(
        state
            .aggregator
            .fetch_by_range(start, end, source_name(&params.source))
            .await,
    )
}

/// GET /api/habits/recent
pub async fn recent_habits(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> ApiResult<Json<Vec<Event>>> {
    let days = day_range("days", params.days)?;
    Ok(Json(
        state
            .aggregator
            .fetch_recent(days, source_name(&params.source))
            .await,
    ))
}

pub fn habit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/today", get(today_habits))
        .route("/api/habits/recent", get(recent_habits))
}
