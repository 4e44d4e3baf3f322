//! Source listing and primary selection

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::sources::database::DatabaseStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub available_sources: Vec<String>,
    pub primary_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPrimaryRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SetPrimaryResponse {
    pub primary_source: String,
}

/// GET /api/sources
pub async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        available_sources: state.aggregator.available_sources().await,
        primary_source: state.aggregator.primary_name().await,
    })
}

/// PUT /api/sources/primary
pub async fn set_primary_source(
    State(state): State<AppState>,
    Json(request): Json<SetPrimaryRequest>,
) -> ApiResult<Json<SetPrimaryResponse>> {
    if !state.aggregator.set_primary(&request.name).await {
        return Err(ApiError::NotFound(format!(
            "Source '{}' is not registered",
            request.name
        )));
    }
    Ok(Json(SetPrimaryResponse {
        primary_source: request.name,
    }))
}

/// GET /api/sources/database/status
pub async fn database_status(State(state): State<AppState>) -> ApiResult<Json<DatabaseStatus>> {
    let database = state.database.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Database source not configured".to_string())
    })?;
    Ok(Json(database.connection_status().await))
}

pub fn source_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sources", get(list_sources))
        .route("/api/sources/primary", put(set_primary_source))
        .route("/api/sources/database/status", get(database_status))
}
