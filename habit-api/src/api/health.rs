//! Service root and health check

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::buildinfo::get_build_info;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub available_sources: Vec<String>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "habit-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Habit Tracker API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        available_sources: state.aggregator.available_sources().await,
    })
}

/// Build health, root and build-info routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/buildinfo", get(get_build_info))
}
