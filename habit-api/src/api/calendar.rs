//! Calendar authorization and upcoming entries

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::sources::calendar::AuthStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub upcoming_events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/calendar/auth-status
pub async fn auth_status(State(state): State<AppState>) -> Json<AuthStatus> {
    match &state.calendar {
        Some(calendar) => Json(calendar.auth_status().await),
        None => Json(AuthStatus {
            authenticated: false,
            message: "Calendar source not initialized".to_string(),
        }),
    }
}

/// GET /api/calendar/auth-url
pub async fn auth_url(State(state): State<AppState>) -> ApiResult<Json<AuthUrlResponse>> {
    let calendar = state
        .calendar
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Calendar source not initialized".to_string()))?;

    let auth_url = calendar.auth_url().await.map_err(|e| {
        warn!(error = %e, "Could not build calendar authorization URL");
        ApiError::Internal(format!(
            "Failed to generate authorization URL. Make sure the credentials file is configured: {}",
            e
        ))
    })?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// GET /auth/google/callback
///
/// Always redirects back to the dashboard with `calendar_auth=success|error`.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = state.config.server.frontend_url.as_str();

    let outcome = match (&state.calendar, params.code.as_deref(), params.error) {
        (_, _, Some(denied)) => Err(format!("authorization denied: {}", denied)),
        (None, _, None) => Err("Calendar source not initialized".to_string()),
        (Some(_), None, None) => Err("missing authorization code".to_string()),
        (Some(calendar), Some(code), None) => {
            calendar.exchange_code(code).await.map_err(|e| e.to_string())
        }
    };

    let target = match outcome {
        Ok(()) => {
            info!(state = ?params.state, "Calendar authorization completed");
            redirect_url(frontend, &[("calendar_auth", "success")])
        }
        Err(message) => {
            warn!(error = %message, "Calendar authorization failed");
            redirect_url(frontend, &[("calendar_auth", "error"), ("message", &message)])
        }
    };
    Redirect::to(&target)
}

fn redirect_url(frontend: &str, params: &[(&str, &str)]) -> String {
    match reqwest::Url::parse_with_params(frontend, params) {
        Ok(url) => url.into(),
        Err(_) => frontend.to_string(),
    }
}

/// GET /api/calendar/upcoming
pub async fn upcoming(State(state): State<AppState>) -> Json<UpcomingResponse> {
    Json(UpcomingResponse {
        upcoming_events: state.aggregator.upcoming_today().await,
    })
}

pub fn calendar_routes() -> Router<AppState> {
    Router::new()
        .route("/api/calendar/auth-status", get(auth_status))
        .route("/api/calendar/auth-url", get(auth_url))
        .route("/api/calendar/upcoming", get(upcoming))
        .route("/auth/google/callback", get(oauth_callback))
}
