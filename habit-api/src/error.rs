//! Error types for habit-api
//!
//! `SourceError` is what an adapter reports internally; it never reaches an
//! HTTP client directly. `ApiError` is the handler-facing error and renders as
//! `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Adapter failure
#[derive(Debug, Error)]
pub enum SourceError {
    /// Required settings or credentials are absent
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Upstream payload could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// OAuth flow failure
    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Build an `Api` error from a failed response, keeping a bounded body excerpt
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > 200 {
            let mut cut = 200;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        SourceError::Api { status, body }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Backing service not configured (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Backing service rejected the operation (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
