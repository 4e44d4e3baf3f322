//! HTTP API handlers
//!
//! Handlers never see adapter errors: an empty list means "nothing found"
//! and "source failed" alike. Only request validation and the write path
//! produce error responses.

pub mod analytics;
pub mod buildinfo;
pub mod calendar;
pub mod habits;
pub mod health;
pub mod sources;
pub mod tags;

pub use analytics::analytics_routes;
pub use calendar::calendar_routes;
pub use habits::habit_routes;
pub use health::health_routes;
pub use sources::source_routes;
pub use tags::tag_routes;

use crate::error::ApiError;

/// `source` query value with blanks treated as absent
pub(crate) fn source_name(source: &Option<String>) -> Option<&str> {
    source.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validate a day count query parameter
pub(crate) fn day_range(name: &str, value: i64) -> Result<u32, ApiError> {
    if (1..=365).contains(&value) {
        Ok(value as u32)
    } else {
        Err(ApiError::BadRequest(format!(
            "{} must be between 1 and 365, got {}",
            name, value
        )))
    }
}
