//! # Habit Tracker Common Library
//!
//! Shared code for the habit tracker service:
//! - Event model and timestamp parsing
//! - Tag taxonomy, normalization and validation
//! - Filtering, sorting and aggregate metrics
//! - Configuration loading
//! - Time window helpers

pub mod config;
pub mod error;
pub mod event;
pub mod query;
pub mod tags;
pub mod time;

pub use error::{Error, Result};
pub use event::Event;
pub use tags::ValidationResult;
