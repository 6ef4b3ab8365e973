//! Error types
//!
//! Nothing in the simulations can fail. Errors only come from reading
//! configuration and from parsing visitor lookup responses; the host logs
//! both and falls back to defaults.

use thiserror::Error;

/// Errors raised while loading [`crate::Settings`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field}: min {min} is greater than max {max}")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
}

/// Errors raised while parsing visitor lookup responses
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("lookup response is missing `{0}`")]
    MissingField(&'static str),
}
