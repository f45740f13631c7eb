//! Error types for the Honeylog service.

use thiserror::Error;

/// Main error type for Honeylog operations.
///
/// Only startup and configuration paths propagate these to the caller.
/// Persistence, logging and notification failures on the request path are
/// logged and swallowed.
#[derive(Error, Debug)]
pub enum HoneylogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(String),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for HoneylogError {
    fn from(err: ::config::ConfigError) -> Self {
        HoneylogError::Config(err.to_string())
    }
}

/// Result type alias for Honeylog operations.
pub type Result<T> = std::result::Result<T, HoneylogError>;
