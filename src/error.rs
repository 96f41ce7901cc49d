//! Error types for the throttle.

use thiserror::Error;

/// Main error type for throttle operations.
///
/// Checking a key never fails; these only surface while building limiters
/// or loading configuration.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A limiter was given a zero attempt budget or window
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Lookup of a limiter name that does not exist
    #[error("Unknown limiter: {0}")]
    UnknownLimiter(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ThrottleError {
    fn from(e: config::ConfigError) -> Self {
        ThrottleError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for ThrottleError {
    fn from(e: serde_yaml::Error) -> Self {
        ThrottleError::Config(e.to_string())
    }
}

/// Result type alias for throttle operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
