//! Error types shared across the proxy's infrastructure crates.
//!
//! This module provides a unified error handling system using
//! thiserror for ergonomic error definitions.

use thiserror::Error;

/// Result type alias using RiptideError
pub type Result<T> = std::result::Result<T, RiptideError>;

/// Infrastructure-level error type shared by cache, fetch, and reliability adapters.
#[derive(Error, Debug)]
pub enum RiptideError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache/Redis operation failed
    #[error("Cache operation failed: {0}")]
    Cache(String),

    /// Validation error
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded for a given key (m3u8 counter, quota, …)
    #[error("Rate limit exceeded for key: {key}")]
    RateLimitExceeded {
        /// The key the limit was exceeded for.
        key: String,
    },

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Error from anyhow for interoperability
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RiptideError {
    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        RiptideError::Custom(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, RiptideError::Network(_) | RiptideError::Timeout(_))
    }
}
