//! Error handling for the Oluso journey engine.
//!
//! Error messages are designed to be informative for operators while not
//! exposing sensitive information to end users. Authentication-adjacent
//! failures use generic messages to prevent user enumeration.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors shared across the engine crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Internal error.
    ///
    /// Deliberately generic; details belong in logs, not in responses.
    #[error("internal error")]
    Internal,
}

impl CoreError {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Internal)
    }

    /// Returns whether this error represents a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
