//! Error types for issuepulse-core

use thiserror::Error;

/// Main error type for the issuepulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid caller input or a violated numeric invariant
    #[error("validation error: {0}")]
    Validation(String),

    /// No engagement row exists for the pair
    #[error("no engagement recorded for user {user_id} on issue {issue_id}")]
    EngagementNotFound { user_id: String, issue_id: String },
}

impl Error {
    /// Whether this error came from the persistence layer.
    ///
    /// Callers on the hot path use this to decide between "skip personalization"
    /// and surfacing the error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }

    /// Whether this error is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type alias for issuepulse-core
pub type Result<T> = std::result::Result<T, Error>;
