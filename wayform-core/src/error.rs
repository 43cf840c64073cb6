//! Error types for wayform-core

use thiserror::Error;

/// Main error type for the wayform-core library
#[derive(Error, Debug)]
pub enum Error {
    /// An answer failed its question's rule. Recoverable; shown to the respondent.
    #[error("invalid answer for {question_id}: {message}")]
    Validation { question_id: String, message: String },

    /// Session, form or question id does not resolve
    #[error("not found: {0}")]
    NotFound(String),

    /// Session is expired or past its `expires_at`
    #[error("session expired: {0}")]
    ExpiredSession(String),

    /// The record store failed; the caller may retry
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A submission is already in flight, or a record id already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested transition is not legal from the current state
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A form definition violates an ordering or reference invariant
    #[error("invalid form definition: {0}")]
    InvalidDefinition(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(question_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            question_id: question_id.into(),
            message: message.into(),
        }
    }

    /// Whether re-invoking the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Persistence(_) | Error::Database(_))
    }
}

/// Result type alias for wayform-core
pub type Result<T> = std::result::Result<T, Error>;
