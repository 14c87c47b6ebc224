//! Error types for miospora.

use thiserror::Error;

/// Result type alias using miospora's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for miospora operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Input rejected before any persistence attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// A genus with this name already exists (case-insensitive)
    #[error("Genus name already in use by '{name}' (id {id})")]
    DuplicateName { id: i64, name: String },

    /// A genus with a semantically equivalent diagnosis already exists
    #[error("Genus with an equivalent diagnosis already exists: '{name}' (id {id})")]
    DuplicateDiagnosis { id: i64, name: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Genus not found by id
    #[error("Genus not found: {0}")]
    GenusNotFound(i64),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the write-time conflicts that carry a clashing record's
    /// identity (duplicate name, duplicate diagnosis signature).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::DuplicateName { .. } | Error::DuplicateDiagnosis { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
