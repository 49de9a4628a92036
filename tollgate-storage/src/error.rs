//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted record failed its integrity check or could not be parsed.
    #[error("corrupt license record: {0}")]
    Corrupt(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(String),

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    LockPoisoned,
}
