//! Error types for position storage.

use thiserror::Error;

use crate::location::LocationError;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Input rejected before it reached the database.
    #[error(transparent)]
    Location(#[from] LocationError),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
