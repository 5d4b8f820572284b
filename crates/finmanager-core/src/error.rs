//! Error types for finmanager-core

use thiserror::Error;

/// Result type alias using finmanager-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in finmanager-core operations
///
/// Every variant raised by the entity store is a persistence error from the
/// caller's point of view: the write did not happen and nothing was queued.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
