//! Error types for telemetry-store.

use std::path::PathBuf;

use time::OffsetDateTime;

/// Result type for telemetry-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in telemetry-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No record matches the lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The identifier is not well formed.
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] telemetry_types::ParseError),

    /// A query argument is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The query range is empty or inverted.
    #[error("cannot query an empty range: start {start} is not before end {end}")]
    EmptyRange {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },

    /// The time-series query failed or returned something unexpected.
    #[error("Query error: {0}")]
    Query(String),

    /// Transport error talking to a remote time-series server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed CSV in a query response.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store was closed.
    #[error("Store is closed")]
    Closed,
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the
    /// backing store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidId(_) | Error::InvalidInput(_) | Error::EmptyRange { .. }
        )
    }
}
