//! Error types for parsing values in telemetry-types.

use thiserror::Error;

/// Errors that can occur when parsing telemetry values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The string is not a well-formed sensor identifier.
    #[error("Invalid sensor id: {0}")]
    InvalidId(String),
}
