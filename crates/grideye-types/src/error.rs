//! Error types for data parsing in grideye-types.

use thiserror::Error;

/// Errors that can occur when decoding record fields.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in grideye-core).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A timestamp string did not match `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    #[error("Invalid timestamp '{input}': {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type alias using grideye-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
