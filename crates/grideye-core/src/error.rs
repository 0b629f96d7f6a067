//! Error types for grideye-core.
//!
//! # Failure scopes
//!
//! Errors are classified by how far their effect reaches:
//!
//! | Error | Scope | What the scan loop does |
//! |-------|-------|-------------------------|
//! | [`Error::BluetoothUnavailable`] | Process | Stops scheduling; the store stays frozen |
//! | [`Error::Bluetooth`] | One scan cycle | Logs, skips the cycle, tries again next interval |
//! | [`Error::Transport`] | One scan cycle | Same as above |
//! | [`Error::Timeout`] | One scan cycle | Same as above |
//! | [`Error::InvalidAdvertisement`] | One device | Logs, skips that device only |
//!
//! Use [`Error::is_fatal`] to tell the first row apart from the rest.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while discovering devices or decoding advertisements.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error from the transport.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// A discovery pass failed for a reason reported by the backend as text.
    #[error("Discovery failed: {0}")]
    Transport(String),

    /// The BLE capability cannot be reached at all (no manager, no adapter).
    #[error("Bluetooth unavailable: {0}")]
    BluetoothUnavailable(String),

    /// Discovery did not finish within its bound.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// One device's advertisement could not be turned into a record.
    #[error("Invalid advertisement from '{address}': {reason}")]
    InvalidAdvertisement {
        /// The advertising device, possibly empty.
        address: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl Error {
    /// Create an unavailable-transport error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::BluetoothUnavailable(reason.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an invalid advertisement error.
    pub fn invalid_advertisement(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAdvertisement {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means scanning can never succeed in this process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BluetoothUnavailable(_))
    }
}

/// Result type alias using grideye-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
