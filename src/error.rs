//! Error types for the bridge.

use core::convert::Infallible;
use thiserror::Error;

/// Main error type for bridge operations.
///
/// Only host-side failures are represented here. Error *values* produced by
/// the engine cross the boundary as ordinary values and are inspected with
/// [`ObjectRef::is_error`](crate::ObjectRef::is_error); the bridge never turns
/// them into a `BridgeError` on its own.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host supplied a key the bridge cannot classify into an access mode.
    ///
    /// Raised before any engine call is attempted.
    #[error("expected non-negative integer or string for index, got {kind}")]
    UnsupportedKey { kind: String },

    /// A value could not be carried across the host/engine boundary.
    #[error("cannot convert {kind} between host and engine representations")]
    Unconvertible { kind: String },
}

impl BridgeError {
    pub fn unsupported_key(kind: impl Into<String>) -> Self {
        BridgeError::UnsupportedKey { kind: kind.into() }
    }

    pub fn unconvertible(kind: impl Into<String>) -> Self {
        BridgeError::Unconvertible { kind: kind.into() }
    }
}

// Lets infallible key conversions flow through the same `TryInto` bound as
// fallible ones.
impl From<Infallible> for BridgeError {
    fn from(x: Infallible) -> Self {
        match x {}
    }
}
