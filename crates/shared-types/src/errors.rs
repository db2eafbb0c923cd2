//! # Error Types
//!
//! Errors shared by every subsystem that touches replicated state.

use thiserror::Error;

/// Errors raised while reading typed values out of the key-value state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A stored value does not have the expected encoding.
    #[error("Corrupt value in namespace {namespace} at key {key}: {reason}")]
    Decode {
        namespace: String,
        key: String,
        reason: String,
    },

    /// A value could not be serialized before writing.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A checkpoint was released out of order.
    #[error("Checkpoint {requested} is not the innermost open checkpoint")]
    CheckpointOrder { requested: usize },
}

/// Errors parsing a validator address from text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
