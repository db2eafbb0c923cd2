//! Error types for the multiplexer.

use qc_modules::ModuleError;
use qc_signal::SignalError;
use shared_types::{AppVersion, Height, StoreError};
use thiserror::Error;

/// Multiplexer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiplexerError {
    // =========================================================================
    // Configuration errors (construction only)
    // =========================================================================
    /// No state machine bindings were supplied
    #[error("No state machine bindings configured")]
    NoBindings,

    /// Bad inclusive range on a binding
    #[error("Invalid version range [{from}, {to}]")]
    InvalidVersionRange { from: AppVersion, to: AppVersion },

    /// Two bindings claim the same app version
    #[error("Version ranges overlap at app version {version}")]
    OverlappingRanges { version: AppVersion },

    // =========================================================================
    // Runtime invariant violations
    // =========================================================================
    /// No state machine is bound to the active app version
    #[error("No state machine bound to app version {version}")]
    NoBinding { version: AppVersion },

    /// A cutover was due while the store held uncommitted writes
    #[error("Cutover at height {height} found uncommitted state")]
    UncommittedState { height: Height },

    /// Configured halt height or halt time reached
    #[error("Halting per configuration at height {height}: {condition} reached")]
    HaltRequested { height: Height, condition: String },

    /// Once halted, every call is refused
    #[error("Multiplexer halted at height {height}: {reason}")]
    Halted { height: Height, reason: String },

    // =========================================================================
    // Call sequencing errors
    // =========================================================================
    #[error("Chain already initialized")]
    AlreadyInitialized,

    /// Heights must be finalized one after another
    #[error("Unexpected height {actual}, expected {expected}")]
    UnexpectedHeight { expected: Height, actual: Height },

    /// `commit` without a finalized block, or a second block before commit
    #[error("Block sequencing error: {0}")]
    Sequence(String),

    // =========================================================================
    // Wrapped layer errors
    // =========================================================================
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MultiplexerError {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }
}

/// Result type for multiplexer operations
pub type MultiplexerResult<T> = Result<T, MultiplexerError>;
