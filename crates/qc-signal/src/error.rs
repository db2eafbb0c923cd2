//! Error types for upgrade signalling.

use qc_modules::ModuleError;
use shared_types::{AppVersion, StoreError, ValidatorAddress};
use thiserror::Error;

use crate::domain::SIGNAL_NAMESPACE;

/// Upgrade signalling errors
///
/// Everything except `Store` is an ordinary transaction failure: reported to
/// the submitter, never mutates state, never halts the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// A pending upgrade exists; signals and new tallies are frozen
    #[error("An upgrade is already pending")]
    UpgradePending,

    /// Signals must target the current version or the next one
    #[error("Invalid signal version {version}: must be current version {current} or the one after")]
    InvalidSignalVersion {
        version: AppVersion,
        current: AppVersion,
    },

    /// Quorum reached on a version that is not ahead of the current one
    #[error("Invalid upgrade version {version}: must be greater than current version {current}")]
    InvalidUpgradeVersion {
        version: AppVersion,
        current: AppVersion,
    },

    /// Signer is not in the active validator set
    #[error("Unknown validator: {validator}")]
    UnknownValidator { validator: ValidatorAddress },

    /// Transaction payload could not be decoded
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Stored signalling state is corrupt
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SignalError {
    /// Transaction result code.
    pub fn code(&self) -> u32 {
        match self {
            Self::Store(_) => qc_modules::CODE_INTERNAL,
            Self::UpgradePending => 2,
            Self::InvalidSignalVersion { .. } => 3,
            Self::InvalidUpgradeVersion { .. } => 4,
            Self::UnknownValidator { .. } => 5,
            Self::InvalidMessage(_) => 6,
        }
    }

    /// Metric label for rejected transactions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UpgradePending => "pending",
            Self::InvalidSignalVersion { .. } => "invalid_signal_version",
            Self::InvalidUpgradeVersion { .. } => "invalid_upgrade_version",
            Self::UnknownValidator { .. } => "unknown_validator",
            Self::InvalidMessage(_) => "invalid_message",
            Self::Store(_) => "store",
        }
    }
}

impl From<SignalError> for ModuleError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::Store(e) => ModuleError::Store(e),
            other => ModuleError::msg_failed(SIGNAL_NAMESPACE, other.code(), other.to_string()),
        }
    }
}

/// Result type for signalling operations
pub type SignalResult<T> = Result<T, SignalError>;
