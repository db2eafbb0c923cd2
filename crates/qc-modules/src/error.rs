//! Error types for the module registry and migration engine.

use shared_types::{AppVersion, ConsensusVersion, StoreError};
use thiserror::Error;

/// Generic failure code for transactions rejected outside a module handler.
pub const CODE_INTERNAL: u32 = 1;

/// Module subsystem errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    // =========================================================================
    // Configuration errors (startup only)
    // =========================================================================
    /// No versioned modules were supplied
    #[error("No modules registered")]
    EmptyRegistry,

    /// Bad `[from, to]` range on a registration entry
    #[error("Module {module} has invalid version range [{from}, {to}]")]
    InvalidVersionRange {
        module: String,
        from: AppVersion,
        to: AppVersion,
    },

    /// Two modules share a name within one app version
    #[error("Duplicate module {module} at app version {version}")]
    DuplicateModule { module: String, version: AppVersion },

    /// A module's consensus version decreases as the app version increases
    #[error(
        "Module {module} consensus version decreases at app version {version}: {previous} -> {current}"
    )]
    NonMonotonicConsensusVersion {
        module: String,
        version: AppVersion,
        previous: ConsensusVersion,
        current: ConsensusVersion,
    },

    /// An order override left registered modules out
    #[error("{setter}: all modules must be defined, missing {missing:?}")]
    ForgottenModules { setter: String, missing: Vec<String> },

    /// An order override names a module that was never registered
    #[error("{setter}: unknown module {module}")]
    UnknownModuleInOrder { setter: String, module: String },

    /// Migration registered from consensus version 0
    #[error("Module {module}: migrations cannot start from consensus version 0")]
    InvalidMigrationVersion { module: String },

    /// Migration registered twice for the same key
    #[error("Migration for module {module} from consensus version {from} already registered")]
    DuplicateMigration {
        module: String,
        from: ConsensusVersion,
    },

    /// Two modules claim the same message type
    #[error("Message type {type_url} already owned by {owner}, claimed by {claimant}")]
    DuplicateMessageOwner {
        type_url: String,
        owner: String,
        claimant: String,
    },

    // =========================================================================
    // Runtime invariant violations (fatal)
    // =========================================================================
    /// A header reached an app version nothing is configured for
    #[error("Unsupported app version {version}")]
    UnsupportedVersion { version: AppVersion },

    /// A migration handler returned an error
    #[error("Migration of {module} from consensus version {from} failed: {reason}")]
    MigrationFailed {
        module: String,
        from: ConsensusVersion,
        reason: String,
    },

    /// A module present at `from` is absent at `to`
    #[error("Module {module} is removed between app versions {from} and {to}; removal is not supported")]
    ModuleRemovalUnsupported {
        module: String,
        from: AppVersion,
        to: AppVersion,
    },

    /// App versions never decrease
    #[error("Invalid app version transition {from} -> {to}")]
    InvalidVersionTransition { from: AppVersion, to: AppVersion },

    /// A module added by an upgrade tried to change the validator set
    #[error("Module {module} added during migration emitted validator updates")]
    NewModuleEmittedValidatorUpdates { module: String },

    /// More than one module emitted validator updates in the same phase
    #[error("Validator updates returned by both {first} and {second}")]
    MultipleValidatorUpdateEmitters { first: String, second: String },

    /// Genesis produced no validators
    #[error("Validator set is empty after genesis")]
    EmptyGenesisValidatorSet,

    /// Module genesis payload could not be applied or exported
    #[error("Genesis for module {module} failed: {reason}")]
    Genesis { module: String, reason: String },

    /// Replicated state is corrupt
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // =========================================================================
    // Transaction / query errors
    // =========================================================================
    /// Message type not yet active at this app version
    #[error("Message type {type_url} is not accepted at app version {version}")]
    MessageNotAccepted { type_url: String, version: AppVersion },

    /// No module handles this message type
    #[error("Module {module} cannot handle message type {type_url}")]
    UnroutableMessage { module: String, type_url: String },

    /// A module handler rejected the message
    #[error("{module}: {reason}")]
    MsgFailed {
        module: String,
        code: u32,
        reason: String,
    },

    /// No single-step migration is registered
    #[error("No migrations registered for module {module}")]
    NoMigrations { module: String },

    #[error("No migration registered for module {module} from consensus version {from}")]
    MigrationNotFound {
        module: String,
        from: ConsensusVersion,
    },

    /// Query path not understood by the module
    #[error("Module {module} has no query {path}")]
    UnknownQuery { module: String, path: String },
}

impl ModuleError {
    /// Build a handler failure with a module-specific code.
    pub fn msg_failed(module: &str, code: u32, reason: impl Into<String>) -> Self {
        Self::MsgFailed {
            module: module.to_string(),
            code,
            reason: reason.into(),
        }
    }

    /// True for errors after which a node must halt rather than continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. }
                | Self::MigrationFailed { .. }
                | Self::ModuleRemovalUnsupported { .. }
                | Self::InvalidVersionTransition { .. }
                | Self::NewModuleEmittedValidatorUpdates { .. }
                | Self::MultipleValidatorUpdateEmitters { .. }
                | Self::EmptyGenesisValidatorSet
                | Self::Genesis { .. }
                | Self::Store(_)
        )
    }

    /// Result code reported for a failed transaction.
    pub fn code(&self) -> u32 {
        match self {
            Self::MsgFailed { code, .. } => *code,
            _ => CODE_INTERNAL,
        }
    }
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;
