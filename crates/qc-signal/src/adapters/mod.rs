//! Adapters: in-memory validator set and the registry-facing module.

pub mod module;
pub mod validator_set;

pub use module::{SignalModule, QUERY_PENDING_UPGRADE, QUERY_VERSION_TALLY};
pub use validator_set::InMemoryValidatorSet;
