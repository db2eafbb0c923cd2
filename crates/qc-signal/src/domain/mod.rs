//! Signalling domain: pending upgrades, tallies, store layout and messages.

pub mod keys;
pub mod msgs;
pub mod upgrade;

pub use keys::{is_signal_key, SIGNAL_NAMESPACE, UPGRADE_KEY};
pub use msgs::{MsgSignalVersion, MsgTryUpgrade, SignalMsg, MSG_SIGNAL_VERSION, MSG_TRY_UPGRADE};
pub use upgrade::{quorum_threshold, PendingUpgrade, SignalGenesis, GenesisSignal, VersionTally};
