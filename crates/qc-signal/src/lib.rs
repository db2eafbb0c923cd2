//! # qc-signal
//!
//! Upgrade Coordinator: validators signal the app version they are ready to
//! run, and once a version gathers a 5/6 supermajority of live voting power
//! an upgrade is scheduled a fixed number of blocks in the future.
//!
//! ## Overview
//!
//! - **Signals**: one per validator, overwritten on re-signal, restricted to
//!   the current version or the next one.
//! - **Tally**: computed against the live validator set; signals from
//!   validators that left the set are ignored but kept.
//! - **Pending upgrade**: at most one; freezes signalling until the
//!   multiplexer activates it and resets the tally.
//!
//! ## Architecture
//!
//! ```text
//! MsgSignalVersion ──┐
//!                    ├──→ SignalModule ──→ UpgradeCoordinator ──→ "signal" namespace
//! MsgTryUpgrade ─────┘                          │
//!                                               ├── ValidatorSetProvider (live power)
//!                                               │
//! signal_* JSON-RPC ──→ SignalRpcHandler ───────┴── committed snapshot (queries)
//! ```
//!
//! ## State Machine
//!
//! ```text
//! [COLLECTING] ──try_upgrade (quorum)──→ [PENDING] ──activation height──→ reset_tally ──→ [COLLECTING]
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_signal::{SignalConfig, UpgradeCoordinator, UpgradeSignalApi};
//!
//! let coordinator = UpgradeCoordinator::new(validators, SignalConfig::for_chain(&chain_id));
//! coordinator.signal_version(&mut ctx, validator, 2)?;
//! if let Some(pending) = coordinator.try_upgrade(&mut ctx)? {
//!     println!("v{} at height {}", pending.app_version, pending.activation_height);
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod rpc;
pub mod service;

pub use adapters::{InMemoryValidatorSet, SignalModule, QUERY_PENDING_UPGRADE, QUERY_VERSION_TALLY};
pub use domain::{
    is_signal_key, quorum_threshold, GenesisSignal, MsgSignalVersion, MsgTryUpgrade,
    PendingUpgrade, SignalGenesis, SignalMsg, VersionTally, MSG_SIGNAL_VERSION, MSG_TRY_UPGRADE,
    SIGNAL_NAMESPACE, UPGRADE_KEY,
};
pub use error::{SignalError, SignalResult};
pub use ports::{TxSubmitter, UpgradeSignalApi, ValidatorSetProvider};
pub use rpc::SignalRpcHandler;
pub use service::{
    SignalConfig, UpgradeCoordinator, DEFAULT_UPGRADE_HEIGHT_DELAY, TEST_UPGRADE_HEIGHT_DELAY,
};
