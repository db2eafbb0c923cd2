//! QC-Upgrade: operator CLI for coordinated app-version upgrades.
//!
//! Talks to a node's signalling JSON-RPC endpoint to inspect version tallies
//! and the pending upgrade, and to submit signal / try-upgrade transactions
//! on behalf of a validator.
//!
//! ```text
//! qc-upgrade ──JSON-RPC──→ node (SignalRpcHandler) ──→ UpgradeCoordinator
//!   tally <v>                signal_versionTally
//!   pending                  signal_pendingUpgrade
//!   signal <v>               signal_signalVersion   (tx)
//!   try-upgrade              signal_tryUpgrade      (tx)
//! ```
//!
//! No server ships in this workspace. `SignalRpcHandler` is a plain
//! request-to-response dispatcher; the node binary embedding the
//! multiplexer is expected to mount it behind an HTTP listener and supply
//! the `TxSubmitter` that feeds its mempool. Until then `--endpoint` must
//! point at such a host.

pub mod api;
pub mod commands;
pub mod output;

pub use api::{ApiError, UpgradeApi, UpgradeApiClient};
pub use commands::{Command, CommandError};
