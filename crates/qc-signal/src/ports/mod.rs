//! Ports: the coordinator's API and what it needs from the outside.

pub mod inbound;
pub mod outbound;

pub use inbound::UpgradeSignalApi;
pub use outbound::{TxSubmitter, ValidatorSetProvider};
