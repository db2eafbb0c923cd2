//! # Integration Test Flows
//!
//! Every scenario builds a full replica: `ModuleRegistry` -> `ModularStateMachine`
//! -> `Multiplexer`, with the `UpgradeCoordinator` acting as the upgrade
//! schedule and the signal module routing signalling transactions.

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod determinism;
#[cfg(test)]
mod restart;
#[cfg(test)]
mod upgrade_flow;
