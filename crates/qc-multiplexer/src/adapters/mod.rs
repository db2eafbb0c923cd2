//! Adapters: the registry-backed state machine and port implementations for
//! the migration engine and upgrade coordinator.

pub mod modular;
pub mod upgrade;

pub use modular::ModularStateMachine;
pub use upgrade::NoUpgrades;
