//! Ports: the versioned state machines, migrator and upgrade schedule the
//! multiplexer is wired to.

pub mod outbound;

pub use outbound::{Migrator, StateMachine, UpgradeSchedule};
