//! # qc-multiplexer
//!
//! Holds one state machine per supported app version range and routes every
//! execution call to the one matching the chain's active version. At the
//! activation height of a pending upgrade it migrates state and flips the
//! active version before any transaction of that height executes.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────── Multiplexer ────────────────────┐
//! finalize_block ──→ │ due_upgrade? ──yes──→ run_migrations ──→ flip version │
//!                    │      │                                               │
//!                    │      └──no──→ Versions::get(active) ──→ StateMachine │
//!                    └──────────────────────────────────────────────────────┘
//!                                        │ commit
//!                                        ↓
//!                    QueryHandle ──→ last committed snapshot (any thread)
//! ```
//!
//! ## Cutover Protocol
//!
//! 1. The previous height is committed (no uncommitted writes).
//! 2. Migrations for `from -> to` run against the working state.
//! 3. The new version is persisted under `multiplexer/app_version` and the
//!    signal tally for `<= to` is cleared.
//! 4. The active pointer flips and the block executes on the new binding.
//!
//! Any failure in 1-3 halts the multiplexer. A halted multiplexer refuses
//! every further call; there is no in-process recovery.
//!
//! ## Example
//!
//! ```rust,ignore
//! let machine = Arc::new(ModularStateMachine::from_entries(entries)?);
//! let mut mux = Multiplexer::new(
//!     MultiplexerConfig::default(),
//!     Versions::new(vec![(VersionRange::new(1, 2)?, machine.clone())])?,
//!     Arc::new(machine.migration_engine()),
//!     coordinator,
//!     StateStore::new(),
//! )?;
//! mux.init_chain(&genesis, 0)?;
//! let outcome = mux.finalize_block(1, now, &txs)?;
//! let app_hash = mux.commit()?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod query;
pub mod service;

#[cfg(test)]
pub(crate) mod test_utils;

pub use adapters::{ModularStateMachine, NoUpgrades};
pub use domain::{
    read_app_version, BlockOutcome, MultiplexerStatus, VersionRange, Versions, APP_VERSION_KEY,
    MULTIPLEXER_NAMESPACE,
};
pub use error::{MultiplexerError, MultiplexerResult};
pub use ports::{Migrator, StateMachine, UpgradeSchedule};
pub use query::QueryHandle;
pub use service::{Multiplexer, MultiplexerConfig};
