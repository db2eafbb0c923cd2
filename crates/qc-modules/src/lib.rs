//! # qc-modules
//!
//! Versioned module registry, configurator and migration engine.
//!
//! ## Architecture
//!
//! A state machine is a set of named modules. Each module carries its own
//! consensus (schema) version and is registered for an inclusive range of app
//! versions:
//!
//! ```text
//! (bank v1, 1..=1)  (bank v2, 2..=3)  (signal v1, 2..=3)
//!        │                 │                  │
//!        └────────┬────────┴──────────────────┘
//!                 ↓
//!          ModuleRegistry::build        (validated once at startup)
//!                 │
//!                 ↓ register_services
//!           Configurator               (accepted messages + migrations)
//!                 │
//!                 ↓
//!          MigrationEngine::run_migrations(from, to)
//! ```
//!
//! ## Invariants
//!
//! - `from_version >= 1` and `from_version <= to_version` for every entry.
//! - No two modules share a name within one app version.
//! - A module's consensus version never decreases as the app version grows.
//! - At most one module emits validator updates per genesis or per block.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = ModuleRegistry::build(vec![
//!     VersionedModule::new(Arc::new(Bank::v1()), 1, 1),
//!     VersionedModule::new(Arc::new(Bank::v2()), 2, 2),
//! ])?;
//! let mut configurator = Configurator::new();
//! registry.register_services(&mut configurator)?;
//!
//! let engine = MigrationEngine::new(Arc::new(registry), Arc::new(configurator));
//! engine.run_migrations(&mut ctx, 1, 2)?;
//! ```

pub mod domain;
pub mod error;
pub mod migration;

#[cfg(test)]
pub(crate) mod test_utils;

pub use domain::{
    Configurator, MigrationHandler, Module, ModuleConfigurator, ModuleRegistry, ModuleSet,
    PostBlocker, PreBlocker, VersionedModule, RUN_LAST_MIGRATION_MODULE,
};
pub use error::{ModuleError, ModuleResult, CODE_INTERNAL};
pub use migration::MigrationEngine;
