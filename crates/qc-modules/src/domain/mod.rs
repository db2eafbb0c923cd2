//! Domain layer: module contract, registry, configurator and lifecycle.

pub mod configurator;
pub mod lifecycle;
pub mod module;
pub mod registry;

pub use configurator::{Configurator, ModuleConfigurator};
pub use module::{MigrationHandler, Module, PostBlocker, PreBlocker, VersionedModule};
pub use registry::{ModuleRegistry, ModuleSet, RUN_LAST_MIGRATION_MODULE};
