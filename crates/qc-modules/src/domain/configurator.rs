//! Accepted message table and migration handler registry.
//!
//! Populated once while the registry wires its modules, then shared read-only
//! with the migration engine and the admission layer.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use shared_types::{AppVersion, ConsensusVersion, ExecContext};
use tracing::{debug, info};

use crate::domain::module::MigrationHandler;
use crate::error::{ModuleError, ModuleResult};

#[derive(Default)]
pub struct Configurator {
    /// app version -> message types accepted at that version
    accepted: BTreeMap<AppVersion, BTreeSet<String>>,
    /// message type -> owning module
    owners: BTreeMap<String, &'static str>,
    /// module -> from consensus version -> handler
    migrations: BTreeMap<&'static str, BTreeMap<ConsensusVersion, MigrationHandler>>,
}

impl Configurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope registration to one module entry and its app version range.
    pub fn scoped(
        &mut self,
        module: &'static str,
        from_version: AppVersion,
        to_version: AppVersion,
    ) -> ModuleConfigurator<'_> {
        ModuleConfigurator {
            configurator: self,
            module,
            versions: from_version..=to_version,
        }
    }

    fn add_messages(
        &mut self,
        module: &'static str,
        versions: RangeInclusive<AppVersion>,
        type_urls: &[&str],
    ) -> ModuleResult<()> {
        for type_url in type_urls {
            match self.owners.get(*type_url) {
                Some(owner) if *owner != module => {
                    return Err(ModuleError::DuplicateMessageOwner {
                        type_url: type_url.to_string(),
                        owner: owner.to_string(),
                        claimant: module.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.owners.insert(type_url.to_string(), module);
                }
            }
            for version in versions.clone() {
                self.accepted
                    .entry(version)
                    .or_default()
                    .insert(type_url.to_string());
            }
        }
        Ok(())
    }

    fn register_migration(
        &mut self,
        module: &'static str,
        from: ConsensusVersion,
        handler: MigrationHandler,
    ) -> ModuleResult<()> {
        if from == 0 {
            return Err(ModuleError::InvalidMigrationVersion {
                module: module.to_string(),
            });
        }
        let handlers = self.migrations.entry(module).or_default();
        if handlers.contains_key(&from) {
            return Err(ModuleError::DuplicateMigration {
                module: module.to_string(),
                from,
            });
        }
        handlers.insert(from, handler);
        Ok(())
    }

    /// Message types accepted at `version`, if any were registered.
    pub fn accepted_messages(&self, version: AppVersion) -> Option<&BTreeSet<String>> {
        self.accepted.get(&version)
    }

    pub fn is_accepted(&self, version: AppVersion, type_url: &str) -> bool {
        self.accepted
            .get(&version)
            .is_some_and(|urls| urls.contains(type_url))
    }

    /// Admission check for a message at `version`.
    pub fn check_accepted(&self, version: AppVersion, type_url: &str) -> ModuleResult<()> {
        if self.is_accepted(version, type_url) {
            Ok(())
        } else {
            Err(ModuleError::MessageNotAccepted {
                type_url: type_url.to_string(),
                version,
            })
        }
    }

    pub fn message_owner(&self, type_url: &str) -> Option<&'static str> {
        self.owners.get(type_url).copied()
    }

    pub fn has_migrations(&self, module: &str) -> bool {
        self.migrations
            .get(module)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Run every registered step from `from` up to (excluding) `to`.
    ///
    /// Steps with no registered handler are skipped. The first handler error
    /// aborts the chain.
    pub fn run_module_migrations(
        &self,
        ctx: &mut ExecContext<'_>,
        module: &str,
        from: ConsensusVersion,
        to: ConsensusVersion,
    ) -> ModuleResult<()> {
        if to <= 1 || from >= to {
            return Ok(());
        }
        let Some(handlers) = self.migrations.get(module) else {
            debug!(module, from, to, "No migrations registered, skipping");
            return Ok(());
        };
        for step in from..to {
            match handlers.get(&step) {
                Some(handler) => {
                    info!(module, from = step, to = step + 1, "Running migration");
                    handler(ctx).map_err(|e| ModuleError::MigrationFailed {
                        module: module.to_string(),
                        from: step,
                        reason: e.to_string(),
                    })?;
                }
                None => debug!(module, from = step, "No migration for step, skipping"),
            }
        }
        Ok(())
    }

    /// Run exactly one registered step.
    pub fn run_module_migration(
        &self,
        ctx: &mut ExecContext<'_>,
        module: &str,
        from: ConsensusVersion,
    ) -> ModuleResult<()> {
        let handlers = self
            .migrations
            .get(module)
            .filter(|handlers| !handlers.is_empty())
            .ok_or_else(|| ModuleError::NoMigrations {
                module: module.to_string(),
            })?;
        let handler = handlers
            .get(&from)
            .ok_or_else(|| ModuleError::MigrationNotFound {
                module: module.to_string(),
                from,
            })?;
        handler(ctx)
    }
}

/// Registration handle scoped to one module and its app version range.
pub struct ModuleConfigurator<'a> {
    configurator: &'a mut Configurator,
    module: &'static str,
    versions: RangeInclusive<AppVersion>,
}

impl ModuleConfigurator<'_> {
    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn versions(&self) -> RangeInclusive<AppVersion> {
        self.versions.clone()
    }

    /// Mark message types as accepted for every version in scope.
    pub fn add_messages(&mut self, type_urls: &[&str]) -> ModuleResult<()> {
        self.configurator
            .add_messages(self.module, self.versions.clone(), type_urls)
    }

    /// Register the handler that migrates this module from consensus version
    /// `from` to `from + 1`.
    pub fn register_migration<F>(&mut self, from: ConsensusVersion, handler: F) -> ModuleResult<()>
    where
        F: Fn(&mut ExecContext<'_>) -> ModuleResult<()> + Send + Sync + 'static,
    {
        self.configurator
            .register_migration(self.module, from, Box::new(handler))
    }
}
