//! Migration engine.
//!
//! Runs registered per-module state transformations when the active app
//! version advances. Execution is strictly sequential and reads nothing but
//! replicated state, so every replica produces the same result.

use std::sync::Arc;

use shared_types::{AppVersion, ExecContext};
use tracing::{info, info_span};

use crate::domain::configurator::Configurator;
use crate::domain::registry::ModuleRegistry;
use crate::error::{ModuleError, ModuleResult};

pub struct MigrationEngine {
    registry: Arc<ModuleRegistry>,
    configurator: Arc<Configurator>,
}

impl MigrationEngine {
    pub fn new(registry: Arc<ModuleRegistry>, configurator: Arc<Configurator>) -> Self {
        Self {
            registry,
            configurator,
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn configurator(&self) -> &Arc<Configurator> {
        &self.configurator
    }

    /// Migrate state from app version `from` to `to`.
    ///
    /// - Modules present at both versions run their handler chain.
    /// - Modules new at `to` are initialized from their default genesis and
    ///   may not emit validator updates.
    /// - Modules absent at `to` abort the run before any handler executes.
    pub fn run_migrations(
        &self,
        ctx: &mut ExecContext<'_>,
        from: AppVersion,
        to: AppVersion,
    ) -> ModuleResult<()> {
        if from == to {
            return Ok(());
        }
        if from > to {
            return Err(ModuleError::InvalidVersionTransition { from, to });
        }
        let _span = info_span!("run_migrations", from, to).entered();

        let from_modules = self.registry.active_modules(from)?;
        let to_modules = self.registry.active_modules(to)?;

        if let Some(removed) = from_modules.keys().find(|name| !to_modules.contains_key(*name)) {
            return Err(ModuleError::ModuleRemovalUnsupported {
                module: removed.to_string(),
                from,
                to,
            });
        }

        for name in self.registry.order_migrations() {
            let Some(target) = to_modules.get(name) else {
                continue;
            };
            match from_modules.get(name) {
                Some(current) => {
                    let from_cv = current.consensus_version();
                    let to_cv = target.consensus_version();
                    if from_cv != to_cv {
                        info!(module = *name, from = from_cv, to = to_cv, "Migrating module");
                    }
                    self.configurator
                        .run_module_migrations(ctx, name, from_cv, to_cv)?;
                }
                None => {
                    info!(module = *name, "Initializing module added by upgrade");
                    let updates = target.init_genesis(ctx, &target.default_genesis())?;
                    if !updates.is_empty() {
                        return Err(ModuleError::NewModuleEmittedValidatorUpdates {
                            module: name.to_string(),
                        });
                    }
                }
            }
        }

        info!("Migrations complete");
        Ok(())
    }
}
