//! Ordered lifecycle dispatch over the modules active at a version.

use shared_types::{AppVersion, ExecContext, GenesisState, StateSnapshot, ValidatorUpdate};
use tracing::debug;

use crate::domain::registry::ModuleRegistry;
use crate::error::{ModuleError, ModuleResult};

/// Tracks which module emitted validator updates in one phase.
#[derive(Default)]
struct UpdateCollector {
    emitter: Option<&'static str>,
    updates: Vec<ValidatorUpdate>,
}

impl UpdateCollector {
    fn collect(&mut self, module: &'static str, updates: Vec<ValidatorUpdate>) -> ModuleResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        if let Some(first) = self.emitter {
            return Err(ModuleError::MultipleValidatorUpdateEmitters {
                first: first.to_string(),
                second: module.to_string(),
            });
        }
        self.emitter = Some(module);
        self.updates = updates;
        Ok(())
    }
}

impl ModuleRegistry {
    /// Initialize every module active at the context's version that has a
    /// genesis payload. Exactly one module must produce the validator set.
    pub fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &GenesisState,
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        let modules = self.active_modules(ctx.app_version())?;
        let mut collector = UpdateCollector::default();

        for name in &self.order_init_genesis {
            let Some(module) = modules.get(name) else {
                continue;
            };
            let Some(payload) = genesis.get(*name) else {
                debug!(module = *name, "No genesis payload, skipping");
                continue;
            };
            debug!(module = *name, "Running init genesis");
            let updates = module.init_genesis(ctx, payload)?;
            collector.collect(*name, updates)?;
        }

        if collector.updates.is_empty() {
            return Err(ModuleError::EmptyGenesisValidatorSet);
        }
        Ok(collector.updates)
    }

    /// Export the committed state of every module active at `version`.
    pub fn export_genesis(
        &self,
        snapshot: &StateSnapshot,
        version: AppVersion,
    ) -> ModuleResult<GenesisState> {
        let modules = self.active_modules(version)?;
        let mut exported = GenesisState::new();
        for name in &self.order_export_genesis {
            let Some(module) = modules.get(name) else {
                continue;
            };
            let payload = module.export_genesis(&snapshot.namespace(name))?;
            exported.insert(name.to_string(), payload);
        }
        Ok(exported)
    }

    /// Run pre-block hooks in order.
    pub fn pre_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<()> {
        let modules = self.active_modules(ctx.app_version())?;
        for name in &self.order_pre_block {
            if let Some(hook) = modules.get(name).and_then(|m| m.as_pre_blocker()) {
                hook.pre_block(ctx)?;
            }
        }
        Ok(())
    }

    /// Run post-block hooks in order; at most one may emit validator updates.
    pub fn post_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>> {
        let modules = self.active_modules(ctx.app_version())?;
        let mut collector = UpdateCollector::default();
        for name in &self.order_post_block {
            if let Some(hook) = modules.get(name).and_then(|m| m.as_post_blocker()) {
                let updates = hook.post_block(ctx)?;
                collector.collect(*name, updates)?;
            }
        }
        Ok(collector.updates)
    }
}
