//! State machine assembled from a module registry.

use std::sync::Arc;

use qc_modules::{
    Configurator, MigrationEngine, ModuleError, ModuleRegistry, ModuleResult, VersionedModule,
};
use shared_types::{
    AppVersion, ExecContext, GenesisState, StateSnapshot, Tx, ValidatorUpdate,
};
use tracing::debug;

use crate::ports::StateMachine;

/// Routes transactions to the module that registered their message type.
///
/// A transaction is rejected unless its type is accepted at the header's app
/// version, so a message introduced by `v2` fails on a `v1` chain even if the
/// binary already contains the handler.
pub struct ModularStateMachine {
    registry: Arc<ModuleRegistry>,
    configurator: Arc<Configurator>,
}

impl ModularStateMachine {
    pub fn new(registry: Arc<ModuleRegistry>, configurator: Arc<Configurator>) -> Self {
        Self {
            registry,
            configurator,
        }
    }

    /// Build the registry and collect every module's services.
    pub fn from_entries(entries: Vec<VersionedModule>) -> ModuleResult<Self> {
        let registry = ModuleRegistry::build(entries)?;
        let mut configurator = Configurator::new();
        registry.register_services(&mut configurator)?;
        Ok(Self::new(Arc::new(registry), Arc::new(configurator)))
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn configurator(&self) -> &Arc<Configurator> {
        &self.configurator
    }

    /// Migration engine over the same registry and configurator.
    pub fn migration_engine(&self) -> MigrationEngine {
        MigrationEngine::new(Arc::clone(&self.registry), Arc::clone(&self.configurator))
    }
}

impl StateMachine for ModularStateMachine {
    fn init_chain(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &GenesisState,
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        self.registry.init_genesis(ctx, genesis)
    }

    fn pre_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<()> {
        self.registry.pre_block(ctx)
    }

    fn deliver_tx(&self, ctx: &mut ExecContext<'_>, tx: &Tx) -> ModuleResult<Vec<u8>> {
        let version = ctx.app_version();
        self.configurator.check_accepted(version, &tx.type_url)?;

        let module = self
            .configurator
            .message_owner(&tx.type_url)
            .and_then(|owner| self.registry.active_modules(version).ok()?.get(owner))
            .ok_or_else(|| ModuleError::UnroutableMessage {
                module: "router".to_string(),
                type_url: tx.type_url.clone(),
            })?;

        debug!(module = module.name(), type_url = %tx.type_url, "Routing transaction");
        module.handle_msg(ctx, &tx.type_url, &tx.payload)
    }

    fn post_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>> {
        self.registry.post_block(ctx)
    }

    /// `path` is `<module>/<query>`.
    fn query(
        &self,
        snapshot: &StateSnapshot,
        version: AppVersion,
        path: &str,
        data: &[u8],
    ) -> ModuleResult<Vec<u8>> {
        let (name, rest) = path.split_once('/').unwrap_or((path, ""));
        let module = self
            .registry
            .active_modules(version)?
            .get(name)
            .ok_or_else(|| ModuleError::UnknownQuery {
                module: name.to_string(),
                path: rest.to_string(),
            })?;
        module.query(&snapshot.namespace(name), rest, data)
    }

    fn export_genesis(
        &self,
        snapshot: &StateSnapshot,
        version: AppVersion,
    ) -> ModuleResult<GenesisState> {
        self.registry.export_genesis(snapshot, version)
    }
}
