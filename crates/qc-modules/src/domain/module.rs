//! Module contract and versioned registration entries.

use std::sync::Arc;

use shared_types::{AppVersion, ConsensusVersion, ExecContext, KvRead, ValidatorUpdate};

use crate::domain::configurator::ModuleConfigurator;
use crate::error::{ModuleError, ModuleResult};

/// A named unit of state-machine behaviour with its own schema version.
///
/// Each module owns the key-value namespace named after it. Optional block
/// hooks are exposed through [`Module::as_pre_blocker`] and
/// [`Module::as_post_blocker`] rather than discovered at run time.
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// This implementation's schema version.
    fn consensus_version(&self) -> ConsensusVersion;

    /// Genesis payload used when the module is added by an upgrade.
    fn default_genesis(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Apply a genesis payload, optionally emitting the initial validator set.
    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>>;

    /// Serialize the module's committed state as a genesis payload.
    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>>;

    /// Register accepted message types and migration handlers.
    fn register_services(&self, _cfg: &mut ModuleConfigurator<'_>) -> ModuleResult<()> {
        Ok(())
    }

    /// Execute one already-authenticated message.
    fn handle_msg(
        &self,
        _ctx: &mut ExecContext<'_>,
        type_url: &str,
        _payload: &[u8],
    ) -> ModuleResult<Vec<u8>> {
        Err(ModuleError::UnroutableMessage {
            module: self.name().to_string(),
            type_url: type_url.to_string(),
        })
    }

    /// Answer a read-only query against committed state.
    fn query(&self, _state: &dyn KvRead, path: &str, _data: &[u8]) -> ModuleResult<Vec<u8>> {
        Err(ModuleError::UnknownQuery {
            module: self.name().to_string(),
            path: path.to_string(),
        })
    }

    fn as_pre_blocker(&self) -> Option<&dyn PreBlocker> {
        None
    }

    fn as_post_blocker(&self) -> Option<&dyn PostBlocker> {
        None
    }
}

/// Hook run before any transaction of a block.
pub trait PreBlocker: Send + Sync {
    fn pre_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<()>;
}

/// Hook run after every transaction of a block.
///
/// A non-empty return value is an authoritative validator set change.
pub trait PostBlocker: Send + Sync {
    fn post_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>>;
}

/// A module implementation bound to an inclusive app version range.
#[derive(Clone)]
pub struct VersionedModule {
    pub module: Arc<dyn Module>,
    pub from_version: AppVersion,
    pub to_version: AppVersion,
}

impl VersionedModule {
    pub fn new(module: Arc<dyn Module>, from_version: AppVersion, to_version: AppVersion) -> Self {
        Self {
            module,
            from_version,
            to_version,
        }
    }

    pub fn name(&self) -> &'static str {
        self.module.name()
    }
}

impl std::fmt::Debug for VersionedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedModule")
            .field("name", &self.name())
            .field("consensus_version", &self.module.consensus_version())
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .finish()
    }
}

/// Deterministic state transformation for one consensus version step.
pub type MigrationHandler = Box<dyn Fn(&mut ExecContext<'_>) -> ModuleResult<()> + Send + Sync>;
