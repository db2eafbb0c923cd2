//! Fixture modules shared by the unit tests.

use std::sync::Arc;

use shared_types::{
    AppVersion, BlockHeader, ConsensusVersion, ExecContext, Height, KvRead, KvStore,
    ValidatorAddress, ValidatorUpdate, ADDRESS_LEN,
};

use crate::domain::configurator::ModuleConfigurator;
use crate::domain::module::{Module, PostBlocker, PreBlocker, VersionedModule};
use crate::error::ModuleResult;

pub fn header(height: Height, app_version: AppVersion) -> BlockHeader {
    BlockHeader {
        chain_id: "test-chain".into(),
        height,
        app_version,
        time: 0,
    }
}

pub fn validator(byte: u8, power: u64) -> ValidatorUpdate {
    ValidatorUpdate {
        address: ValidatorAddress([byte; ADDRESS_LEN]),
        power,
    }
}

pub fn entry(module: TestModule, from: AppVersion, to: AppVersion) -> VersionedModule {
    VersionedModule::new(Arc::new(module), from, to)
}

/// Stores its genesis payload under `genesis` and records hook heights.
#[derive(Clone)]
pub struct TestModule {
    name: &'static str,
    consensus_version: ConsensusVersion,
    emits: Vec<ValidatorUpdate>,
    hooks: bool,
    messages: Vec<&'static str>,
}

impl TestModule {
    pub fn new(name: &'static str, consensus_version: ConsensusVersion) -> Self {
        Self {
            name,
            consensus_version,
            emits: Vec::new(),
            hooks: false,
            messages: Vec::new(),
        }
    }

    pub fn emitting(mut self, updates: Vec<ValidatorUpdate>) -> Self {
        self.emits = updates;
        self
    }

    pub fn with_hooks(mut self) -> Self {
        self.hooks = true;
        self
    }

    pub fn with_message(mut self, type_url: &'static str) -> Self {
        self.messages.push(type_url);
        self
    }
}

impl Module for TestModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn consensus_version(&self) -> ConsensusVersion {
        self.consensus_version
    }

    fn default_genesis(&self) -> Vec<u8> {
        b"default".to_vec()
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        ctx.kv(self.name).set(b"genesis", genesis.to_vec());
        Ok(self.emits.clone())
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        Ok(state.get(b"genesis").map(<[u8]>::to_vec).unwrap_or_default())
    }

    fn register_services(&self, cfg: &mut ModuleConfigurator<'_>) -> ModuleResult<()> {
        cfg.add_messages(&self.messages)
    }

    fn as_pre_blocker(&self) -> Option<&dyn PreBlocker> {
        self.hooks.then_some(self as &dyn PreBlocker)
    }

    fn as_post_blocker(&self) -> Option<&dyn PostBlocker> {
        self.hooks.then_some(self as &dyn PostBlocker)
    }
}

impl PreBlocker for TestModule {
    fn pre_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<()> {
        let height = ctx.height() as u8;
        ctx.kv(self.name).set(b"pre_block", vec![height]);
        Ok(())
    }
}

impl PostBlocker for TestModule {
    fn post_block(&self, _ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>> {
        Ok(self.emits.clone())
    }
}
