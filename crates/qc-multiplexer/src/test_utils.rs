//! Fixture modules for the multiplexer tests.

use std::sync::Arc;

use qc_modules::{Module, ModuleConfigurator, ModuleError, ModuleResult, VersionedModule};
use shared_types::{
    decode_u64, encode_u64, AppVersion, BlockHeader, ConsensusVersion, ExecContext, GenesisState,
    Height, KvRead, KvStore, Tx, ValidatorAddress, ValidatorUpdate, ADDRESS_LEN,
};

pub const COUNTER: &str = "counter";
pub const STAKING: &str = "staking";
pub const MSG_INCREMENT: &str = "/qc.counter.MsgIncrement";
pub const MSG_FAIL: &str = "/qc.counter.MsgFail";

pub fn header(height: Height, app_version: AppVersion) -> BlockHeader {
    BlockHeader {
        chain_id: "test-chain".into(),
        height,
        app_version,
        time: 0,
    }
}

pub fn addr(byte: u8) -> ValidatorAddress {
    ValidatorAddress([byte; ADDRESS_LEN])
}

pub fn increment_tx() -> Tx {
    Tx::new(MSG_INCREMENT, Vec::new())
}

pub fn failing_tx() -> Tx {
    Tx::new(MSG_FAIL, Vec::new())
}

pub fn genesis() -> GenesisState {
    [(STAKING.to_string(), Vec::new()), (COUNTER.to_string(), Vec::new())]
        .into_iter()
        .collect()
}

/// staking at 1..=3, counter cv1 at 2, counter cv2 at 3.
pub fn counter_entries() -> Vec<VersionedModule> {
    vec![
        VersionedModule::new(Arc::new(StakingModule), 1, 3),
        VersionedModule::new(Arc::new(CounterModule::new(1)), 2, 2),
        VersionedModule::new(Arc::new(CounterModule::new(2)), 3, 3),
    ]
}

pub fn read_count<S: KvRead + ?Sized>(state: &S) -> u64 {
    state
        .get(b"count")
        .map(|raw| decode_u64(COUNTER, b"count", raw).unwrap())
        .unwrap_or_default()
}

/// Emits a single validator at genesis.
pub struct StakingModule;

impl Module for StakingModule {
    fn name(&self) -> &'static str {
        STAKING
    }

    fn consensus_version(&self) -> ConsensusVersion {
        1
    }

    fn init_genesis(
        &self,
        _ctx: &mut ExecContext<'_>,
        _genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        Ok(vec![ValidatorUpdate {
            address: addr(1),
            power: 100,
        }])
    }

    fn export_genesis(&self, _state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// A counter under key `count`. The cv2 migration multiplies it by 100.
pub struct CounterModule {
    consensus_version: ConsensusVersion,
    fail_migration: bool,
}

impl CounterModule {
    pub fn new(consensus_version: ConsensusVersion) -> Self {
        Self {
            consensus_version,
            fail_migration: false,
        }
    }

    pub fn failing_migration(mut self) -> Self {
        self.fail_migration = true;
        self
    }
}

impl Module for CounterModule {
    fn name(&self) -> &'static str {
        COUNTER
    }

    fn consensus_version(&self) -> ConsensusVersion {
        self.consensus_version
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        _genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        ctx.kv(COUNTER).set(b"count", encode_u64(0).to_vec());
        Ok(Vec::new())
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        Ok(encode_u64(read_count(state)).to_vec())
    }

    fn register_services(&self, cfg: &mut ModuleConfigurator<'_>) -> ModuleResult<()> {
        cfg.add_messages(&[MSG_INCREMENT, MSG_FAIL])?;
        if self.consensus_version == 2 {
            let fail = self.fail_migration;
            cfg.register_migration(1, move |ctx| {
                if fail {
                    return Err(ModuleError::msg_failed(COUNTER, 9, "corrupt counter"));
                }
                let mut kv = ctx.kv(COUNTER);
                let count = read_count(&kv);
                kv.set(b"count", encode_u64(count * 100).to_vec());
                Ok(())
            })?;
        }
        Ok(())
    }

    fn handle_msg(
        &self,
        ctx: &mut ExecContext<'_>,
        type_url: &str,
        _payload: &[u8],
    ) -> ModuleResult<Vec<u8>> {
        let mut kv = ctx.kv(COUNTER);
        let count = read_count(&kv);
        if type_url == MSG_FAIL {
            kv.set(b"count", encode_u64(999).to_vec());
            return Err(ModuleError::msg_failed(COUNTER, 7, "refused"));
        }
        kv.set(b"count", encode_u64(count + 1).to_vec());
        Ok(encode_u64(count + 1).to_vec())
    }

    fn query(&self, state: &dyn KvRead, path: &str, _data: &[u8]) -> ModuleResult<Vec<u8>> {
        match path {
            "count" => Ok(encode_u64(read_count(state)).to_vec()),
            other => Err(ModuleError::UnknownQuery {
                module: COUNTER.to_string(),
                path: other.to_string(),
            }),
        }
    }
}
