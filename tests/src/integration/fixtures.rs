//! Test chain used by every integration scenario.
//!
//! | Module       | App versions | Notes                                           |
//! |--------------|--------------|-------------------------------------------------|
//! | `validators` | 1..=2        | Emits the genesis validator set from JSON       |
//! | `signal`     | 1..=2        | Quorum signalling                               |
//! | `ledger`     | 1 (cv1), 2 (cv2) | cv2 counts in cents; migration scales by 100 |
//! | `audit`      | 2            | Added by the upgrade; counts blocks post-block  |

use std::sync::Arc;

use qc_modules::{
    Module, ModuleConfigurator, ModuleError, ModuleResult, PostBlocker, VersionedModule,
};
use qc_multiplexer::{
    BlockOutcome, ModularStateMachine, Multiplexer, MultiplexerConfig, StateMachine,
    VersionRange, Versions,
};
use qc_signal::rpc::{PendingUpgradeResponse, VersionTallyParams};
use qc_signal::{
    InMemoryValidatorSet, MsgSignalVersion, MsgTryUpgrade, PendingUpgrade, SignalConfig,
    SignalModule, SignalMsg, UpgradeCoordinator, VersionTally, QUERY_PENDING_UPGRADE,
    QUERY_VERSION_TALLY, SIGNAL_NAMESPACE,
};
use shared_types::{
    decode_u64, encode_u64, AppHash, AppVersion, ConsensusVersion, ExecContext, GenesisState,
    Height, KvRead, KvStore, StateStore, Tx, ValidatorAddress, ValidatorUpdate, ADDRESS_LEN,
};

pub const CHAIN_ID: &str = "test-upgrade";
pub const VALIDATORS: &str = "validators";
pub const LEDGER: &str = "ledger";
pub const AUDIT: &str = "audit";
pub const MSG_DEPOSIT: &str = "/qc.ledger.MsgDeposit";

/// Blocks between quorum and activation.
pub const UPGRADE_DELAY: u64 = 3;

const BALANCE_KEY: &[u8] = b"balance";
const BLOCKS_KEY: &[u8] = b"blocks";

pub fn addr(byte: u8) -> ValidatorAddress {
    ValidatorAddress([byte; ADDRESS_LEN])
}

/// Four validators, total power 120, quorum threshold 100.
pub fn validator_powers() -> Vec<(ValidatorAddress, u64)> {
    vec![(addr(1), 40), (addr(2), 1), (addr(3), 59), (addr(4), 20)]
}

pub fn genesis(powers: &[(ValidatorAddress, u64)]) -> GenesisState {
    let updates: Vec<ValidatorUpdate> = powers
        .iter()
        .map(|(address, power)| ValidatorUpdate {
            address: *address,
            power: *power,
        })
        .collect();
    [
        (
            VALIDATORS.to_string(),
            serde_json::to_vec(&updates).expect("genesis encodes"),
        ),
        (LEDGER.to_string(), Vec::new()),
        (SIGNAL_NAMESPACE.to_string(), Vec::new()),
    ]
    .into_iter()
    .collect()
}

pub fn signal(validator: ValidatorAddress, version: AppVersion) -> Tx {
    SignalMsg::SignalVersion(MsgSignalVersion { validator, version })
        .to_tx()
        .expect("signal encodes")
}

pub fn try_upgrade(signer: ValidatorAddress) -> Tx {
    SignalMsg::TryUpgrade(MsgTryUpgrade { signer })
        .to_tx()
        .expect("try upgrade encodes")
}

pub fn deposit() -> Tx {
    Tx::new(MSG_DEPOSIT, Vec::new())
}

fn read_u64<S: KvRead + ?Sized>(state: &S, key: &[u8]) -> ModuleResult<u64> {
    match state.get(key) {
        Some(raw) => Ok(decode_u64(state.namespace(), key, raw)?),
        None => Ok(0),
    }
}

// =============================================================================
// MODULES
// =============================================================================

/// Owns the validator set: genesis is a JSON list of `ValidatorUpdate`.
pub struct ValidatorsModule;

impl Module for ValidatorsModule {
    fn name(&self) -> &'static str {
        VALIDATORS
    }

    fn consensus_version(&self) -> ConsensusVersion {
        1
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        let updates: Vec<ValidatorUpdate> =
            serde_json::from_slice(genesis).map_err(|e| ModuleError::Genesis {
                module: VALIDATORS.to_string(),
                reason: e.to_string(),
            })?;
        let mut kv = ctx.kv(VALIDATORS);
        for update in &updates {
            kv.set(update.address.as_bytes(), encode_u64(update.power).to_vec());
        }
        Ok(updates)
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        let mut updates = Vec::new();
        for (key, raw) in state.iter() {
            let address = ValidatorAddress::from_slice(key).map_err(|e| ModuleError::Genesis {
                module: VALIDATORS.to_string(),
                reason: e.to_string(),
            })?;
            updates.push(ValidatorUpdate {
                address,
                power: decode_u64(VALIDATORS, key, raw)?,
            });
        }
        serde_json::to_vec(&updates).map_err(|e| ModuleError::Genesis {
            module: VALIDATORS.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A single balance. cv1 deposits 1 unit, cv2 deposits 100 cents.
pub struct LedgerModule {
    consensus_version: ConsensusVersion,
}

impl LedgerModule {
    pub fn new(consensus_version: ConsensusVersion) -> Self {
        Self { consensus_version }
    }

    fn unit(&self) -> u64 {
        if self.consensus_version >= 2 {
            100
        } else {
            1
        }
    }
}

impl Module for LedgerModule {
    fn name(&self) -> &'static str {
        LEDGER
    }

    fn consensus_version(&self) -> ConsensusVersion {
        self.consensus_version
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        _genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        ctx.kv(LEDGER).set(BALANCE_KEY, encode_u64(0).to_vec());
        Ok(Vec::new())
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        Ok(encode_u64(read_u64(state, BALANCE_KEY)?).to_vec())
    }

    fn register_services(&self, cfg: &mut ModuleConfigurator<'_>) -> ModuleResult<()> {
        cfg.add_messages(&[MSG_DEPOSIT])?;
        if self.consensus_version == 2 {
            cfg.register_migration(1, |ctx| {
                let mut kv = ctx.kv(LEDGER);
                let units = read_u64(&kv, BALANCE_KEY)?;
                kv.set(BALANCE_KEY, encode_u64(units * 100).to_vec());
                Ok(())
            })?;
        }
        Ok(())
    }

    fn handle_msg(
        &self,
        ctx: &mut ExecContext<'_>,
        _type_url: &str,
        _payload: &[u8],
    ) -> ModuleResult<Vec<u8>> {
        let mut kv = ctx.kv(LEDGER);
        let balance = read_u64(&kv, BALANCE_KEY)? + self.unit();
        kv.set(BALANCE_KEY, encode_u64(balance).to_vec());
        Ok(encode_u64(balance).to_vec())
    }

    fn query(&self, state: &dyn KvRead, path: &str, _data: &[u8]) -> ModuleResult<Vec<u8>> {
        match path {
            "balance" => Ok(encode_u64(read_u64(state, BALANCE_KEY)?).to_vec()),
            other => Err(ModuleError::UnknownQuery {
                module: LEDGER.to_string(),
                path: other.to_string(),
            }),
        }
    }
}

/// Counts executed blocks from its post-block hook.
pub struct AuditModule;

impl Module for AuditModule {
    fn name(&self) -> &'static str {
        AUDIT
    }

    fn consensus_version(&self) -> ConsensusVersion {
        1
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        _genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        ctx.kv(AUDIT).set(BLOCKS_KEY, encode_u64(0).to_vec());
        Ok(Vec::new())
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        Ok(encode_u64(read_u64(state, BLOCKS_KEY)?).to_vec())
    }

    fn query(&self, state: &dyn KvRead, path: &str, _data: &[u8]) -> ModuleResult<Vec<u8>> {
        match path {
            "blocks" => Ok(encode_u64(read_u64(state, BLOCKS_KEY)?).to_vec()),
            other => Err(ModuleError::UnknownQuery {
                module: AUDIT.to_string(),
                path: other.to_string(),
            }),
        }
    }

    fn as_post_blocker(&self) -> Option<&dyn PostBlocker> {
        Some(self)
    }
}

impl PostBlocker for AuditModule {
    fn post_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>> {
        let mut kv = ctx.kv(AUDIT);
        let blocks = read_u64(&kv, BLOCKS_KEY)? + 1;
        kv.set(BLOCKS_KEY, encode_u64(blocks).to_vec());
        Ok(Vec::new())
    }
}

// =============================================================================
// REPLICA
// =============================================================================

/// One node's view of the chain: multiplexer plus the validator set the
/// node keeps in sync with genesis updates.
pub struct Replica {
    pub mux: Multiplexer,
    pub validators: Arc<InMemoryValidatorSet>,
    pub hashes: Vec<AppHash>,
}

impl Replica {
    /// Fresh replica with genesis applied.
    pub fn start(powers: &[(ValidatorAddress, u64)]) -> Self {
        let mut replica = Self::open(StateStore::new(), Arc::new(InMemoryValidatorSet::new()));
        let updates = replica
            .mux
            .init_chain(&genesis(powers), 0)
            .expect("genesis applies");
        replica.validators.apply_updates(&updates);
        replica
    }

    /// Replica over an existing store; resumes from its committed version.
    pub fn open(store: StateStore, validators: Arc<InMemoryValidatorSet>) -> Self {
        let config = SignalConfig {
            upgrade_height_delay: UPGRADE_DELAY,
            ..SignalConfig::for_chain(CHAIN_ID)
        };
        let coordinator = Arc::new(UpgradeCoordinator::new(Arc::clone(&validators), config));

        let entries = vec![
            VersionedModule::new(Arc::new(ValidatorsModule), 1, 2),
            VersionedModule::new(Arc::new(SignalModule::new(Arc::clone(&coordinator))), 1, 2),
            VersionedModule::new(Arc::new(LedgerModule::new(1)), 1, 1),
            VersionedModule::new(Arc::new(LedgerModule::new(2)), 2, 2),
            VersionedModule::new(Arc::new(AuditModule), 2, 2),
        ];
        let machine = ModularStateMachine::from_entries(entries).expect("registry builds");
        let migrator = Arc::new(machine.migration_engine());
        let machine: Arc<dyn StateMachine> = Arc::new(machine);
        let bindings = Versions::new(vec![
            (VersionRange::single(1).expect("valid range"), Arc::clone(&machine)),
            (VersionRange::single(2).expect("valid range"), machine),
        ])
        .expect("ranges are disjoint");

        let mux = Multiplexer::new(
            MultiplexerConfig {
                genesis_version: 1,
                chain_id: CHAIN_ID.to_string(),
                ..MultiplexerConfig::default()
            },
            bindings,
            migrator,
            coordinator,
            store,
        )
        .expect("multiplexer starts");

        Self {
            mux,
            validators,
            hashes: Vec::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.mux.committed_height()
    }

    /// Finalize and commit the next height.
    pub fn block(&mut self, txs: &[Tx]) -> BlockOutcome {
        let height = self.height() + 1;
        let outcome = self
            .mux
            .finalize_block(height, height * 6, txs)
            .expect("block executes");
        let hash = self.mux.commit().expect("block commits");
        self.hashes.push(hash);
        outcome
    }

    pub fn tally(&self, version: AppVersion) -> VersionTally {
        let params = serde_json::to_vec(&VersionTallyParams { version }).expect("params encode");
        let raw = self
            .mux
            .query(&format!("{SIGNAL_NAMESPACE}/{QUERY_VERSION_TALLY}"), &params)
            .expect("tally query");
        serde_json::from_slice(&raw).expect("tally decodes")
    }

    pub fn pending(&self) -> Option<PendingUpgrade> {
        let raw = self
            .mux
            .query(&format!("{SIGNAL_NAMESPACE}/{QUERY_PENDING_UPGRADE}"), &[])
            .expect("pending query");
        let response: PendingUpgradeResponse =
            serde_json::from_slice(&raw).expect("pending decodes");
        response.upgrade
    }

    pub fn balance(&self) -> u64 {
        let raw = self.mux.query("ledger/balance", &[]).expect("balance query");
        decode_u64(LEDGER, BALANCE_KEY, &raw).expect("balance decodes")
    }

    pub fn audited_blocks(&self) -> u64 {
        let raw = self.mux.query("audit/blocks", &[]).expect("audit query");
        decode_u64(AUDIT, BLOCKS_KEY, &raw).expect("audit decodes")
    }
}
