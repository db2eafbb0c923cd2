//! Registers the upgrade coordinator as an ordinary module so signalling
//! transactions route through the module registry.

use std::sync::Arc;

use qc_modules::{Module, ModuleConfigurator, ModuleError, ModuleResult, CODE_INTERNAL};
use serde::Serialize;
use shared_types::{encode_u64, ConsensusVersion, ExecContext, KvRead, KvStore, ValidatorUpdate};
use tracing::debug;

use crate::domain::keys::stored_signals;
use crate::domain::{
    GenesisSignal, SignalGenesis, SignalMsg, MSG_SIGNAL_VERSION, MSG_TRY_UPGRADE,
    SIGNAL_NAMESPACE,
};
use crate::ports::{UpgradeSignalApi, ValidatorSetProvider};
use crate::rpc::{PendingUpgradeResponse, VersionTallyParams};
use crate::service::UpgradeCoordinator;

pub const QUERY_VERSION_TALLY: &str = "version_tally";
pub const QUERY_PENDING_UPGRADE: &str = "pending_upgrade";

pub struct SignalModule<V: ValidatorSetProvider> {
    coordinator: Arc<UpgradeCoordinator<V>>,
    consensus_version: ConsensusVersion,
}

impl<V: ValidatorSetProvider> SignalModule<V> {
    pub fn new(coordinator: Arc<UpgradeCoordinator<V>>) -> Self {
        Self {
            coordinator,
            consensus_version: 1,
        }
    }

    pub fn with_consensus_version(mut self, consensus_version: ConsensusVersion) -> Self {
        self.consensus_version = consensus_version;
        self
    }

    pub fn coordinator(&self) -> &Arc<UpgradeCoordinator<V>> {
        &self.coordinator
    }
}

fn to_json<T: Serialize>(value: &T) -> ModuleResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| ModuleError::msg_failed(SIGNAL_NAMESPACE, CODE_INTERNAL, e.to_string()))
}

fn genesis_error(reason: impl ToString) -> ModuleError {
    ModuleError::Genesis {
        module: SIGNAL_NAMESPACE.to_string(),
        reason: reason.to_string(),
    }
}

impl<V: ValidatorSetProvider + 'static> Module for SignalModule<V> {
    fn name(&self) -> &'static str {
        SIGNAL_NAMESPACE
    }

    fn consensus_version(&self) -> ConsensusVersion {
        self.consensus_version
    }

    fn init_genesis(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &[u8],
    ) -> ModuleResult<Vec<ValidatorUpdate>> {
        if genesis.is_empty() {
            return Ok(Vec::new());
        }
        let state: SignalGenesis = serde_json::from_slice(genesis).map_err(genesis_error)?;
        if let Some(pending) = &state.pending_upgrade {
            // Must be an upgrade, and must activate after the block that commits genesis.
            if pending.app_version <= ctx.app_version() {
                return Err(genesis_error(format!(
                    "pending upgrade to version {} does not exceed genesis version {}",
                    pending.app_version,
                    ctx.app_version()
                )));
            }
            if pending.activation_height <= ctx.height() + 1 {
                return Err(genesis_error(format!(
                    "pending upgrade activation height {} must be after height {}",
                    pending.activation_height,
                    ctx.height() + 1
                )));
            }
        }
        let mut kv = ctx.kv(SIGNAL_NAMESPACE);
        for signal in &state.signals {
            kv.set(signal.validator.as_bytes(), encode_u64(signal.version).to_vec());
        }
        if let Some(pending) = &state.pending_upgrade {
            UpgradeCoordinator::<V>::write_pending(&mut kv, pending)?;
        }
        debug!(signals = state.signals.len(), "Signal genesis loaded");
        Ok(Vec::new())
    }

    fn export_genesis(&self, state: &dyn KvRead) -> ModuleResult<Vec<u8>> {
        let genesis = SignalGenesis {
            signals: stored_signals(state)?
                .into_iter()
                .map(|(validator, version)| GenesisSignal { validator, version })
                .collect(),
            pending_upgrade: self.coordinator.pending_upgrade(state)?,
        };
        serde_json::to_vec(&genesis).map_err(genesis_error)
    }

    fn register_services(&self, cfg: &mut ModuleConfigurator<'_>) -> ModuleResult<()> {
        cfg.add_messages(&[MSG_SIGNAL_VERSION, MSG_TRY_UPGRADE])
    }

    fn handle_msg(
        &self,
        ctx: &mut ExecContext<'_>,
        type_url: &str,
        payload: &[u8],
    ) -> ModuleResult<Vec<u8>> {
        match SignalMsg::decode(type_url, payload)? {
            SignalMsg::SignalVersion(msg) => {
                self.coordinator
                    .signal_version(ctx, msg.validator, msg.version)?;
                Ok(Vec::new())
            }
            SignalMsg::TryUpgrade(msg) => {
                debug!(signer = %msg.signer, "Try upgrade requested");
                let upgrade = self.coordinator.try_upgrade(ctx)?;
                to_json(&PendingUpgradeResponse { upgrade })
            }
        }
    }

    fn query(&self, state: &dyn KvRead, path: &str, data: &[u8]) -> ModuleResult<Vec<u8>> {
        match path {
            QUERY_VERSION_TALLY => {
                let params: VersionTallyParams = serde_json::from_slice(data).map_err(|e| {
                    ModuleError::msg_failed(SIGNAL_NAMESPACE, CODE_INTERNAL, e.to_string())
                })?;
                to_json(&self.coordinator.version_tally(state, params.version)?)
            }
            QUERY_PENDING_UPGRADE => to_json(&PendingUpgradeResponse {
                upgrade: self.coordinator.pending_upgrade(state)?,
            }),
            other => Err(ModuleError::UnknownQuery {
                module: SIGNAL_NAMESPACE.to_string(),
                path: other.to_string(),
            }),
        }
    }
}
