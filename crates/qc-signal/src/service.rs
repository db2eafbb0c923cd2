//! Upgrade Coordinator - quorum voting on the next app version

use std::collections::BTreeMap;
use std::sync::Arc;

use quantum_telemetry::{PENDING_UPGRADES, UPGRADE_REJECTIONS, UPGRADE_SIGNALS};
use shared_types::{
    decode_u64, encode_u64, AppVersion, ExecContext, KvRead, KvStore, StoreError,
    ValidatorAddress,
};
use tracing::{debug, info};

use crate::domain::keys::stored_signals;
use crate::domain::{
    is_signal_key, quorum_threshold, PendingUpgrade, VersionTally, SIGNAL_NAMESPACE, UPGRADE_KEY,
};
use crate::error::{SignalError, SignalResult};
use crate::ports::{UpgradeSignalApi, ValidatorSetProvider};

/// One week of 6 second blocks.
pub const DEFAULT_UPGRADE_HEIGHT_DELAY: u64 = 7 * 24 * 60 * 60 / 6;

/// Delay used by test and local networks.
pub const TEST_UPGRADE_HEIGHT_DELAY: u64 = 50;

/// Signalling configuration
#[derive(Clone, Debug)]
pub struct SignalConfig {
    /// Blocks between reaching quorum and activation
    pub upgrade_height_delay: u64,
    /// Quorum fraction numerator
    pub threshold_numerator: u64,
    /// Quorum fraction denominator
    pub threshold_denominator: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            upgrade_height_delay: DEFAULT_UPGRADE_HEIGHT_DELAY,
            threshold_numerator: 5,
            threshold_denominator: 6,
        }
    }
}

impl SignalConfig {
    /// Short delay on test and local chains, one week elsewhere.
    pub fn for_chain(chain_id: &str) -> Self {
        let mut config = Self::default();
        if chain_id.starts_with("test") || chain_id.starts_with("local") {
            config.upgrade_height_delay = TEST_UPGRADE_HEIGHT_DELAY;
        }
        config
    }

    pub fn threshold(&self, total_power: u64) -> u64 {
        quorum_threshold(
            total_power,
            self.threshold_numerator,
            self.threshold_denominator,
        )
    }
}

/// Upgrade Coordinator implementation
pub struct UpgradeCoordinator<V: ValidatorSetProvider> {
    config: SignalConfig,
    validators: Arc<V>,
}

impl<V: ValidatorSetProvider> UpgradeCoordinator<V> {
    pub fn new(validators: Arc<V>, config: SignalConfig) -> Self {
        Self { config, validators }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn validators(&self) -> &Arc<V> {
        &self.validators
    }

    fn read_pending<S: KvRead + ?Sized>(state: &S) -> SignalResult<Option<PendingUpgrade>> {
        let Some(raw) = state.get(UPGRADE_KEY) else {
            return Ok(None);
        };
        bincode::deserialize(raw).map(Some).map_err(|e| {
            SignalError::Store(StoreError::Decode {
                namespace: state.namespace().to_string(),
                key: "upgrade".to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub(crate) fn write_pending(
        state: &mut dyn KvStore,
        pending: &PendingUpgrade,
    ) -> SignalResult<()> {
        let raw = bincode::serialize(pending)
            .map_err(|e| SignalError::Store(StoreError::Serialization(e.to_string())))?;
        state.set(UPGRADE_KEY, raw);
        Ok(())
    }

    fn reject<T>(err: SignalError) -> SignalResult<T> {
        UPGRADE_REJECTIONS.with_label_values(&[err.label()]).inc();
        debug!(error = %err, "Signalling transaction rejected");
        Err(err)
    }

    /// First version whose accumulated live power reaches the threshold,
    /// scanning signals in ascending address order.
    fn quorum_version(&self, state: &dyn KvRead) -> SignalResult<Option<AppVersion>> {
        let total = self.validators.total_power();
        if total == 0 {
            return Ok(None);
        }
        let threshold = self.config.threshold(total);
        let mut tallies: BTreeMap<AppVersion, u64> = BTreeMap::new();
        for (validator, version) in stored_signals(state)? {
            let Some(power) = self.validators.validator_power(&validator) else {
                continue;
            };
            let accumulated = tallies.entry(version).or_default();
            *accumulated = accumulated.saturating_add(power);
            if *accumulated >= threshold {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }
}

impl<V: ValidatorSetProvider> UpgradeSignalApi for UpgradeCoordinator<V> {
    fn signal_version(
        &self,
        ctx: &mut ExecContext<'_>,
        validator: ValidatorAddress,
        version: AppVersion,
    ) -> SignalResult<()> {
        let current = ctx.app_version();
        let mut kv = ctx.kv(SIGNAL_NAMESPACE);

        if Self::read_pending(&kv)?.is_some() {
            return Self::reject(SignalError::UpgradePending);
        }
        if version != current && version != current.saturating_add(1) {
            return Self::reject(SignalError::InvalidSignalVersion { version, current });
        }
        if self.validators.validator_power(&validator).is_none() {
            return Self::reject(SignalError::UnknownValidator { validator });
        }

        kv.set(validator.as_bytes(), encode_u64(version).to_vec());
        UPGRADE_SIGNALS.inc();
        info!(%validator, version, "Version signal recorded");
        Ok(())
    }

    fn try_upgrade(&self, ctx: &mut ExecContext<'_>) -> SignalResult<Option<PendingUpgrade>> {
        let current = ctx.app_version();
        let height = ctx.height();
        let mut kv = ctx.kv(SIGNAL_NAMESPACE);

        if Self::read_pending(&kv)?.is_some() {
            return Self::reject(SignalError::UpgradePending);
        }
        let Some(version) = self.quorum_version(&kv)? else {
            debug!(height, "No version has reached quorum");
            return Ok(None);
        };
        if version <= current {
            return Self::reject(SignalError::InvalidUpgradeVersion { version, current });
        }

        let pending = PendingUpgrade {
            app_version: version,
            activation_height: height.saturating_add(self.config.upgrade_height_delay),
        };
        Self::write_pending(&mut kv, &pending)?;
        PENDING_UPGRADES.inc();
        info!(
            app_version = pending.app_version,
            activation_height = pending.activation_height,
            "Upgrade scheduled"
        );
        Ok(Some(pending))
    }

    fn version_tally(&self, state: &dyn KvRead, version: AppVersion) -> SignalResult<VersionTally> {
        let total_voting_power = self.validators.total_power();
        let voting_power = stored_signals(state)?
            .into_iter()
            .filter(|(_, signalled)| *signalled == version)
            .filter_map(|(validator, _)| self.validators.validator_power(&validator))
            .fold(0u64, u64::saturating_add);

        Ok(VersionTally {
            voting_power,
            threshold: self.config.threshold(total_voting_power),
            total_voting_power,
        })
    }

    fn pending_upgrade(&self, state: &dyn KvRead) -> SignalResult<Option<PendingUpgrade>> {
        Self::read_pending(state)
    }

    fn reset_tally(&self, state: &mut dyn KvStore, upper_bound: AppVersion) -> SignalResult<usize> {
        // Surface corrupt signals before deleting anything.
        stored_signals(&*state)?;
        let namespace = state.namespace().to_string();
        let removed = state.delete_where(&|key, value| {
            is_signal_key(key)
                && decode_u64(&namespace, key, value).is_ok_and(|version| version <= upper_bound)
        });
        state.delete(UPGRADE_KEY);
        info!(upper_bound, removed, "Signal tally reset");
        Ok(removed)
    }
}
