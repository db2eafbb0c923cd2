//! Inbound port: operations exposed by the upgrade coordinator.

use shared_types::{AppVersion, ExecContext, Height, KvRead, KvStore, ValidatorAddress};

use crate::domain::{PendingUpgrade, VersionTally};
use crate::error::SignalResult;

/// Quorum-voting protocol over the `signal` namespace.
///
/// Write operations run inside block execution and take the execution
/// context; queries take any read view (committed snapshot or working state).
pub trait UpgradeSignalApi: Send + Sync {
    /// Record `validator`'s vote for `version`, replacing any earlier vote.
    fn signal_version(
        &self,
        ctx: &mut ExecContext<'_>,
        validator: ValidatorAddress,
        version: AppVersion,
    ) -> SignalResult<()>;

    /// Tally votes and schedule an upgrade if one version reached quorum.
    ///
    /// Returns `Ok(None)` when no version has quorum yet.
    fn try_upgrade(&self, ctx: &mut ExecContext<'_>) -> SignalResult<Option<PendingUpgrade>>;

    /// Live voting power behind `version`.
    fn version_tally(&self, state: &dyn KvRead, version: AppVersion) -> SignalResult<VersionTally>;

    fn pending_upgrade(&self, state: &dyn KvRead) -> SignalResult<Option<PendingUpgrade>>;

    fn is_upgrade_pending(&self, state: &dyn KvRead) -> SignalResult<bool> {
        Ok(self.pending_upgrade(state)?.is_some())
    }

    /// The pending upgrade, if `height` has reached its activation height.
    fn should_upgrade(
        &self,
        state: &dyn KvRead,
        height: Height,
    ) -> SignalResult<Option<PendingUpgrade>> {
        Ok(self
            .pending_upgrade(state)?
            .filter(|pending| pending.is_due(height)))
    }

    /// Delete every signal `<= upper_bound` and clear the pending upgrade.
    ///
    /// Returns the number of signals removed.
    fn reset_tally(&self, state: &mut dyn KvStore, upper_bound: AppVersion) -> SignalResult<usize>;
}
