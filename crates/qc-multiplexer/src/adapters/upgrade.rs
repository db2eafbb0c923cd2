//! Port implementations for the migration engine and the upgrade coordinator.

use qc_modules::{MigrationEngine, ModuleResult};
use qc_signal::{
    PendingUpgrade, SignalResult, UpgradeCoordinator, UpgradeSignalApi, ValidatorSetProvider,
    SIGNAL_NAMESPACE,
};
use shared_types::{AppVersion, ExecContext, Height, StateStore};

use crate::ports::{Migrator, UpgradeSchedule};

impl Migrator for MigrationEngine {
    fn run_migrations(
        &self,
        ctx: &mut ExecContext<'_>,
        from: AppVersion,
        to: AppVersion,
    ) -> ModuleResult<()> {
        MigrationEngine::run_migrations(self, ctx, from, to)
    }
}

impl<V: ValidatorSetProvider> UpgradeSchedule for UpgradeCoordinator<V> {
    fn due_upgrade(
        &self,
        store: &StateStore,
        height: Height,
    ) -> SignalResult<Option<PendingUpgrade>> {
        self.should_upgrade(&store.namespace(SIGNAL_NAMESPACE), height)
    }

    fn complete_upgrade(
        &self,
        store: &mut StateStore,
        activated: AppVersion,
    ) -> SignalResult<usize> {
        self.reset_tally(&mut store.namespace_mut(SIGNAL_NAMESPACE), activated)
    }
}

/// Schedule for chains that never upgrade through signalling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpgrades;

impl UpgradeSchedule for NoUpgrades {
    fn due_upgrade(
        &self,
        _store: &StateStore,
        _height: Height,
    ) -> SignalResult<Option<PendingUpgrade>> {
        Ok(None)
    }

    fn complete_upgrade(
        &self,
        _store: &mut StateStore,
        _activated: AppVersion,
    ) -> SignalResult<usize> {
        Ok(0)
    }
}
