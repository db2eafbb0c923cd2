//! Outbound ports: what the multiplexer drives.

use qc_modules::ModuleResult;
use qc_signal::{PendingUpgrade, SignalResult};
use shared_types::{
    AppVersion, ExecContext, GenesisState, Height, StateSnapshot, StateStore, Tx, ValidatorUpdate,
};

/// One versioned state machine.
///
/// Implementations hold no replicated state of their own; everything they
/// persist goes through the context, so the multiplexer can hand the same
/// store to the next version after a cutover.
pub trait StateMachine: Send + Sync {
    /// Apply genesis; must produce the initial validator set.
    fn init_chain(
        &self,
        ctx: &mut ExecContext<'_>,
        genesis: &GenesisState,
    ) -> ModuleResult<Vec<ValidatorUpdate>>;

    fn pre_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<()>;

    /// Execute one transaction. Non-fatal errors fail only this transaction.
    fn deliver_tx(&self, ctx: &mut ExecContext<'_>, tx: &Tx) -> ModuleResult<Vec<u8>>;

    fn post_block(&self, ctx: &mut ExecContext<'_>) -> ModuleResult<Vec<ValidatorUpdate>>;

    /// Read-only query against a committed snapshot.
    fn query(
        &self,
        snapshot: &StateSnapshot,
        version: AppVersion,
        path: &str,
        data: &[u8],
    ) -> ModuleResult<Vec<u8>>;

    fn export_genesis(
        &self,
        snapshot: &StateSnapshot,
        version: AppVersion,
    ) -> ModuleResult<GenesisState>;
}

/// Runs state migrations for a version transition.
pub trait Migrator: Send + Sync {
    fn run_migrations(
        &self,
        ctx: &mut ExecContext<'_>,
        from: AppVersion,
        to: AppVersion,
    ) -> ModuleResult<()>;
}

/// Source of agreed activation heights.
pub trait UpgradeSchedule: Send + Sync {
    /// The pending upgrade, if `height` has reached its activation height.
    fn due_upgrade(&self, store: &StateStore, height: Height) -> SignalResult<Option<PendingUpgrade>>;

    /// Clear the pending upgrade and every signal `<= activated`.
    fn complete_upgrade(&self, store: &mut StateStore, activated: AppVersion)
        -> SignalResult<usize>;
}
