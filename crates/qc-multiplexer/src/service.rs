//! Multiplexer - routes execution to the active versioned state machine and
//! performs cutovers at agreed activation heights.

use std::sync::Arc;

use parking_lot::RwLock;
use quantum_telemetry::{
    time_histogram, ACTIVE_APP_VERSION, CUTOVERS, MIGRATION_DURATION, MIGRATION_FAILURES,
    MULTIPLEXER_HALTED,
};
use shared_types::{
    AppHash, AppVersion, BlockHeader, ExecContext, GenesisState, Height, StateStore, Tx,
    TxResult, ValidatorUpdate,
};
use tracing::{debug, error, info, info_span, warn};

use crate::domain::{
    read_app_version, write_app_version, BlockOutcome, MultiplexerStatus, Versions,
    MULTIPLEXER_NAMESPACE,
};
use crate::error::{MultiplexerError, MultiplexerResult};
use crate::ports::{Migrator, StateMachine, UpgradeSchedule};
use crate::query::QueryHandle;

/// Multiplexer configuration
#[derive(Clone, Debug)]
pub struct MultiplexerConfig {
    /// App version a fresh chain starts at
    pub genesis_version: AppVersion,
    pub chain_id: String,
    /// Refuse to execute this height or any later one
    pub halt_height: Option<Height>,
    /// Refuse to execute blocks whose time is at or past this timestamp
    pub halt_time: Option<u64>,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            genesis_version: 1,
            chain_id: "qc-local".to_string(),
            halt_height: None,
            halt_time: None,
        }
    }
}

/// Owns the replicated store and the bindings for every supported version.
///
/// Block execution is single-writer: every mutating call takes `&mut self`.
/// Concurrent readers use [`Multiplexer::query_handle`].
pub struct Multiplexer {
    config: MultiplexerConfig,
    bindings: Versions<Arc<dyn StateMachine>>,
    migrator: Arc<dyn Migrator>,
    schedule: Arc<dyn UpgradeSchedule>,
    store: StateStore,
    active_version: AppVersion,
    /// Height finalized but not yet committed.
    in_block: Option<Height>,
    status: Arc<RwLock<MultiplexerStatus>>,
}

impl Multiplexer {
    /// Resume from `store`'s committed state, or start a fresh chain at the
    /// configured genesis version.
    pub fn new(
        config: MultiplexerConfig,
        bindings: Versions<Arc<dyn StateMachine>>,
        migrator: Arc<dyn Migrator>,
        schedule: Arc<dyn UpgradeSchedule>,
        store: StateStore,
    ) -> MultiplexerResult<Self> {
        let persisted =
            read_app_version(&store.last_committed().namespace(MULTIPLEXER_NAMESPACE))?;
        let active_version = persisted.unwrap_or(config.genesis_version);
        if !bindings.contains(active_version) {
            return Err(MultiplexerError::NoBinding {
                version: active_version,
            });
        }
        info!(
            chain_id = %config.chain_id,
            active_version,
            committed_height = store.committed_height(),
            resumed = persisted.is_some(),
            "Multiplexer started"
        );
        ACTIVE_APP_VERSION.set(active_version as f64);
        MULTIPLEXER_HALTED.set(0.0);
        Ok(Self {
            config,
            bindings,
            migrator,
            schedule,
            store,
            active_version,
            in_block: None,
            status: Arc::new(RwLock::new(MultiplexerStatus::Running)),
        })
    }

    pub fn config(&self) -> &MultiplexerConfig {
        &self.config
    }

    pub fn active_version(&self) -> AppVersion {
        self.active_version
    }

    pub fn status(&self) -> MultiplexerStatus {
        self.status.read().clone()
    }

    pub fn is_halted(&self) -> bool {
        self.status.read().is_halted()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn committed_height(&self) -> Height {
        self.store.committed_height()
    }

    /// Read-only handle over committed state, safe to use from other threads.
    pub fn query_handle(&self) -> QueryHandle {
        QueryHandle::new(
            self.bindings.clone(),
            self.store.reader(),
            Arc::clone(&self.status),
            self.config.genesis_version,
        )
    }

    pub fn query(&self, path: &str, data: &[u8]) -> MultiplexerResult<Vec<u8>> {
        self.query_handle().query(path, data)
    }

    /// Export committed state of the version active at the last commit.
    pub fn export_genesis(&self) -> MultiplexerResult<GenesisState> {
        self.query_handle().export_genesis()
    }

    fn ensure_running(&self) -> MultiplexerResult<()> {
        match &*self.status.read() {
            MultiplexerStatus::Running => Ok(()),
            MultiplexerStatus::Halted { height, reason } => Err(MultiplexerError::Halted {
                height: *height,
                reason: reason.clone(),
            }),
        }
    }

    fn halt(&mut self, height: Height, err: MultiplexerError) -> MultiplexerError {
        let reason = err.to_string();
        error!(height, %reason, "Fatal error, halting block execution");
        MULTIPLEXER_HALTED.set(1.0);
        *self.status.write() = MultiplexerStatus::Halted {
            height,
            reason: reason.clone(),
        };
        MultiplexerError::Halted { height, reason }
    }

    /// Operator-requested stop, checked before anything executes at `height`.
    fn check_halt_conditions(&self, height: Height, time: u64) -> MultiplexerResult<()> {
        if let Some(halt_height) = self.config.halt_height {
            if height >= halt_height {
                return Err(MultiplexerError::HaltRequested {
                    height,
                    condition: format!("halt height {halt_height}"),
                });
            }
        }
        if let Some(halt_time) = self.config.halt_time {
            if time >= halt_time {
                return Err(MultiplexerError::HaltRequested {
                    height,
                    condition: format!("halt time {halt_time}"),
                });
            }
        }
        Ok(())
    }

    fn binding(&self, version: AppVersion) -> MultiplexerResult<Arc<dyn StateMachine>> {
        self.bindings
            .get(version)
            .cloned()
            .ok_or(MultiplexerError::NoBinding { version })
    }

    fn header(&self, height: Height, time: u64) -> BlockHeader {
        BlockHeader {
            chain_id: self.config.chain_id.clone(),
            height,
            app_version: self.active_version,
            time,
        }
    }

    /// Apply genesis at the configured genesis version.
    pub fn init_chain(
        &mut self,
        genesis: &GenesisState,
        time: u64,
    ) -> MultiplexerResult<Vec<ValidatorUpdate>> {
        self.ensure_running()?;
        let persisted = read_app_version(&self.store.namespace(MULTIPLEXER_NAMESPACE))?;
        if persisted.is_some() || self.store.committed_height() > 0 {
            return Err(MultiplexerError::AlreadyInitialized);
        }

        let version = self.active_version;
        let machine = self.binding(version)?;
        let header = self.header(0, time);
        let mut ctx = ExecContext::new(header, &mut self.store);
        let result = machine.init_chain(&mut ctx, genesis);
        match result {
            Ok(updates) => {
                write_app_version(&mut self.store, version);
                info!(version, validators = updates.len(), "Chain initialized");
                Ok(updates)
            }
            Err(err) => Err(self.halt(0, err.into())),
        }
    }

    /// Execute one height: cutover if due, then pre-block, transactions and
    /// post-block on the active version's state machine.
    pub fn finalize_block(
        &mut self,
        height: Height,
        time: u64,
        txs: &[Tx],
    ) -> MultiplexerResult<BlockOutcome> {
        self.ensure_running()?;
        if let Some(open) = self.in_block {
            return Err(MultiplexerError::Sequence(format!(
                "height {open} finalized but not committed"
            )));
        }
        let expected = self.store.committed_height() + 1;
        if height != expected {
            return Err(MultiplexerError::UnexpectedHeight {
                expected,
                actual: height,
            });
        }
        let _span = info_span!("finalize_block", height).entered();

        if let Err(err) = self.check_halt_conditions(height, time) {
            return Err(self.halt(height, err));
        }
        let upgraded = match self.maybe_cutover(height, time) {
            Ok(upgraded) => upgraded,
            Err(err) => return Err(self.halt(height, err)),
        };
        let machine = match self.binding(self.active_version) {
            Ok(machine) => machine,
            Err(err) => return Err(self.halt(height, err)),
        };

        let header = self.header(height, time);
        let result = execute_block(machine.as_ref(), header, &mut self.store, txs);
        match result {
            Ok((tx_results, validator_updates)) => {
                self.in_block = Some(height);
                debug!(
                    txs = tx_results.len(),
                    failed = tx_results.iter().filter(|r| !r.is_ok()).count(),
                    "Block executed"
                );
                Ok(BlockOutcome {
                    height,
                    app_version: self.active_version,
                    tx_results,
                    validator_updates,
                    upgraded,
                })
            }
            Err(err) => Err(self.halt(height, err)),
        }
    }

    /// Run the cutover if an upgrade is due at `height`.
    fn maybe_cutover(
        &mut self,
        height: Height,
        time: u64,
    ) -> MultiplexerResult<Option<(AppVersion, AppVersion)>> {
        let Some(pending) = self.schedule.due_upgrade(&self.store, height)? else {
            return Ok(None);
        };
        let from = self.active_version;
        let to = pending.app_version;
        if to <= from {
            // Versions only move forward; drop the stale schedule instead of cutting over.
            warn!(
                height,
                from, to, "Ignoring pending upgrade that is not above the active version"
            );
            self.schedule.complete_upgrade(&mut self.store, from)?;
            return Ok(None);
        }
        if self.store.is_dirty() {
            return Err(MultiplexerError::UncommittedState { height });
        }
        if !self.bindings.contains(to) {
            return Err(MultiplexerError::NoBinding { version: to });
        }
        if height > pending.activation_height {
            warn!(
                height,
                activation_height = pending.activation_height,
                "Cutover is late"
            );
        }
        info!(height, from, to, "Activating app version");

        let header = BlockHeader {
            app_version: to,
            ..self.header(height, time)
        };
        {
            let _timer = time_histogram!(MIGRATION_DURATION);
            let mut ctx = ExecContext::new(header, &mut self.store);
            if let Err(err) = self.migrator.run_migrations(&mut ctx, from, to) {
                MIGRATION_FAILURES.inc();
                return Err(err.into());
            }
        }
        write_app_version(&mut self.store, to);
        let cleared = self.schedule.complete_upgrade(&mut self.store, to)?;

        self.active_version = to;
        CUTOVERS.inc();
        ACTIVE_APP_VERSION.set(to as f64);
        info!(height, from, to, cleared_signals = cleared, "App version activated");
        Ok(Some((from, to)))
    }

    /// Publish the finalized height and return its app hash.
    pub fn commit(&mut self) -> MultiplexerResult<AppHash> {
        self.ensure_running()?;
        let Some(height) = self.in_block.take() else {
            return Err(MultiplexerError::Sequence(
                "commit without a finalized block".to_string(),
            ));
        };
        match self.store.commit(height) {
            Ok(app_hash) => {
                info!(height, app_version = self.active_version, "Block committed");
                Ok(app_hash)
            }
            Err(err) => Err(self.halt(height, err.into())),
        }
    }
}

/// Hooks and transactions for one height. Fatal module errors abort; other
/// transaction failures are rolled back and reported.
fn execute_block(
    machine: &dyn StateMachine,
    header: BlockHeader,
    store: &mut StateStore,
    txs: &[Tx],
) -> MultiplexerResult<(Vec<TxResult>, Vec<ValidatorUpdate>)> {
    let mut ctx = ExecContext::new(header, store);
    machine.pre_block(&mut ctx)?;

    let mut results = Vec::with_capacity(txs.len());
    for tx in txs {
        let checkpoint = ctx.store().checkpoint();
        match machine.deliver_tx(&mut ctx, tx) {
            Ok(data) => {
                ctx.store().release(checkpoint)?;
                results.push(TxResult::ok(data));
            }
            Err(err) if err.is_fatal() => {
                ctx.store().rollback(checkpoint)?;
                return Err(err.into());
            }
            Err(err) => {
                ctx.store().rollback(checkpoint)?;
                debug!(type_url = %tx.type_url, code = err.code(), error = %err, "Transaction failed");
                results.push(TxResult::failed(err.code(), err.to_string()));
            }
        }
    }

    let updates = machine.post_block(&mut ctx)?;
    Ok((results, updates))
}
