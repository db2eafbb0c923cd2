//! Read-only access to committed state.

use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{AppVersion, GenesisState, SnapshotReader, StateSnapshot};

use crate::domain::{read_app_version, MultiplexerStatus, Versions, MULTIPLEXER_NAMESPACE};
use crate::error::{MultiplexerError, MultiplexerResult};
use crate::ports::StateMachine;

/// Queries the last committed snapshot through the binding for the version
/// that snapshot was committed under. Never observes in-block writes.
#[derive(Clone)]
pub struct QueryHandle {
    bindings: Versions<Arc<dyn StateMachine>>,
    reader: SnapshotReader,
    status: Arc<RwLock<MultiplexerStatus>>,
    genesis_version: AppVersion,
}

impl QueryHandle {
    pub(crate) fn new(
        bindings: Versions<Arc<dyn StateMachine>>,
        reader: SnapshotReader,
        status: Arc<RwLock<MultiplexerStatus>>,
        genesis_version: AppVersion,
    ) -> Self {
        Self {
            bindings,
            reader,
            status,
            genesis_version,
        }
    }

    pub fn status(&self) -> MultiplexerStatus {
        self.status.read().clone()
    }

    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.reader.latest()
    }

    /// App version recorded in the committed snapshot.
    pub fn app_version(&self) -> MultiplexerResult<AppVersion> {
        Self::version_of(&self.reader.latest(), self.genesis_version)
    }

    fn version_of(snapshot: &StateSnapshot, fallback: AppVersion) -> MultiplexerResult<AppVersion> {
        Ok(read_app_version(&snapshot.namespace(MULTIPLEXER_NAMESPACE))?.unwrap_or(fallback))
    }

    fn resolve(
        &self,
    ) -> MultiplexerResult<(Arc<StateSnapshot>, AppVersion, &Arc<dyn StateMachine>)> {
        let snapshot = self.reader.latest();
        let version = Self::version_of(&snapshot, self.genesis_version)?;
        let machine = self
            .bindings
            .get(version)
            .ok_or(MultiplexerError::NoBinding { version })?;
        Ok((snapshot, version, machine))
    }

    pub fn query(&self, path: &str, data: &[u8]) -> MultiplexerResult<Vec<u8>> {
        let (snapshot, version, machine) = self.resolve()?;
        Ok(machine.query(&snapshot, version, path, data)?)
    }

    pub fn export_genesis(&self) -> MultiplexerResult<GenesisState> {
        let (snapshot, version, machine) = self.resolve()?;
        Ok(machine.export_genesis(&snapshot, version)?)
    }
}
