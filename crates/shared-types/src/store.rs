//! # Replicated Key-Value State
//!
//! Namespaced, ordered key-value state with three properties the upgrade path
//! depends on:
//!
//! - **Deterministic iteration**: every namespace is a `BTreeMap`, so scans are
//!   in ascending key order on every replica.
//! - **Checkpoint/rollback**: a failed transaction is rolled back through the
//!   write journal and never mutates state.
//! - **Snapshot isolation**: `commit` publishes an immutable [`StateSnapshot`];
//!   concurrent readers hold a [`SnapshotReader`] and never see in-block writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::entities::{AppHash, AppVersion, BlockHeader, Height};
use crate::errors::StoreError;

type Namespace = BTreeMap<Vec<u8>, Vec<u8>>;
type Tree = BTreeMap<String, Namespace>;

/// Read access to a single namespace.
pub trait KvRead {
    /// Name of the namespace this view reads from.
    fn namespace(&self) -> &str;

    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    /// All entries in ascending key order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Write access to a single namespace.
pub trait KvStore: KvRead {
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// Delete every entry matching `pred`, returning how many were removed.
    fn delete_where(&mut self, pred: &dyn Fn(&[u8], &[u8]) -> bool) -> usize {
        let doomed: Vec<Vec<u8>> = self
            .iter()
            .filter(|(k, v)| pred(k, v))
            .map(|(k, _)| k.to_vec())
            .collect();
        for key in &doomed {
            self.delete(key);
        }
        doomed.len()
    }
}

/// Encode a version or height as 8 big-endian bytes.
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decode an 8-byte big-endian value, reporting where a corrupt value lives.
pub fn decode_u64(namespace: &str, key: &[u8], bytes: &[u8]) -> Result<u64, StoreError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Decode {
        namespace: namespace.to_string(),
        key: hex::encode(key),
        reason: format!("expected 8 bytes, found {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Immutable state as of the end of a committed height.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    height: Height,
    tree: Tree,
    app_hash: AppHash,
}

impl StateSnapshot {
    fn new(height: Height, tree: Tree) -> Self {
        let app_hash = compute_app_hash(&tree);
        Self {
            height,
            tree,
            app_hash,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn app_hash(&self) -> AppHash {
        self.app_hash
    }

    pub fn namespace<'a>(&'a self, name: &'a str) -> NamespaceView<'a> {
        NamespaceView {
            name,
            entries: self.tree.get(name),
        }
    }
}

/// Cloneable handle to the latest committed snapshot.
#[derive(Clone)]
pub struct SnapshotReader {
    latest: Arc<RwLock<Arc<StateSnapshot>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Arc<StateSnapshot> {
        self.latest.read().clone()
    }
}

/// Read-only view over one namespace of a snapshot (or of working state).
pub struct NamespaceView<'a> {
    name: &'a str,
    entries: Option<&'a Namespace>,
}

impl KvRead for NamespaceView<'_> {
    fn namespace(&self) -> &str {
        self.name
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries?.get(key).map(Vec::as_slice)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_> {
        match self.entries {
            Some(map) => Box::new(map.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))),
            None => Box::new(std::iter::empty()),
        }
    }
}

// =============================================================================
// WORKING STATE
// =============================================================================

struct JournalEntry {
    namespace: String,
    key: Vec<u8>,
    previous: Option<Vec<u8>>,
}

/// Marker returned by [`StateStore::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCheckpoint {
    depth: usize,
    journal_len: usize,
}

/// Working state for the height currently executing.
pub struct StateStore {
    working: Tree,
    journal: Vec<JournalEntry>,
    checkpoints: Vec<usize>,
    committed: Arc<RwLock<Arc<StateSnapshot>>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Empty state with an empty committed snapshot at height 0.
    pub fn new() -> Self {
        Self::restore(&StateSnapshot::new(0, Tree::new()))
    }

    /// Reopen state from a previously committed snapshot.
    pub fn restore(snapshot: &StateSnapshot) -> Self {
        Self {
            working: snapshot.tree.clone(),
            journal: Vec::new(),
            checkpoints: Vec::new(),
            committed: Arc::new(RwLock::new(Arc::new(snapshot.clone()))),
        }
    }

    pub fn namespace<'a>(&'a self, name: &'a str) -> NamespaceView<'a> {
        NamespaceView {
            name,
            entries: self.working.get(name),
        }
    }

    pub fn namespace_mut(&mut self, name: &str) -> NamespaceMut<'_> {
        NamespaceMut {
            store: self,
            name: name.to_string(),
        }
    }

    fn write(&mut self, namespace: &str, key: &[u8], value: Option<Vec<u8>>) {
        let entries = self.working.entry(namespace.to_string()).or_default();
        let previous = match value {
            Some(v) => entries.insert(key.to_vec(), v),
            None => match entries.remove(key) {
                Some(old) => Some(old),
                None => return,
            },
        };
        self.journal.push(JournalEntry {
            namespace: namespace.to_string(),
            key: key.to_vec(),
            previous,
        });
    }

    /// Open a nested checkpoint. Must be closed by `rollback` or `release`.
    pub fn checkpoint(&mut self) -> StateCheckpoint {
        let journal_len = self.journal.len();
        self.checkpoints.push(journal_len);
        StateCheckpoint {
            depth: self.checkpoints.len() - 1,
            journal_len,
        }
    }

    fn close(&mut self, checkpoint: StateCheckpoint) -> Result<(), StoreError> {
        if self.checkpoints.len() != checkpoint.depth + 1 {
            return Err(StoreError::CheckpointOrder {
                requested: checkpoint.depth,
            });
        }
        self.checkpoints.pop();
        Ok(())
    }

    /// Undo every write made since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: StateCheckpoint) -> Result<(), StoreError> {
        self.close(checkpoint)?;
        while self.journal.len() > checkpoint.journal_len {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            let entries = self.working.entry(entry.namespace).or_default();
            match entry.previous {
                Some(v) => {
                    entries.insert(entry.key, v);
                }
                None => {
                    entries.remove(&entry.key);
                }
            }
        }
        Ok(())
    }

    /// Keep every write made since `checkpoint`.
    pub fn release(&mut self, checkpoint: StateCheckpoint) -> Result<(), StoreError> {
        self.close(checkpoint)
    }

    /// True if anything was written since the last commit.
    pub fn is_dirty(&self) -> bool {
        !self.journal.is_empty()
    }

    /// Height of the last committed snapshot.
    pub fn committed_height(&self) -> Height {
        self.committed.read().height
    }

    /// Publish working state as the snapshot for `height`.
    pub fn commit(&mut self, height: Height) -> Result<AppHash, StoreError> {
        if let Some(depth) = self.checkpoints.len().checked_sub(1) {
            return Err(StoreError::CheckpointOrder { requested: depth });
        }
        self.working.retain(|_, entries| !entries.is_empty());
        let snapshot = StateSnapshot::new(height, self.working.clone());
        let app_hash = snapshot.app_hash;
        *self.committed.write() = Arc::new(snapshot);
        let writes = self.journal.len();
        self.journal.clear();
        debug!(height, writes, app_hash = %hex::encode(app_hash), "State committed");
        Ok(app_hash)
    }

    pub fn last_committed(&self) -> Arc<StateSnapshot> {
        self.committed.read().clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            latest: Arc::clone(&self.committed),
        }
    }
}

/// Mutable view over one namespace of working state.
pub struct NamespaceMut<'a> {
    store: &'a mut StateStore,
    name: String,
}

impl KvRead for NamespaceMut<'_> {
    fn namespace(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.store
            .working
            .get(&self.name)?
            .get(key)
            .map(Vec::as_slice)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_> {
        match self.store.working.get(&self.name) {
            Some(map) => Box::new(map.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl KvStore for NamespaceMut<'_> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        let name = self.name.clone();
        self.store.write(&name, key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        let name = self.name.clone();
        self.store.write(&name, key, None);
    }
}

fn compute_app_hash(tree: &Tree) -> AppHash {
    let mut hasher = Sha256::new();
    for (namespace, entries) in tree {
        for (key, value) in entries {
            for part in [namespace.as_bytes(), key.as_slice(), value.as_slice()] {
                hasher.update((part.len() as u32).to_be_bytes());
                hasher.update(part);
            }
        }
    }
    hasher.finalize().into()
}

// =============================================================================
// EXECUTION CONTEXT
// =============================================================================

/// Everything a module sees while executing one height.
pub struct ExecContext<'a> {
    header: BlockHeader,
    store: &'a mut StateStore,
}

impl<'a> ExecContext<'a> {
    pub fn new(header: BlockHeader, store: &'a mut StateStore) -> Self {
        Self { header, store }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn height(&self) -> Height {
        self.header.height
    }

    pub fn app_version(&self) -> AppVersion {
        self.header.app_version
    }

    pub fn kv(&mut self, namespace: &str) -> NamespaceMut<'_> {
        self.store.namespace_mut(namespace)
    }

    pub fn store(&mut self) -> &mut StateStore {
        self.store
    }
}
