//! Persisted active version, block outcomes and run status.

use shared_types::{
    decode_u64, encode_u64, AppVersion, Height, KvRead, KvStore, StateStore, StoreError, TxResult,
    ValidatorUpdate,
};

pub const MULTIPLEXER_NAMESPACE: &str = "multiplexer";

/// Key holding the active app version (8-byte big-endian).
pub const APP_VERSION_KEY: &[u8] = b"app_version";

pub fn read_app_version<S: KvRead + ?Sized>(state: &S) -> Result<Option<AppVersion>, StoreError> {
    state
        .get(APP_VERSION_KEY)
        .map(|raw| decode_u64(state.namespace(), APP_VERSION_KEY, raw))
        .transpose()
}

pub fn write_app_version(store: &mut StateStore, version: AppVersion) {
    store
        .namespace_mut(MULTIPLEXER_NAMESPACE)
        .set(APP_VERSION_KEY, encode_u64(version).to_vec());
}

/// Result of executing one height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub height: Height,
    /// Version the block executed under (after any cutover at this height).
    pub app_version: AppVersion,
    pub tx_results: Vec<TxResult>,
    pub validator_updates: Vec<ValidatorUpdate>,
    /// `(from, to)` when this height activated an upgrade.
    pub upgraded: Option<(AppVersion, AppVersion)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MultiplexerStatus {
    #[default]
    Running,
    /// A fatal error stopped block execution; there is no in-process recovery.
    Halted { height: Height, reason: String },
}

impl MultiplexerStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }
}
