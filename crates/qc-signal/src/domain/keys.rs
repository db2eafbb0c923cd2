//! Persisted layout of the `signal` namespace.
//!
//! ```text
//! [0x00]              -> bincode(PendingUpgrade)
//! <20-byte address>   -> 8-byte big-endian app version
//! ```
//!
//! Addresses are the only 20-byte keys, so a plain namespace scan yields the
//! signals in ascending address order.

use shared_types::{decode_u64, AppVersion, KvRead, ValidatorAddress, ADDRESS_LEN};

use crate::error::SignalResult;

pub const SIGNAL_NAMESPACE: &str = "signal";

/// Reserved key holding the pending upgrade.
pub const UPGRADE_KEY: &[u8] = &[0x00];

pub fn is_signal_key(key: &[u8]) -> bool {
    key.len() == ADDRESS_LEN
}

/// Every stored signal in ascending address order.
pub(crate) fn stored_signals<S: KvRead + ?Sized>(
    state: &S,
) -> SignalResult<Vec<(ValidatorAddress, AppVersion)>> {
    state
        .iter()
        .filter(|(key, _)| is_signal_key(key))
        .map(|(key, value)| {
            let version = decode_u64(state.namespace(), key, value)?;
            // length checked by is_signal_key
            let mut raw = [0u8; ADDRESS_LEN];
            raw.copy_from_slice(key);
            Ok((ValidatorAddress(raw), version))
        })
        .collect()
}
