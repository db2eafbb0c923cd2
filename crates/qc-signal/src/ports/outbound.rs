//! Outbound ports: dependencies supplied by the host node.

use shared_types::{Tx, TxResult, ValidatorAddress};

/// Live view of the active validator set.
///
/// Must reflect the set at the height being executed so every replica
/// computes the same tally.
pub trait ValidatorSetProvider: Send + Sync {
    /// Bonded power of an active validator, `None` if not in the set.
    fn validator_power(&self, validator: &ValidatorAddress) -> Option<u64>;

    /// Sum of the power of every active validator.
    fn total_power(&self) -> u64;
}

/// Hands signed transactions to the node's transaction pipeline.
pub trait TxSubmitter: Send + Sync {
    fn submit(&self, tx: Tx) -> Result<TxResult, String>;
}
