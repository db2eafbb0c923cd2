//! Pending upgrades and version tallies.

use serde::{Deserialize, Serialize};
use shared_types::{AppVersion, Height, ValidatorAddress};

/// An agreed version switch scheduled for a concrete height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpgrade {
    pub app_version: AppVersion,
    pub activation_height: Height,
}

impl PendingUpgrade {
    pub fn is_due(&self, height: Height) -> bool {
        height >= self.activation_height
    }
}

/// Voting power behind one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VersionTally {
    pub voting_power: u64,
    pub threshold: u64,
    pub total_voting_power: u64,
}

impl VersionTally {
    pub fn has_quorum(&self) -> bool {
        self.total_voting_power > 0 && self.voting_power >= self.threshold
    }
}

/// `ceil(total * numerator / denominator)` without overflow.
pub fn quorum_threshold(total: u64, numerator: u64, denominator: u64) -> u64 {
    let denominator = u128::from(denominator.max(1));
    let scaled = u128::from(total) * u128::from(numerator);
    let threshold = scaled.div_ceil(denominator);
    u64::try_from(threshold).unwrap_or(u64::MAX)
}

/// Genesis payload of the signal module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignalGenesis {
    #[serde(default)]
    pub signals: Vec<GenesisSignal>,
    #[serde(default)]
    pub pending_upgrade: Option<PendingUpgrade>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisSignal {
    pub validator: ValidatorAddress,
    pub version: AppVersion,
}
