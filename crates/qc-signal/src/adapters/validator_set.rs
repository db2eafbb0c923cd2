//! In-memory validator set for tests and single-process networks.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use shared_types::{ValidatorAddress, ValidatorUpdate};

use crate::ports::ValidatorSetProvider;

#[derive(Default)]
pub struct InMemoryValidatorSet {
    powers: RwLock<BTreeMap<ValidatorAddress, u64>>,
}

impl InMemoryValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_powers(powers: impl IntoIterator<Item = (ValidatorAddress, u64)>) -> Self {
        Self {
            powers: RwLock::new(powers.into_iter().collect()),
        }
    }

    pub fn set_power(&self, validator: ValidatorAddress, power: u64) {
        self.powers.write().insert(validator, power);
    }

    pub fn remove(&self, validator: &ValidatorAddress) {
        self.powers.write().remove(validator);
    }

    /// Apply updates emitted by a module; zero power removes the validator.
    pub fn apply_updates(&self, updates: &[ValidatorUpdate]) {
        let mut powers = self.powers.write();
        for update in updates {
            if update.power == 0 {
                powers.remove(&update.address);
            } else {
                powers.insert(update.address, update.power);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.powers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.read().is_empty()
    }
}

impl ValidatorSetProvider for InMemoryValidatorSet {
    fn validator_power(&self, validator: &ValidatorAddress) -> Option<u64> {
        self.powers.read().get(validator).copied()
    }

    fn total_power(&self) -> u64 {
        self.powers
            .read()
            .values()
            .fold(0u64, |acc, power| acc.saturating_add(*power))
    }
}
