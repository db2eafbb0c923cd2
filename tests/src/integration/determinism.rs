//! # Replica Determinism
//!
//! Independently constructed replicas fed the same blocks must agree on
//! every app hash and cut over at the same height, whatever order the
//! validators signal in.

use proptest::prelude::*;
use shared_types::{Height, ValidatorAddress};

use super::fixtures::{deposit, signal, try_upgrade, validator_powers, Replica, UPGRADE_DELAY};

/// One signal plus a try-upgrade per block, in `order`, then empty blocks
/// until `until`.
fn run(order: &[(ValidatorAddress, u64)], until: Height) -> (Replica, Option<Height>) {
    let mut replica = Replica::start(&validator_powers());
    let mut cutover = None;
    for height in 1..=until {
        let txs = match order.get(height as usize - 1) {
            Some((validator, _)) => vec![signal(*validator, 2), try_upgrade(*validator), deposit()],
            None => vec![deposit()],
        };
        let outcome = replica.block(&txs);
        if outcome.upgraded.is_some() {
            cutover = Some(outcome.height);
        }
    }
    (replica, cutover)
}

/// Height of the block whose signal brings cumulative power to 100.
fn quorum_height(order: &[(ValidatorAddress, u64)]) -> Height {
    let mut power = 0;
    for (index, (_, p)) in order.iter().enumerate() {
        power += p;
        if power >= 100 {
            return index as Height + 1;
        }
    }
    unreachable!("all four validators hold 120")
}

#[test]
fn test_replicas_agree_on_every_hash() {
    let order = validator_powers();
    let (a, cutover_a) = run(&order, 10);
    let (b, cutover_b) = run(&order, 10);

    assert_eq!(a.hashes, b.hashes);
    assert_eq!(cutover_a, cutover_b);
    assert_eq!(cutover_a, Some(quorum_height(&order) + UPGRADE_DELAY));
    assert_eq!(a.balance(), b.balance());
}

#[test]
fn test_diverging_input_changes_hash() {
    let order = validator_powers();
    let (a, _) = run(&order, 3);
    let mut b = Replica::start(&validator_powers());
    b.block(&[signal(order[0].0, 2), try_upgrade(order[0].0), deposit()]);
    b.block(&[signal(order[1].0, 2), try_upgrade(order[1].0), deposit()]);
    b.block(&[]);
    assert_eq!(a.hashes[..2], b.hashes[..2]);
    assert_ne!(a.hashes[2], b.hashes[2]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_cutover_height_is_order_determined(order in Just(validator_powers()).prop_shuffle()) {
        let activation = quorum_height(&order) + UPGRADE_DELAY;
        let (a, cutover_a) = run(&order, activation + 1);
        let (b, cutover_b) = run(&order, activation + 1);

        prop_assert_eq!(&a.hashes, &b.hashes);
        prop_assert_eq!(cutover_a, Some(activation));
        prop_assert_eq!(cutover_b, Some(activation));
        // activation - 1 deposits at 1 unit, scaled, plus two at 100
        prop_assert_eq!(a.balance(), (activation - 1) * 100 + 200);
    }
}
