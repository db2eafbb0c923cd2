//! # Quorum Signalling Through Cutover
//!
//! Validators `{40, 1, 59, 20}` (total 120, threshold 100) signal version 2.
//! Quorum lands on the third signal, the fourth is refused while the upgrade
//! is pending, and the multiplexer switches state machines exactly at the
//! activation height.

use super::fixtures::{
    addr, deposit, signal, try_upgrade, validator_powers, Replica, UPGRADE_DELAY,
};
use qc_signal::rpc::PendingUpgradeResponse;
use qc_signal::PendingUpgrade;
use quantum_telemetry::{encode_metrics, register_metrics};
use shared_types::TxResult;

fn scheduled(result: &TxResult) -> Option<PendingUpgrade> {
    assert!(result.is_ok(), "try upgrade failed: {}", result.log);
    let response: PendingUpgradeResponse = serde_json::from_slice(&result.data).unwrap();
    response.upgrade
}

#[test]
fn test_quorum_on_third_signal_then_cutover() {
    // Another test in this process may have registered already
    let _ = register_metrics();
    let mut chain = Replica::start(&validator_powers());

    // 40 -> not enough
    let outcome = chain.block(&[signal(addr(1), 2), try_upgrade(addr(1))]);
    assert!(outcome.tx_results[0].is_ok());
    assert_eq!(scheduled(&outcome.tx_results[1]), None);
    let tally = chain.tally(2);
    assert_eq!(tally.voting_power, 40);
    assert_eq!(tally.threshold, 100);
    assert_eq!(tally.total_voting_power, 120);

    // 40 + 59 = 99 -> one short
    let outcome = chain.block(&[signal(addr(3), 2), try_upgrade(addr(3))]);
    assert_eq!(scheduled(&outcome.tx_results[1]), None);
    assert_eq!(chain.tally(2).voting_power, 99);
    assert!(!chain.tally(2).has_quorum());
    assert_eq!(chain.pending(), None);

    // + 1 = 100 -> quorum
    let outcome = chain.block(&[signal(addr(2), 2), try_upgrade(addr(2))]);
    let expected = PendingUpgrade {
        app_version: 2,
        activation_height: 3 + UPGRADE_DELAY,
    };
    assert_eq!(scheduled(&outcome.tx_results[1]), Some(expected));
    assert_eq!(chain.pending(), Some(expected));

    // fourth validator is too late
    let outcome = chain.block(&[signal(addr(4), 2), deposit()]);
    assert_eq!(outcome.tx_results[0].code, 2);
    assert!(outcome.tx_results[1].is_ok());
    assert_eq!(chain.tally(2).voting_power, 100);

    let outcome = chain.block(&[deposit()]);
    assert_eq!(outcome.height, 5);
    assert_eq!(outcome.app_version, 1);
    assert_eq!(outcome.upgraded, None);
    assert_eq!(chain.balance(), 2);

    let outcome = chain.block(&[deposit()]);
    assert_eq!(outcome.height, expected.activation_height);
    assert_eq!(outcome.app_version, 2);
    assert_eq!(outcome.upgraded, Some((1, 2)));
    assert_eq!(chain.mux.active_version(), 2);
    assert_eq!(chain.mux.query_handle().app_version().unwrap(), 2);

    // migrated 2 units to 200 cents, then one cv2 deposit
    assert_eq!(chain.balance(), 300);
    // audit was added by the upgrade and ran its post-block hook once
    assert_eq!(chain.audited_blocks(), 1);
    // tally reset on activation
    assert_eq!(chain.pending(), None);
    assert_eq!(chain.tally(2).voting_power, 0);

    let exported = encode_metrics().unwrap();
    assert!(exported.contains("qc_upgrade_cutovers_total"));
    assert!(exported.contains("qc_upgrade_pending_total"));
}

#[test]
fn test_signal_window_follows_active_version() {
    let mut chain = Replica::start(&validator_powers());

    let outcome = chain.block(&[signal(addr(1), 3), signal(addr(1), 0), signal(addr(1), 1)]);
    assert_eq!(outcome.tx_results[0].code, 3);
    assert_eq!(outcome.tx_results[1].code, 3);
    assert!(outcome.tx_results[2].is_ok());

    // an overwrite, never an accumulation
    chain.block(&[signal(addr(1), 2), signal(addr(1), 2)]);
    assert_eq!(chain.tally(1).voting_power, 0);
    assert_eq!(chain.tally(2).voting_power, 40);

    // unknown signer
    let outcome = chain.block(&[signal(addr(9), 2)]);
    assert_eq!(outcome.tx_results[0].code, 5);
}

#[test]
fn test_quorum_on_current_version_is_not_an_upgrade() {
    let mut chain = Replica::start(&validator_powers());
    let txs: Vec<_> = validator_powers()
        .into_iter()
        .map(|(validator, _)| signal(validator, 1))
        .chain(std::iter::once(try_upgrade(addr(1))))
        .collect();

    let outcome = chain.block(&txs);
    assert_eq!(outcome.tx_results.last().unwrap().code, 4);
    assert_eq!(chain.pending(), None);
}

#[test]
fn test_removed_validator_leaves_the_tally() {
    let mut chain = Replica::start(&validator_powers());
    chain.block(&[signal(addr(1), 2), signal(addr(3), 2)]);
    assert_eq!(chain.tally(2).voting_power, 99);

    chain.validators.remove(&addr(3));
    let tally = chain.tally(2);
    assert_eq!(tally.voting_power, 40);
    assert_eq!(tally.total_voting_power, 61);
    assert_eq!(tally.threshold, 51);

    // 40 + 1 = 41 of 61 is still short of 51
    let outcome = chain.block(&[signal(addr(2), 2), try_upgrade(addr(1))]);
    assert_eq!(scheduled(&outcome.tx_results[1]), None);

    // 41 + 20 = 61 reaches it
    let outcome = chain.block(&[signal(addr(4), 2), try_upgrade(addr(1))]);
    assert_eq!(
        scheduled(&outcome.tx_results[1]).map(|p| p.app_version),
        Some(2)
    );
}

#[test]
fn test_export_after_upgrade_uses_new_module_set() {
    let mut chain = Replica::start(&validator_powers());
    chain.block(&[
        deposit(),
        signal(addr(1), 2),
        signal(addr(3), 2),
        signal(addr(4), 2),
        try_upgrade(addr(1)),
    ]);
    while chain.mux.active_version() == 1 {
        chain.block(&[]);
    }
    assert_eq!(chain.height(), 1 + UPGRADE_DELAY);

    let exported = chain.mux.export_genesis().unwrap();
    assert_eq!(exported["ledger"], 100u64.to_be_bytes().to_vec());
    assert!(exported.contains_key("audit"));
    let validators: Vec<shared_types::ValidatorUpdate> =
        serde_json::from_slice(&exported["validators"]).unwrap();
    assert_eq!(validators.len(), 4);
}
