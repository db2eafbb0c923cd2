//! # Restart Survival
//!
//! A node rebuilt from its last committed snapshot resumes at the persisted
//! app version and keeps any pending upgrade on schedule.

use std::sync::Arc;

use qc_signal::InMemoryValidatorSet;
use shared_types::StateStore;

use super::fixtures::{
    addr, deposit, signal, try_upgrade, validator_powers, Replica, UPGRADE_DELAY,
};

fn reopen(replica: &Replica) -> Replica {
    let snapshot = replica.mux.store().last_committed();
    Replica::open(
        StateStore::restore(&snapshot),
        Arc::new(InMemoryValidatorSet::from_powers(validator_powers())),
    )
}

fn schedule_upgrade(chain: &mut Replica) {
    chain.block(&[
        signal(addr(1), 2),
        signal(addr(2), 2),
        signal(addr(3), 2),
        try_upgrade(addr(1)),
    ]);
}

#[test]
fn test_pending_upgrade_survives_restart() {
    let mut original = Replica::start(&validator_powers());
    schedule_upgrade(&mut original);
    original.block(&[deposit()]);

    let mut restarted = reopen(&original);
    assert_eq!(restarted.height(), 2);
    assert_eq!(restarted.mux.active_version(), 1);
    assert_eq!(restarted.pending(), original.pending());

    for _ in 0..UPGRADE_DELAY {
        let a = original.block(&[deposit()]);
        let b = restarted.block(&[deposit()]);
        assert_eq!(a.upgraded, b.upgraded);
        assert_eq!(original.hashes.last(), restarted.hashes.last());
    }
    assert_eq!(restarted.mux.active_version(), 2);
    assert_eq!(restarted.balance(), original.balance());
}

#[test]
fn test_restart_after_upgrade_resumes_new_version() {
    let mut original = Replica::start(&validator_powers());
    schedule_upgrade(&mut original);
    while original.mux.active_version() == 1 {
        original.block(&[deposit()]);
    }
    let balance = original.balance();

    let mut restarted = reopen(&original);
    assert_eq!(restarted.mux.active_version(), 2);
    assert_eq!(restarted.mux.query_handle().app_version().unwrap(), 2);
    // no migration on resume
    assert_eq!(restarted.balance(), balance);

    let outcome = restarted.block(&[deposit()]);
    assert_eq!(outcome.app_version, 2);
    assert_eq!(outcome.upgraded, None);
    assert_eq!(restarted.balance(), balance + 100);
    assert_eq!(restarted.audited_blocks(), 2);
}

#[test]
fn test_restarted_replica_rejects_second_genesis() {
    let mut original = Replica::start(&validator_powers());
    original.block(&[]);
    let mut restarted = reopen(&original);
    let genesis = super::fixtures::genesis(&validator_powers());
    assert!(restarted.mux.init_chain(&genesis, 0).is_err());
}
