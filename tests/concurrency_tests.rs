//! Concurrency tests
//!
//! Race engine operations from plain OS threads against shared engine
//! clones and check that exactly one contender wins and money is neither
//! created nor lost.

use rust_decimal::Decimal;
use std::sync::{Arc, Barrier};
use std::thread;
use wager_engine::core::{EngineConfig, SettlementEngine, SystemClock};
use wager_engine::types::{
    AccountId, MatchType, Role, RoomStatus, TransactionKind, TransactionStatus, WagerError,
};

const ADMIN: AccountId = 1;
const CREATOR: AccountId = 2;

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

fn engine() -> SettlementEngine {
    let engine = SettlementEngine::new(EngineConfig::default(), Arc::new(SystemClock)).unwrap();
    engine.register_account(ADMIN, Role::Admin).unwrap();
    engine.register_account(CREATOR, Role::Player).unwrap();
    engine
}

/// Run `f` on `count` threads released together
fn race<T, F>(count: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(count));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..count)
        .map(|index| {
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                f(index)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("racing thread panicked"))
        .collect()
}

#[test]
fn test_racing_joins_produce_one_opponent() {
    let engine = engine();
    engine.deposit(CREATOR, dec(100), "bank-creator").unwrap();
    let room = engine
        .create_room(CREATOR, "RACE", "pw", MatchType::OneVsOne, dec(100))
        .unwrap();

    let contenders: Vec<AccountId> = (10..26).collect();
    for &account in &contenders {
        engine.register_account(account, Role::Player).unwrap();
        engine.deposit(account, dec(100), "bank").unwrap();
    }

    let shared = engine.clone();
    let ids = contenders.clone();
    let results = race(contenders.len(), move |index| {
        shared.join_room(ids[index], room.id)
    });

    let winners: Vec<_> = results.iter().filter(|result| result.is_ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|error| matches!(error, WagerError::InvalidRoomState { .. })));

    let stored = engine.room(room.id).unwrap();
    assert_eq!(stored.status, RoomStatus::Active);
    let opponent = stored.opponent.unwrap();

    let stakes: Vec<_> = engine
        .ledger_entries()
        .into_iter()
        .filter(|entry| entry.kind == TransactionKind::Stake && entry.account != CREATOR)
        .collect();
    assert_eq!(stakes.len(), 1);
    assert_eq!(stakes[0].account, opponent);

    for &account in &contenders {
        let expected = if account == opponent { dec(0) } else { dec(100) };
        assert_eq!(engine.get_balance(account).unwrap().total, expected);
    }
}

#[test]
fn test_concurrent_stakes_never_overdraw() {
    let engine = engine();
    engine.deposit(CREATOR, dec(100), "bank-creator").unwrap();

    let shared = engine.clone();
    let results = race(8, move |_| {
        shared.create_room(CREATOR, "ROOM", "pw", MatchType::TwoVsTwo, dec(30))
    });

    let created = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(created, 3);
    assert_eq!(engine.get_balance(CREATOR).unwrap().total, dec(10));
    assert!(engine.reconcile(CREATOR).unwrap().is_balanced());
}

#[test]
fn test_concurrent_deposits_are_all_applied() {
    let engine = engine();

    let shared = engine.clone();
    race(32, move |index| {
        shared
            .deposit(CREATOR, dec(5), &format!("bank-{}", index))
            .unwrap()
    });

    assert_eq!(engine.get_balance(CREATOR).unwrap().deposit, dec(160));
    assert_eq!(engine.ledger_entries().len(), 32);
}

#[test]
fn test_approve_and_reject_race_has_one_outcome() {
    let engine = SettlementEngine::new(
        EngineConfig {
            commission_rate: Decimal::ZERO,
            ..EngineConfig::default()
        },
        Arc::new(SystemClock),
    )
    .unwrap();
    engine.register_account(ADMIN, Role::Admin).unwrap();
    engine.register_account(CREATOR, Role::Player).unwrap();
    engine.register_account(3, Role::Player).unwrap();
    engine.deposit(CREATOR, dec(100), "bank-creator").unwrap();
    engine.deposit(3, dec(100), "bank-opponent").unwrap();
    let room = engine
        .create_room(CREATOR, "ROOM", "pw", MatchType::OneVsOne, dec(100))
        .unwrap();
    engine.join_room(3, room.id).unwrap();
    engine.declare_winner(ADMIN, room.id, CREATOR, None).unwrap();
    let withdrawal = engine.request_withdrawal(CREATOR, dec(200)).unwrap();

    let shared = engine.clone();
    let results = race(2, move |index| {
        if index == 0 {
            shared.approve_withdrawal(ADMIN, withdrawal.id)
        } else {
            shared.reject_withdrawal(ADMIN, withdrawal.id, "duplicate request")
        }
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);

    let status = engine.transaction(withdrawal.id).unwrap().status;
    let winning = engine.get_balance(CREATOR).unwrap().winning;
    match status {
        TransactionStatus::Completed => assert_eq!(winning, Decimal::ZERO),
        TransactionStatus::Failed => assert_eq!(winning, dec(200)),
        other => panic!("withdrawal left in {:?}", other),
    }
}
