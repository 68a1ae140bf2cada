//! Engine scenario tests
//!
//! Drive the public engine API through complete wallet and room lifecycles
//! on a manual clock and check balances, room states and ledger entries after
//! each step.

use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;
use rust_decimal::Decimal;
use std::sync::Arc;
use wager_engine::core::{EngineConfig, ManualClock, SettlementEngine, DEFAULT_HISTORY_LIMIT};
use wager_engine::types::{
    AccountId, BanRequest, BanType, Bucket, ErrorKind, MatchType, Role, Room, RoomId, RoomStatus,
    Transaction, TransactionKind, TransactionStatus, WagerError,
};

const ADMIN: AccountId = 1;
const ALICE: AccountId = 2;
const BOB: AccountId = 3;

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

fn engine_with(config: EngineConfig) -> (SettlementEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap(),
    ));
    let engine = SettlementEngine::new(config, clock.clone()).unwrap();
    engine.register_account(ADMIN, Role::Admin).unwrap();
    engine.register_account(ALICE, Role::Player).unwrap();
    engine.register_account(BOB, Role::Player).unwrap();
    (engine, clock)
}

fn engine() -> (SettlementEngine, Arc<ManualClock>) {
    engine_with(EngineConfig::default())
}

fn create(engine: &SettlementEngine, actor: AccountId, stake: i64) -> Room {
    engine
        .create_room(actor, "ROOM-1", "secret", MatchType::OneVsOne, dec(stake))
        .unwrap()
}

fn active_room(engine: &SettlementEngine, stake: i64) -> Room {
    engine.deposit(ALICE, dec(stake), "bank-alice").unwrap();
    engine.deposit(BOB, dec(stake), "bank-bob").unwrap();
    let room = create(engine, ALICE, stake);
    engine.join_room(BOB, room.id).unwrap()
}

fn room_entries(engine: &SettlementEngine, room: RoomId) -> Vec<Transaction> {
    engine
        .ledger_entries()
        .into_iter()
        .filter(|entry| entry.room == Some(room))
        .collect()
}

fn assert_reconciled(engine: &SettlementEngine) {
    for account in engine.snapshot() {
        let reconciliation = engine.reconcile(account.id).unwrap();
        assert!(
            reconciliation.is_balanced(),
            "account {} drifted from its ledger: {:?}",
            account.id,
            reconciliation
        );
    }
}

#[test]
fn test_settlement_conserves_pool() {
    let (engine, _) = engine();
    let room = active_room(&engine, 100);

    assert_eq!(engine.get_balance(ALICE).unwrap().total, Decimal::ZERO);
    assert_eq!(engine.get_balance(BOB).unwrap().total, Decimal::ZERO);
    assert_eq!(room.pool(), dec(200));

    let payout = engine.declare_winner(ADMIN, room.id, ALICE, None).unwrap();

    assert_eq!(payout.commission, dec(40));
    assert_eq!(payout.winner_amount, dec(160));
    assert_eq!(payout.commission + payout.winner_amount, room.pool());

    let alice = engine.get_balance(ALICE).unwrap();
    assert_eq!(alice.winning, dec(160));
    assert_eq!(alice.deposit, Decimal::ZERO);
    assert_reconciled(&engine);
}

#[test]
fn test_stake_draws_deposit_before_winnings() {
    let config = EngineConfig {
        commission_rate: Decimal::ZERO,
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(config);

    // Alice wins 50 from a 25/25 room with no commission
    let room = active_room(&engine, 25);
    engine.declare_winner(ADMIN, room.id, ALICE, None).unwrap();
    engine.deposit(ALICE, dec(30), "bank-alice-2").unwrap();

    let room = create(&engine, ALICE, 60);

    let balance = engine.get_balance(ALICE).unwrap();
    assert_eq!(balance.deposit, Decimal::ZERO);
    assert_eq!(balance.winning, dec(20));

    let stakes: Vec<_> = room_entries(&engine, room.id)
        .into_iter()
        .map(|entry| (entry.kind, entry.bucket, entry.amount))
        .collect();
    assert_eq!(
        stakes,
        vec![
            (TransactionKind::Stake, Bucket::Deposit, dec(-30)),
            (TransactionKind::Stake, Bucket::Winning, dec(-30)),
        ]
    );
    assert_reconciled(&engine);
}

#[test]
fn test_penalty_may_leave_debt() {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(10), "bank-alice").unwrap();

    let ban = BanRequest {
        ban_type: BanType::Temporary,
        reason: "abusive chat".to_string(),
        days: Some(2),
    };
    let banned = engine.ban_account(ADMIN, ALICE, &ban, dec(50)).unwrap();

    assert_eq!(banned.wallet.total(), dec(-40));
    assert!(banned.ban.is_banned());

    // Debt blocks withdrawals even after the ban is lifted
    engine.unban_account(ADMIN, ALICE).unwrap();
    let error = engine.request_withdrawal(ALICE, dec(150)).unwrap_err();
    assert!(matches!(error, WagerError::OutstandingDebt { .. }));
    assert_reconciled(&engine);
}

#[test]
fn test_permanent_ban_seizes_positive_balance() {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(90), "bank-alice").unwrap();

    let ban = BanRequest {
        ban_type: BanType::Permanent,
        reason: "match fixing".to_string(),
        days: None,
    };
    let banned = engine.ban_account(ADMIN, ALICE, &ban, dec(15)).unwrap();

    assert_eq!(banned.wallet.total(), Decimal::ZERO);
    let kinds: Vec<_> = engine
        .list_transactions(ALICE, DEFAULT_HISTORY_LIMIT)
        .unwrap()
        .into_iter()
        .map(|entry| (entry.kind, entry.amount))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (TransactionKind::Forfeiture, dec(-75)),
            (TransactionKind::Penalty, dec(-15)),
            (TransactionKind::Deposit, dec(90)),
        ]
    );

    let error = engine.deposit(ALICE, dec(10), "bank-alice-2").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Forbidden);
}

#[rstest]
#[case::below_minimum(17, false)]
#[case::above_maximum(1005, false)]
#[case::off_step(52, false)]
#[case::minimum(20, true)]
#[case::middle(500, true)]
#[case::maximum(1000, true)]
fn test_stake_validation(#[case] stake: i64, #[case] accepted: bool) {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(2000), "bank-alice").unwrap();

    let result = engine.create_room(ALICE, "ROOM-1", "secret", MatchType::TwoVsTwo, dec(stake));

    assert_eq!(result.is_ok(), accepted);
    if !accepted {
        assert!(matches!(result, Err(WagerError::InvalidStake { .. })));
        assert_eq!(engine.get_balance(ALICE).unwrap().total, dec(2000));
    }
}

#[test]
fn test_active_room_rejects_join_and_cancel() {
    let (engine, _) = engine();
    engine.register_account(4, Role::Player).unwrap();
    engine.deposit(4, dec(100), "bank-carol").unwrap();
    let room = active_room(&engine, 50);

    let join = engine.join_room(4, room.id).unwrap_err();
    let cancel = engine.cancel_room(ALICE, room.id).unwrap_err();

    assert_eq!(join.kind(), ErrorKind::Conflict);
    assert_eq!(cancel.kind(), ErrorKind::Conflict);
    assert_eq!(engine.get_balance(4).unwrap().total, dec(100));
}

#[test]
fn test_self_join_and_foreign_cancel_are_forbidden() {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(100), "bank-alice").unwrap();
    let room = create(&engine, ALICE, 50);

    let join = engine.join_room(ALICE, room.id).unwrap_err();
    let cancel = engine.cancel_room(BOB, room.id).unwrap_err();

    assert!(matches!(join, WagerError::SelfJoin { .. }));
    assert!(matches!(cancel, WagerError::NotRoomOwner { .. }));
}

#[test]
fn test_cancel_round_trip_restores_balance() {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(100), "bank-alice").unwrap();

    let room = create(&engine, ALICE, 50);
    assert_eq!(engine.get_balance(ALICE).unwrap().total, dec(50));
    assert_eq!(engine.rooms_for(ALICE).unwrap().len(), 1);

    engine.cancel_room(ALICE, room.id).unwrap();

    assert_eq!(engine.get_balance(ALICE).unwrap().deposit, dec(100));
    assert!(matches!(
        engine.room(room.id),
        Err(WagerError::RoomNotFound { .. })
    ));
    assert!(engine.rooms_for(ALICE).unwrap().is_empty());
    assert!(engine.available_rooms(BOB).unwrap().is_empty());

    let history = engine.list_transactions(ALICE, DEFAULT_HISTORY_LIMIT).unwrap();
    assert_eq!(history[0].kind, TransactionKind::Refund);
    assert_eq!(history[0].amount, dec(50));
    assert_eq!(
        history[0].description,
        format!("Refund for cancelled room {}", room.id)
    );
    assert_reconciled(&engine);
}

#[test]
fn test_cancel_refunds_winnings_into_deposit() {
    let config = EngineConfig {
        commission_rate: Decimal::ZERO,
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(config);
    let room = active_room(&engine, 40);
    engine.declare_winner(ADMIN, room.id, BOB, None).unwrap();

    let room = create(&engine, BOB, 80);
    engine.cancel_room(BOB, room.id).unwrap();

    let balance = engine.get_balance(BOB).unwrap();
    assert_eq!(balance.winning, Decimal::ZERO);
    assert_eq!(balance.deposit, dec(80));
}

#[rstest]
#[case::active(false)]
#[case::disputed(true)]
fn test_submissions_after_deadline_fail(#[case] disputed: bool) {
    let (engine, clock) = engine();
    let room = active_room(&engine, 50);
    if disputed {
        engine
            .submit_dispute(BOB, room.id, "opponent left early", Some("clip-1"))
            .unwrap();
    }

    clock.advance(Duration::hours(1) + Duration::seconds(1));

    let result = engine.submit_result(ALICE, room.id, "screenshot-1");
    let dispute = engine.submit_dispute(ALICE, room.id, "late", None);
    assert!(matches!(result, Err(WagerError::DeadlinePassed { .. })));
    assert!(matches!(dispute, Err(WagerError::DeadlinePassed { .. })));
}

#[test]
fn test_results_and_dispute_are_recorded() {
    let (engine, _) = engine();
    let room = active_room(&engine, 50);

    engine.submit_result(ALICE, room.id, "first.png").unwrap();
    engine.submit_result(ALICE, room.id, "second.png").unwrap();
    engine.submit_result(BOB, room.id, "bob.png").unwrap();

    let stored = engine.room(room.id).unwrap();
    let creator = stored.results.creator.unwrap();
    assert_eq!(creator.evidence_ref, "second.png");
    assert_eq!(stored.results.opponent.unwrap().evidence_ref, "bob.png");

    engine
        .submit_dispute(BOB, room.id, "wrong score", None)
        .unwrap();
    let stored = engine.room(room.id).unwrap();
    assert_eq!(stored.status, RoomStatus::Disputed);
    let dispute = stored.dispute.unwrap();
    assert_eq!(dispute.reported_by, BOB);
    assert_eq!(dispute.reason, "wrong score");

    // Only active rooms take new results
    let error = engine.submit_result(ALICE, room.id, "third.png").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);

    // Disputed rooms can still be settled
    engine.declare_winner(ADMIN, room.id, BOB, Some("video review")).unwrap();
    assert_eq!(engine.get_balance(BOB).unwrap().winning, dec(80));
}

#[test]
fn test_outsider_cannot_submit_or_win() {
    let (engine, _) = engine();
    engine.register_account(4, Role::Player).unwrap();
    let room = active_room(&engine, 50);

    let result = engine.submit_result(4, room.id, "fake.png").unwrap_err();
    let declare = engine.declare_winner(ADMIN, room.id, 4, None).unwrap_err();

    assert!(matches!(result, WagerError::NotParticipant { .. }));
    assert!(matches!(declare, WagerError::WinnerNotParticipant { .. }));
    assert_eq!(engine.room(room.id).unwrap().status, RoomStatus::Active);
}

#[test]
fn test_settlement_ledger_entries() {
    let (engine, _) = engine();
    let room = active_room(&engine, 100);
    engine.declare_winner(ADMIN, room.id, BOB, None).unwrap();

    let entries: Vec<_> = room_entries(&engine, room.id)
        .into_iter()
        .map(|entry| (entry.account, entry.kind, entry.bucket, entry.amount, entry.status))
        .collect();
    assert_eq!(
        entries,
        vec![
            (
                ALICE,
                TransactionKind::Stake,
                Bucket::Deposit,
                dec(-100),
                TransactionStatus::Completed
            ),
            (
                BOB,
                TransactionKind::Stake,
                Bucket::Deposit,
                dec(-100),
                TransactionStatus::Completed
            ),
            (
                BOB,
                TransactionKind::Win,
                Bucket::Winning,
                dec(160),
                TransactionStatus::Completed
            ),
        ]
    );
    // Two deposits plus the three room entries
    assert_eq!(engine.ledger_entries().len(), 5);
}

#[test]
fn test_expire_forfeits_without_refund() {
    let (engine, clock) = engine();
    let room = active_room(&engine, 100);

    clock.advance(Duration::hours(2));
    let forfeiture = engine.expire_room(ADMIN, room.id).unwrap();

    assert_eq!(forfeiture.forfeited_amount, dec(200));
    assert_eq!(engine.get_balance(ALICE).unwrap().total, Decimal::ZERO);
    assert_eq!(engine.get_balance(BOB).unwrap().total, Decimal::ZERO);

    let expired = engine.room(room.id).unwrap();
    assert_eq!(expired.status, RoomStatus::Completed);
    assert_eq!(expired.winner, None);

    let forfeitures: Vec<_> = room_entries(&engine, room.id)
        .into_iter()
        .filter(|entry| entry.kind == TransactionKind::Forfeiture)
        .collect();
    assert_eq!(forfeitures.len(), 2);
    assert!(forfeitures.iter().all(|entry| entry.audit_only));

    // Already closed
    let again = engine.expire_room(ADMIN, room.id).unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Conflict);
    assert_reconciled(&engine);
}

#[test]
fn test_withdrawal_lifecycle() {
    let (engine, _) = engine();
    let room = active_room(&engine, 200);
    engine.declare_winner(ADMIN, room.id, ALICE, None).unwrap();
    assert_eq!(engine.get_balance(ALICE).unwrap().winning, dec(320));

    let first = engine.request_withdrawal(ALICE, dec(150)).unwrap();
    let second = engine.request_withdrawal(ALICE, dec(170)).unwrap();
    assert_eq!(first.status, TransactionStatus::Pending);
    assert_eq!(engine.get_balance(ALICE).unwrap().winning, Decimal::ZERO);
    assert_eq!(engine.pending_withdrawals(ADMIN).unwrap().len(), 2);

    engine.approve_withdrawal(ADMIN, first.id).unwrap();
    engine
        .reject_withdrawal(ADMIN, second.id, "KYC incomplete")
        .unwrap();

    assert_eq!(
        engine.transaction(first.id).unwrap().status,
        TransactionStatus::Completed
    );
    assert_eq!(
        engine.transaction(second.id).unwrap().status,
        TransactionStatus::Failed
    );
    assert_eq!(engine.get_balance(ALICE).unwrap().winning, dec(170));
    assert!(engine.pending_withdrawals(ADMIN).unwrap().is_empty());

    let refund = &engine.list_transactions(ALICE, 1).unwrap()[0];
    assert_eq!(refund.kind, TransactionKind::Refund);
    assert_eq!(
        refund.description,
        format!("Withdrawal {} rejected: KYC incomplete", second.id)
    );

    let twice = engine.approve_withdrawal(ADMIN, second.id).unwrap_err();
    assert!(matches!(twice, WagerError::WithdrawalNotPending { .. }));
    assert_reconciled(&engine);
}

#[rstest]
#[case::below_minimum(100, "BelowMinimumWithdrawal")]
#[case::deposit_only(150, "InsufficientFunds")]
fn test_withdrawal_guards(#[case] amount: i64, #[case] expected: &str) {
    let (engine, _) = engine();
    engine.deposit(ALICE, dec(500), "bank-alice").unwrap();

    let error = engine.request_withdrawal(ALICE, dec(amount)).unwrap_err();

    let matched = match error {
        WagerError::BelowMinimumWithdrawal { .. } => "BelowMinimumWithdrawal",
        WagerError::InsufficientFunds { .. } => "InsufficientFunds",
        other => panic!("unexpected error {:?}", other),
    };
    assert_eq!(matched, expected);
    assert_eq!(engine.get_balance(ALICE).unwrap().deposit, dec(500));
}

#[test]
fn test_admin_room_views() {
    let (engine, _) = engine();
    let settled = active_room(&engine, 50);
    engine.deposit(ALICE, dec(50), "bank-alice-2").unwrap();
    let waiting = create(&engine, ALICE, 50);
    engine.declare_winner(ADMIN, settled.id, ALICE, None).unwrap();

    let all = engine.rooms_by_status(ADMIN, None).unwrap();
    let completed = engine
        .rooms_by_status(ADMIN, Some(RoomStatus::Completed))
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, settled.id);
    assert_eq!(engine.available_rooms(BOB).unwrap()[0].id, waiting.id);
    assert!(engine.available_rooms(ALICE).unwrap().is_empty());
    assert_eq!(engine.accounts(ADMIN).unwrap().len(), 3);

    let error = engine.rooms_by_status(ALICE, None).unwrap_err();
    assert!(matches!(error, WagerError::AdminRequired { .. }));
}

#[test]
fn test_mixed_history_stays_reconciled() {
    let (engine, clock) = engine();
    let room = active_room(&engine, 300);
    engine.submit_result(ALICE, room.id, "a.png").unwrap();
    engine.declare_winner(ADMIN, room.id, ALICE, None).unwrap();

    engine.deposit(BOB, dec(75), "bank-bob-2").unwrap();
    let open = create(&engine, ALICE, 75);
    engine.join_room(BOB, open.id).unwrap();
    clock.advance(Duration::hours(3));
    engine.expire_room(ADMIN, open.id).unwrap();

    let withdrawal = engine.request_withdrawal(ALICE, dec(200)).unwrap();
    engine.reject_withdrawal(ADMIN, withdrawal.id, "").unwrap();

    let ban = BanRequest {
        ban_type: BanType::Permanent,
        reason: "chargeback fraud".to_string(),
        days: None,
    };
    engine.ban_account(ADMIN, BOB, &ban, dec(5)).unwrap();

    assert_eq!(engine.get_balance(ALICE).unwrap().total, dec(405));
    assert_reconciled(&engine);
}
