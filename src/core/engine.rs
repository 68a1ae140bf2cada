//! Settlement engine
//!
//! `SettlementEngine` orchestrates every money-moving operation of the wager
//! platform by coordinating the [`AccountManager`], [`RoomStore`] and
//! [`Ledger`]. Each public operation validates everything before it writes and
//! leaves wallets, rooms and the ledger consistent with one another.
//!
//! # Architecture
//!
//! ```text
//! SettlementEngine
//!     ├── Arc<RoomStore>       (rooms + participant index)
//!     ├── Arc<AccountManager>  (accounts and their wallets)
//!     ├── Arc<Ledger>          (append-only transaction history)
//!     ├── Arc<EngineConfig>    (commission, stake and withdrawal policy)
//!     └── Arc<dyn Clock>       (source of "now")
//! ```
//!
//! # Lock order
//!
//! Operations that touch several entities take their locks in the order
//! room, account, ledger entry, and never hold two guards of the same map.
//! Room creation debits the creator before the room exists; its id is
//! allocated up front and nobody else can see it until it is inserted.
//! Rejecting a withdrawal claims the ledger entry first and releases it before
//! taking the account lock.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::ban_policy;
use super::clock::{Clock, SystemClock};
use super::config::EngineConfig;
use super::{AccountManager, Ledger, RoomStore};
use crate::types::{
    Account, AccountId, Applied, Balance, BanRequest, BanState, Bucket, Command, Dispute,
    Forfeiture, MatchType, Movement, NewEntry, Outcome, Payout, ResultEvidence, Role, Room,
    RoomId, RoomResults, RoomStatus, Side, Transaction, TransactionId, TransactionKind,
    TransactionStatus, WagerError, Wallet,
};

/// Default number of entries returned by [`SettlementEngine::list_transactions`]
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Comparison of an account's wallet with the net of its ledger entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub account: AccountId,
    pub wallet: Wallet,
    /// Balances rebuilt from the ledger, audit-only entries excluded
    pub ledger: Wallet,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.wallet == self.ledger
    }
}

/// Thread-safe wallet and room settlement engine
///
/// The engine is cheap to clone; clones share the same state and can be used
/// from many threads or tasks at once.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    rooms: Arc<RoomStore>,
    accounts: Arc<AccountManager>,
    ledger: Arc<Ledger>,
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
}

impl SettlementEngine {
    /// Create an empty engine
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, WagerError> {
        config.validate()?;
        Ok(Self {
            rooms: Arc::new(RoomStore::new()),
            accounts: Arc::new(AccountManager::new()),
            ledger: Arc::new(Ledger::new()),
            config: Arc::new(config),
            clock,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a command at an explicit instant
    ///
    /// This is the single dispatch point used when replaying a journal, where
    /// every command carries the time it happened at instead of reading the
    /// clock.
    pub fn apply(&self, command: Command, now: DateTime<Utc>) -> Result<Outcome, WagerError> {
        match command {
            Command::RegisterAccount { account, role } => self
                .register_account_at(account, role, now)
                .map(Outcome::Account),
            Command::GrantAdmin { account } => self.grant_admin(account).map(Outcome::Account),
            Command::Deposit {
                actor,
                amount,
                external_ref,
            } => self
                .deposit_at(actor, amount, &external_ref, now)
                .map(Outcome::Wallet),
            Command::RequestWithdrawal { actor, amount } => self
                .request_withdrawal_at(actor, amount, now)
                .map(Outcome::Transaction),
            Command::ApproveWithdrawal { admin, transaction } => self
                .approve_withdrawal(admin, transaction)
                .map(|_| Outcome::Done),
            Command::RejectWithdrawal {
                admin,
                transaction,
                reason,
            } => self
                .reject_withdrawal_at(admin, transaction, &reason, now)
                .map(|_| Outcome::Done),
            Command::CreateRoom {
                actor,
                room_code,
                password,
                match_type,
                stake,
            } => self
                .create_room_at(actor, &room_code, &password, match_type, stake, now)
                .map(Outcome::Room),
            Command::JoinRoom { actor, room } => {
                self.join_room_at(actor, room, now).map(Outcome::Room)
            }
            Command::CancelRoom { actor, room } => self
                .cancel_room_at(actor, room, now)
                .map(|_| Outcome::Done),
            Command::SubmitResult {
                actor,
                room,
                evidence_ref,
            } => self
                .submit_result_at(actor, room, &evidence_ref, now)
                .map(|_| Outcome::Done),
            Command::SubmitDispute {
                actor,
                room,
                reason,
                evidence_ref,
            } => self
                .submit_dispute_at(actor, room, &reason, evidence_ref.as_deref(), now)
                .map(|_| Outcome::Done),
            Command::DeclareWinner {
                admin,
                room,
                winner,
                notes,
            } => self
                .declare_winner_at(admin, room, winner, notes.as_deref(), now)
                .map(Outcome::Payout),
            Command::ExpireRoom { admin, room } => self
                .expire_room_at(admin, room, now)
                .map(Outcome::Forfeiture),
            Command::BanAccount {
                admin,
                account,
                ban,
                penalty,
            } => self
                .ban_account_at(admin, account, &ban, penalty, now)
                .map(Outcome::Account),
            Command::UnbanAccount { admin, account } => self
                .unban_account(admin, account)
                .map(|_| Outcome::Done),
        }
    }

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    /// Register a zero-balance account
    pub fn register_account(&self, account: AccountId, role: Role) -> Result<Account, WagerError> {
        self.register_account_at(account, role, self.clock.now())
    }

    fn register_account_at(
        &self,
        account: AccountId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Account, WagerError> {
        let registered = self.accounts.register(account, role, now)?;
        info!(account, %role, "account registered");
        Ok(registered)
    }

    /// Give an existing account the admin role
    pub fn grant_admin(&self, account: AccountId) -> Result<Account, WagerError> {
        let updated = self.accounts.update(account, |acc| {
            acc.role = Role::Admin;
            Ok(acc.clone())
        })?;
        info!(account, "admin role granted");
        Ok(updated)
    }

    // ---------------------------------------------------------------------
    // Wallet
    // ---------------------------------------------------------------------

    /// Credit user funds to the deposit bucket
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the actor is unknown or banned
    /// - the amount is not positive
    /// - the external reference is empty
    pub fn deposit(
        &self,
        actor: AccountId,
        amount: Decimal,
        external_ref: &str,
    ) -> Result<Wallet, WagerError> {
        self.deposit_at(actor, amount, external_ref, self.clock.now())
    }

    fn deposit_at(
        &self,
        actor: AccountId,
        amount: Decimal,
        external_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Wallet, WagerError> {
        self.check_player(actor, now)?;
        if amount <= Decimal::ZERO {
            return Err(WagerError::invalid_amount(amount, "deposit"));
        }
        let external_ref = external_ref.trim();
        if external_ref.is_empty() {
            return Err(WagerError::missing_field("external reference", "deposit"));
        }

        let wallet = self.accounts.update(actor, |account| {
            ensure_not_banned(account, now)?;
            let applied = account.wallet.credit(amount, Bucket::Deposit)?;
            self.book(
                actor,
                TransactionKind::Deposit,
                &applied.movements,
                None,
                &format!("Deposit ({})", external_ref),
                now,
            )?;
            account.wallet = applied.wallet;
            Ok(account.wallet)
        })?;

        info!(account = actor, %amount, external_ref, "deposit credited");
        Ok(wallet)
    }

    /// Request a payout from the winning bucket
    ///
    /// The amount leaves the wallet immediately and the entry waits as
    /// `pending` until an admin approves or rejects it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the actor is unknown or banned
    /// - the amount is below the configured minimum
    /// - the account's total balance is negative
    /// - the winning bucket holds less than the amount
    pub fn request_withdrawal(
        &self,
        actor: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, WagerError> {
        self.request_withdrawal_at(actor, amount, self.clock.now())
    }

    fn request_withdrawal_at(
        &self,
        actor: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Transaction, WagerError> {
        self.check_player(actor, now)?;
        if amount <= Decimal::ZERO {
            return Err(WagerError::invalid_amount(amount, "withdrawal"));
        }
        if amount < self.config.min_withdrawal {
            return Err(WagerError::BelowMinimumWithdrawal {
                requested: amount,
                minimum: self.config.min_withdrawal,
            });
        }

        let transaction = self.accounts.update(actor, |account| {
            ensure_not_banned(account, now)?;
            let total = account.wallet.total();
            if total < Decimal::ZERO {
                return Err(WagerError::OutstandingDebt {
                    account: actor,
                    total,
                });
            }
            if account.wallet.winning_balance < amount {
                return Err(WagerError::insufficient_funds(
                    actor,
                    account.wallet.winning_balance,
                    amount,
                ));
            }

            let applied = account.wallet.debit_bucket(amount, Bucket::Winning)?;
            let entry = NewEntry::new(
                actor,
                TransactionKind::Withdrawal,
                -amount,
                Bucket::Winning,
                "Withdrawal request",
            )
            .pending();
            let transaction = self.ledger.record(entry, now)?;
            account.wallet = applied.wallet;
            Ok(transaction)
        })?;

        info!(account = actor, %amount, tx = transaction.id, "withdrawal requested");
        Ok(transaction)
    }

    /// Mark a pending withdrawal as paid out
    pub fn approve_withdrawal(
        &self,
        admin: AccountId,
        transaction: TransactionId,
    ) -> Result<(), WagerError> {
        self.ensure_admin(admin)?;
        self.ledger.update(transaction, |entry| {
            ensure_pending_withdrawal(entry)?;
            entry.status = TransactionStatus::Completed;
            Ok(())
        })?;

        info!(admin, tx = transaction, "withdrawal approved");
        Ok(())
    }

    /// Refuse a pending withdrawal and return its amount to the winning bucket
    pub fn reject_withdrawal(
        &self,
        admin: AccountId,
        transaction: TransactionId,
        reason: &str,
    ) -> Result<(), WagerError> {
        self.reject_withdrawal_at(admin, transaction, reason, self.clock.now())
    }

    fn reject_withdrawal_at(
        &self,
        admin: AccountId,
        transaction: TransactionId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WagerError> {
        self.ensure_admin(admin)?;

        // Claim the entry first so a concurrent approval cannot also succeed
        let (owner, amount) = self.ledger.update(transaction, |entry| {
            ensure_pending_withdrawal(entry)?;
            entry.status = TransactionStatus::Failed;
            Ok((entry.account, -entry.amount))
        })?;

        let description = match reason.trim() {
            "" => format!("Withdrawal {} rejected", transaction),
            reason => format!("Withdrawal {} rejected: {}", transaction, reason),
        };
        let refunded = self.accounts.update(owner, |account| {
            let applied = account.wallet.credit(amount, Bucket::Winning)?;
            self.book(
                owner,
                TransactionKind::Refund,
                &applied.movements,
                None,
                &description,
                now,
            )?;
            account.wallet = applied.wallet;
            Ok(())
        });

        if let Err(error) = refunded {
            // Hand the claim back; the withdrawal is still undecided
            if let Err(release) = self.ledger.update(transaction, |entry| {
                entry.status = TransactionStatus::Pending;
                Ok(())
            }) {
                error!(
                    tx = transaction,
                    account = owner,
                    %amount,
                    error = %release,
                    "withdrawal left failed without refund"
                );
            }
            return Err(error);
        }

        info!(admin, tx = transaction, account = owner, %amount, "withdrawal rejected");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Rooms
    // ---------------------------------------------------------------------

    /// Open a room and escrow the creator's stake
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the actor is unknown or banned
    /// - the stake is out of range or off the step grid
    /// - the room code or password is empty
    /// - the creator's total balance is below the stake
    pub fn create_room(
        &self,
        actor: AccountId,
        room_code: &str,
        password: &str,
        match_type: MatchType,
        stake: Decimal,
    ) -> Result<Room, WagerError> {
        self.create_room_at(actor, room_code, password, match_type, stake, self.clock.now())
    }

    fn create_room_at(
        &self,
        actor: AccountId,
        room_code: &str,
        password: &str,
        match_type: MatchType,
        stake: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Room, WagerError> {
        self.check_player(actor, now)?;
        if !self.config.is_valid_stake(stake) {
            return Err(WagerError::InvalidStake {
                stake,
                min: self.config.min_stake,
                max: self.config.max_stake,
                step: self.config.stake_step,
            });
        }
        if room_code.trim().is_empty() {
            return Err(WagerError::missing_field("room code", "create room"));
        }
        if password.trim().is_empty() {
            return Err(WagerError::missing_field("room password", "create room"));
        }

        let id = self.rooms.allocate_id();
        self.accounts.update(actor, |account| {
            ensure_not_banned(account, now)?;
            let applied = escrow(account, stake)?;
            self.book(
                actor,
                TransactionKind::Stake,
                &applied.movements,
                Some(id),
                &format!("Stake for room {}", id),
                now,
            )?;
            account.wallet = applied.wallet;
            Ok(())
        })?;

        let room = Room {
            id,
            external_room_code: room_code.trim().to_string(),
            external_password: password.to_string(),
            match_type,
            stake_amount: stake,
            creator: actor,
            opponent: None,
            status: RoomStatus::Waiting,
            created_at: now,
            deadline: now + self.config.room_duration,
            results: RoomResults::default(),
            dispute: None,
            winner: None,
            admin_notes: None,
        };
        self.rooms.insert(room.clone());

        info!(room = id, creator = actor, %stake, %match_type, "room created");
        Ok(room)
    }

    /// Take the open seat of a waiting room, escrowing the same stake
    pub fn join_room(&self, actor: AccountId, room: RoomId) -> Result<Room, WagerError> {
        self.join_room_at(actor, room, self.clock.now())
    }

    fn join_room_at(
        &self,
        actor: AccountId,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> Result<Room, WagerError> {
        self.check_player(actor, now)?;

        let room = self.rooms.update(room_id, |room| {
            if room.status != RoomStatus::Waiting {
                return Err(WagerError::invalid_room_state(room.id, room.status, "join"));
            }
            if room.creator == actor {
                return Err(WagerError::SelfJoin {
                    room: room.id,
                    account: actor,
                });
            }

            let stake = room.stake_amount;
            self.accounts.update(actor, |account| {
                ensure_not_banned(account, now)?;
                let applied = escrow(account, stake)?;
                self.book(
                    actor,
                    TransactionKind::Stake,
                    &applied.movements,
                    Some(room_id),
                    &format!("Stake for room {}", room_id),
                    now,
                )?;
                account.wallet = applied.wallet;
                Ok(())
            })?;

            room.opponent = Some(actor);
            room.status = RoomStatus::Active;
            Ok(room.clone())
        })?;
        self.rooms.link(actor, room_id);

        info!(room = room_id, opponent = actor, "room joined");
        Ok(room)
    }

    /// Withdraw a waiting room and refund the creator's stake
    ///
    /// The stake always returns to the deposit bucket, whichever buckets it
    /// was drawn from.
    pub fn cancel_room(&self, actor: AccountId, room: RoomId) -> Result<(), WagerError> {
        self.cancel_room_at(actor, room, self.clock.now())
    }

    fn cancel_room_at(
        &self,
        actor: AccountId,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> Result<(), WagerError> {
        self.check_player(actor, now)?;

        let refund = self.rooms.update(room_id, |room| {
            if room.status != RoomStatus::Waiting {
                return Err(WagerError::invalid_room_state(room.id, room.status, "cancel"));
            }
            if room.creator != actor {
                return Err(WagerError::NotRoomOwner {
                    room: room.id,
                    account: actor,
                });
            }

            let stake = room.stake_amount;
            self.accounts.update(actor, |account| {
                let applied = account.wallet.credit(stake, Bucket::Deposit)?;
                self.book(
                    actor,
                    TransactionKind::Refund,
                    &applied.movements,
                    Some(room_id),
                    &format!("Refund for cancelled room {}", room_id),
                    now,
                )?;
                account.wallet = applied.wallet;
                Ok(())
            })?;

            // Anyone reaching the room before it is removed sees it closed
            room.status = RoomStatus::Cancelled;
            Ok(stake)
        })?;
        self.rooms.remove(room_id);

        info!(room = room_id, creator = actor, %refund, "room cancelled");
        Ok(())
    }

    /// Store a participant's result evidence
    ///
    /// Submitting again replaces the earlier evidence.
    ///
    /// # Errors
    ///
    /// Checked in this order: actor banned, room missing, deadline passed
    /// (whatever the room's status), room not active, actor not a
    /// participant, evidence empty.
    pub fn submit_result(
        &self,
        actor: AccountId,
        room: RoomId,
        evidence_ref: &str,
    ) -> Result<(), WagerError> {
        self.submit_result_at(actor, room, evidence_ref, self.clock.now())
    }

    fn submit_result_at(
        &self,
        actor: AccountId,
        room_id: RoomId,
        evidence_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WagerError> {
        self.check_player(actor, now)?;

        self.rooms.update(room_id, |room| {
            let side = ensure_submission_allowed(room, actor, now, "submit result")?;
            let evidence_ref = evidence_ref.trim();
            if evidence_ref.is_empty() {
                return Err(WagerError::missing_field("evidence", "submit result"));
            }

            let evidence = Some(ResultEvidence {
                evidence_ref: evidence_ref.to_string(),
                submitted_at: now,
            });
            match side {
                Side::Creator => room.results.creator = evidence,
                Side::Opponent => room.results.opponent = evidence,
            }
            Ok(())
        })?;

        debug!(room = room_id, account = actor, "result evidence stored");
        Ok(())
    }

    /// Flag an active room for admin review
    ///
    /// # Errors
    ///
    /// Same order as [`SettlementEngine::submit_result`], with an empty reason
    /// in place of empty evidence.
    pub fn submit_dispute(
        &self,
        actor: AccountId,
        room: RoomId,
        reason: &str,
        evidence_ref: Option<&str>,
    ) -> Result<(), WagerError> {
        self.submit_dispute_at(actor, room, reason, evidence_ref, self.clock.now())
    }

    fn submit_dispute_at(
        &self,
        actor: AccountId,
        room_id: RoomId,
        reason: &str,
        evidence_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), WagerError> {
        self.check_player(actor, now)?;

        self.rooms.update(room_id, |room| {
            ensure_submission_allowed(room, actor, now, "submit dispute")?;
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(WagerError::missing_field("reason", "submit dispute"));
            }

            room.dispute = Some(Dispute {
                reported_by: actor,
                evidence_ref: evidence_ref
                    .map(str::trim)
                    .filter(|evidence| !evidence.is_empty())
                    .map(str::to_string),
                reason: reason.to_string(),
                submitted_at: now,
            });
            room.status = RoomStatus::Disputed;
            Ok(())
        })?;

        info!(room = room_id, account = actor, "room disputed");
        Ok(())
    }

    /// Settle a room in favour of one participant
    ///
    /// The winner's winning bucket receives the pool minus the platform
    /// commission; the commission is not credited anywhere. Allowed after the
    /// deadline and after a dispute.
    pub fn declare_winner(
        &self,
        admin: AccountId,
        room: RoomId,
        winner: AccountId,
        notes: Option<&str>,
    ) -> Result<Payout, WagerError> {
        self.declare_winner_at(admin, room, winner, notes, self.clock.now())
    }

    fn declare_winner_at(
        &self,
        admin: AccountId,
        room_id: RoomId,
        winner: AccountId,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Payout, WagerError> {
        self.ensure_admin(admin)?;

        let payout = self.rooms.update(room_id, |room| {
            if !room.status.is_settleable() {
                return Err(WagerError::invalid_room_state(
                    room.id,
                    room.status,
                    "declare winner",
                ));
            }
            if room.side_of(winner).is_none() {
                return Err(WagerError::WinnerNotParticipant {
                    room: room.id,
                    account: winner,
                });
            }

            let payout = self.payout(room.pool())?;
            self.accounts.update(winner, |account| {
                let applied = account.wallet.credit(payout.winner_amount, Bucket::Winning)?;
                self.book(
                    winner,
                    TransactionKind::Win,
                    &applied.movements,
                    Some(room_id),
                    &format!("Winnings from room {}", room_id),
                    now,
                )?;
                account.wallet = applied.wallet;
                Ok(())
            })?;

            room.winner = Some(winner);
            room.status = RoomStatus::Completed;
            if let Some(notes) = notes.map(str::trim).filter(|notes| !notes.is_empty()) {
                room.admin_notes = Some(notes.to_string());
            }
            Ok(payout)
        })?;

        info!(
            room = room_id,
            winner,
            amount = %payout.winner_amount,
            commission = %payout.commission,
            "winner declared"
        );
        Ok(payout)
    }

    /// Close a room whose deadline passed without a decision
    ///
    /// Both stakes are forfeited: nothing is refunded and nobody is credited.
    /// The ledger gets one audit-only forfeiture entry per participant that
    /// documents the loss already booked by the stake entries.
    pub fn expire_room(&self, admin: AccountId, room: RoomId) -> Result<Forfeiture, WagerError> {
        self.expire_room_at(admin, room, self.clock.now())
    }

    fn expire_room_at(
        &self,
        admin: AccountId,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> Result<Forfeiture, WagerError> {
        self.ensure_admin(admin)?;

        let forfeiture = self.rooms.update(room_id, |room| {
            if !room.status.is_settleable() {
                return Err(WagerError::invalid_room_state(room.id, room.status, "expire"));
            }
            if !room.is_past_deadline(now) {
                return Err(WagerError::DeadlineNotReached {
                    room: room.id,
                    deadline: room.deadline,
                });
            }

            let forfeited_amount = room.pool();
            for participant in room.participants() {
                let entry = NewEntry::new(
                    participant,
                    TransactionKind::Forfeiture,
                    -room.stake_amount,
                    Bucket::Deposit,
                    format!("Stake forfeited on expired room {}", room_id),
                )
                .for_room(room_id)
                .audit_only();
                self.ledger.record(entry, now)?;
            }

            room.status = RoomStatus::Completed;
            room.admin_notes = Some(format!(
                "Expired without a decision; {} in stakes forfeited",
                forfeited_amount
            ));
            Ok(Forfeiture { forfeited_amount })
        })?;

        info!(room = room_id, forfeited = %forfeiture.forfeited_amount, "room expired");
        Ok(forfeiture)
    }

    // ---------------------------------------------------------------------
    // Moderation
    // ---------------------------------------------------------------------

    /// Ban an account, optionally charging a penalty
    ///
    /// The penalty may push the account into debt. A permanent ban also seizes
    /// whatever positive balance remains afterwards. A new ban replaces any
    /// earlier one.
    pub fn ban_account(
        &self,
        admin: AccountId,
        account: AccountId,
        ban: &BanRequest,
        penalty: Decimal,
    ) -> Result<Account, WagerError> {
        self.ban_account_at(admin, account, ban, penalty, self.clock.now())
    }

    fn ban_account_at(
        &self,
        admin: AccountId,
        account_id: AccountId,
        ban: &BanRequest,
        penalty: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Account, WagerError> {
        self.ensure_admin(admin)?;
        if penalty < Decimal::ZERO {
            return Err(WagerError::invalid_amount(penalty, "ban penalty"));
        }
        let reason = ban.reason.trim();
        if reason.is_empty() {
            return Err(WagerError::missing_field("reason", "ban account"));
        }
        let state = ban_policy::ban_state(account_id, ban, now)?;

        let banned = self.accounts.update(account_id, |account| {
            let sanction = ban_policy::sanction(account.wallet, penalty, ban.ban_type)?;
            for (kind, movement) in &sanction.movements {
                let description = match kind {
                    TransactionKind::Penalty => format!("Ban penalty: {}", reason),
                    _ => format!("Balance seized on permanent ban: {}", reason),
                };
                self.ledger.record(
                    NewEntry::new(account_id, *kind, movement.amount, movement.bucket, description),
                    now,
                )?;
            }
            account.wallet = sanction.wallet;
            account.ban = state;
            Ok(account.clone())
        })?;

        info!(
            admin,
            account = account_id,
            ban_type = ?ban.ban_type,
            %penalty,
            until = ?banned.ban.until(),
            "account banned"
        );
        Ok(banned)
    }

    /// Lift a ban; penalties and seized funds stay where they are
    pub fn unban_account(&self, admin: AccountId, account: AccountId) -> Result<(), WagerError> {
        self.ensure_admin(admin)?;
        self.accounts.update(account, |acc| {
            acc.ban = BanState::None;
            Ok(())
        })?;

        info!(admin, account, "account unbanned");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn get_balance(&self, actor: AccountId) -> Result<Balance, WagerError> {
        self.account(actor).map(|account| Balance::from(account.wallet))
    }

    /// The actor's ledger entries, most recent first
    pub fn list_transactions(
        &self,
        actor: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, WagerError> {
        self.ensure_exists(actor)?;
        Ok(self.ledger.for_account(actor, limit))
    }

    pub fn account(&self, id: AccountId) -> Result<Account, WagerError> {
        self.accounts
            .get(id)
            .ok_or(WagerError::AccountNotFound { account: id })
    }

    pub fn room(&self, id: RoomId) -> Result<Room, WagerError> {
        self.rooms.get(id).ok_or(WagerError::RoomNotFound { room: id })
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, WagerError> {
        self.ledger
            .get(id)
            .ok_or(WagerError::TransactionNotFound { tx: id })
    }

    /// Waiting rooms the actor could join, newest first
    pub fn available_rooms(&self, actor: AccountId) -> Result<Vec<Room>, WagerError> {
        self.ensure_exists(actor)?;
        Ok(self
            .rooms
            .filter(|room| room.status == RoomStatus::Waiting && room.creator != actor))
    }

    /// The actor's waiting, active and disputed rooms, newest first
    pub fn rooms_for(&self, actor: AccountId) -> Result<Vec<Room>, WagerError> {
        self.ensure_exists(actor)?;
        Ok(self
            .rooms
            .rooms_for(actor)
            .into_iter()
            .filter(|room| room.status.is_open())
            .collect())
    }

    /// Rooms for admin review, optionally narrowed to one status
    pub fn rooms_by_status(
        &self,
        admin: AccountId,
        status: Option<RoomStatus>,
    ) -> Result<Vec<Room>, WagerError> {
        self.ensure_admin(admin)?;
        Ok(self
            .rooms
            .filter(|room| status.map_or(true, |status| room.status == status)))
    }

    /// Withdrawals awaiting a decision, most recent first
    pub fn pending_withdrawals(&self, admin: AccountId) -> Result<Vec<Transaction>, WagerError> {
        self.ensure_admin(admin)?;
        Ok(self
            .ledger
            .by_kind_status(TransactionKind::Withdrawal, TransactionStatus::Pending))
    }

    /// Every account ordered by id
    pub fn accounts(&self, admin: AccountId) -> Result<Vec<Account>, WagerError> {
        self.ensure_admin(admin)?;
        Ok(self.accounts.all())
    }

    /// Every account ordered by id, without a role check
    ///
    /// For operators of the engine itself, such as the journal replay.
    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts.all()
    }

    /// Every ledger entry in recording order
    pub fn ledger_entries(&self) -> Vec<Transaction> {
        self.ledger.all()
    }

    /// Rebuild an account's buckets from the ledger and compare with its wallet
    pub fn reconcile(&self, account: AccountId) -> Result<Reconciliation, WagerError> {
        let wallet = self.account(account)?.wallet;
        let ledger = Wallet::new(
            self.ledger.net_movement(account, Bucket::Deposit),
            self.ledger.net_movement(account, Bucket::Winning),
        );
        Ok(Reconciliation {
            account,
            wallet,
            ledger,
        })
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn ensure_exists(&self, account: AccountId) -> Result<(), WagerError> {
        if self.accounts.contains(account) {
            Ok(())
        } else {
            Err(WagerError::AccountNotFound { account })
        }
    }

    fn ensure_admin(&self, admin: AccountId) -> Result<(), WagerError> {
        let account = self.account(admin)?;
        if !account.is_admin() {
            return Err(WagerError::AdminRequired { account: admin });
        }
        Ok(())
    }

    /// Fail fast for banned players, lifting an elapsed temporary ban
    fn check_player(&self, actor: AccountId, now: DateTime<Utc>) -> Result<(), WagerError> {
        self.accounts
            .update(actor, |account| ensure_not_banned(account, now))
    }

    fn payout(&self, pool: Decimal) -> Result<Payout, WagerError> {
        let commission = pool
            .checked_mul(self.config.commission_rate)
            .ok_or_else(|| WagerError::arithmetic_overflow("commission"))?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Ok(Payout {
            winner_amount: pool - commission,
            commission,
        })
    }

    /// Record one entry per bucket movement
    fn book(
        &self,
        account: AccountId,
        kind: TransactionKind,
        movements: &[Movement],
        room: Option<RoomId>,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, WagerError> {
        movements
            .iter()
            .map(|movement| {
                let mut entry =
                    NewEntry::new(account, kind, movement.amount, movement.bucket, description);
                entry.room = room;
                self.ledger.record(entry, now)
            })
            .collect()
    }
}

impl Default for SettlementEngine {
    /// Default policy on the system clock
    fn default() -> Self {
        Self {
            rooms: Arc::new(RoomStore::new()),
            accounts: Arc::new(AccountManager::new()),
            ledger: Arc::new(Ledger::new()),
            config: Arc::new(EngineConfig::default()),
            clock: Arc::new(SystemClock),
        }
    }
}

fn ensure_not_banned(account: &mut Account, now: DateTime<Utc>) -> Result<(), WagerError> {
    if account.lift_expired_ban(now) {
        info!(account = account.id, "temporary ban elapsed and was lifted");
    }
    if account.ban.is_active(now) {
        return Err(WagerError::AccountBanned {
            account: account.id,
            until: account.ban.until(),
        });
    }
    Ok(())
}

/// Debit a stake after checking the account can cover it
fn escrow(account: &Account, stake: Decimal) -> Result<Applied, WagerError> {
    if !account.wallet.has_sufficient_funds(stake) {
        return Err(WagerError::insufficient_funds(
            account.id,
            account.wallet.total(),
            stake,
        ));
    }
    account.wallet.debit(stake)
}

fn ensure_pending_withdrawal(entry: &Transaction) -> Result<(), WagerError> {
    if entry.kind != TransactionKind::Withdrawal {
        return Err(WagerError::NotAWithdrawal { tx: entry.id });
    }
    if entry.status != TransactionStatus::Pending {
        return Err(WagerError::WithdrawalNotPending {
            tx: entry.id,
            status: entry.status,
        });
    }
    Ok(())
}

/// Shared gate for result and dispute submissions
fn ensure_submission_allowed(
    room: &Room,
    actor: AccountId,
    now: DateTime<Utc>,
    operation: &str,
) -> Result<Side, WagerError> {
    if room.is_past_deadline(now) {
        return Err(WagerError::DeadlinePassed {
            room: room.id,
            deadline: room.deadline,
        });
    }
    if room.status != RoomStatus::Active {
        return Err(WagerError::invalid_room_state(room.id, room.status, operation));
    }
    room.side_of(actor).ok_or(WagerError::NotParticipant {
        room: room.id,
        account: actor,
    })
}
