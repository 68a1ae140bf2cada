//! Ledger entry types for the wager settlement engine
//!
//! Every balance change the engine makes is described by a [`Transaction`].
//! Amounts are signed: positive increases the named bucket, negative
//! decreases it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use super::account::AccountId;
use super::room::RoomId;
use super::wallet::Bucket;

/// Transaction identifier, strictly increasing in recording order
pub type TransactionId = u64;

/// What caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Manual credit of user funds
    Deposit,
    /// Payout request against the winning bucket
    Withdrawal,
    /// Stake escrowed when creating or joining a room
    Stake,
    /// Pool share credited to a declared winner
    Win,
    /// Money returned to the account (cancelled room, rejected withdrawal)
    Refund,
    /// Punitive debit attached to a ban
    Penalty,
    /// Funds lost with no credit to anyone (expired room, permanent ban)
    Forfeiture,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Stake => "stake",
            TransactionKind::Win => "win",
            TransactionKind::Refund => "refund",
            TransactionKind::Penalty => "penalty",
            TransactionKind::Forfeiture => "forfeiture",
        };
        f.write_str(label)
    }
}

/// Settlement status; only withdrawals are ever recorded as pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Withdrawal awaiting an admin decision
    Pending,
    Completed,
    /// Withdrawal rejected by an admin and refunded
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Ledger entry before the ledger assigns its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub account: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub bucket: Bucket,
    pub room: Option<RoomId>,
    pub status: TransactionStatus,
    pub description: String,
    /// Documents a loss already booked by an earlier entry; moves no money
    pub audit_only: bool,
}

impl NewEntry {
    /// Completed, balance-affecting entry
    pub fn new(
        account: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        bucket: Bucket,
        description: impl Into<String>,
    ) -> Self {
        NewEntry {
            account,
            kind,
            amount,
            bucket,
            room: None,
            status: TransactionStatus::Completed,
            description: description.into(),
            audit_only: false,
        }
    }

    pub fn for_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    pub fn pending(mut self) -> Self {
        self.status = TransactionStatus::Pending;
        self
    }

    pub fn audit_only(mut self) -> Self {
        self.audit_only = true;
        self
    }
}

/// Recorded ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub account: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub bucket: Bucket,
    pub room: Option<RoomId>,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub audit_only: bool,
}

impl Transaction {
    pub(crate) fn from_entry(id: TransactionId, entry: NewEntry, created_at: DateTime<Utc>) -> Self {
        Transaction {
            id,
            account: entry.account,
            kind: entry.kind,
            amount: entry.amount,
            bucket: entry.bucket,
            room: entry.room,
            status: entry.status,
            description: entry.description,
            created_at,
            audit_only: entry.audit_only,
        }
    }

    /// Whether this entry counts towards the account's bucket balances
    pub fn moves_funds(&self) -> bool {
        !self.audit_only
    }
}
