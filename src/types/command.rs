//! Commands the settlement engine accepts and the outcomes it reports

use rust_decimal::Decimal;

use super::account::{Account, AccountId, BanType, Role};
use super::room::{MatchType, Room, RoomId};
use super::transaction::{Transaction, TransactionId};
use super::wallet::Wallet;

/// Ban an admin wants to impose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRequest {
    pub ban_type: BanType,
    pub reason: String,
    /// Length of a temporary ban; ignored for permanent bans
    pub days: Option<u32>,
}

/// Payout of a declared winner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub winner_amount: Decimal,
    /// Share of the pool retained by the platform
    pub commission: Decimal,
}

/// Stakes lost when a room expires without a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forfeiture {
    pub forfeited_amount: Decimal,
}

/// Balance snapshot returned to an account holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub deposit: Decimal,
    pub winning: Decimal,
    pub total: Decimal,
}

impl From<Wallet> for Balance {
    fn from(wallet: Wallet) -> Self {
        Balance {
            deposit: wallet.deposit_balance,
            winning: wallet.winning_balance,
            total: wallet.total(),
        }
    }
}

/// A single engine operation with its already-authenticated actor
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RegisterAccount {
        account: AccountId,
        role: Role,
    },
    GrantAdmin {
        account: AccountId,
    },
    Deposit {
        actor: AccountId,
        amount: Decimal,
        external_ref: String,
    },
    RequestWithdrawal {
        actor: AccountId,
        amount: Decimal,
    },
    ApproveWithdrawal {
        admin: AccountId,
        transaction: TransactionId,
    },
    RejectWithdrawal {
        admin: AccountId,
        transaction: TransactionId,
        reason: String,
    },
    CreateRoom {
        actor: AccountId,
        room_code: String,
        password: String,
        match_type: MatchType,
        stake: Decimal,
    },
    JoinRoom {
        actor: AccountId,
        room: RoomId,
    },
    CancelRoom {
        actor: AccountId,
        room: RoomId,
    },
    SubmitResult {
        actor: AccountId,
        room: RoomId,
        evidence_ref: String,
    },
    SubmitDispute {
        actor: AccountId,
        room: RoomId,
        reason: String,
        evidence_ref: Option<String>,
    },
    DeclareWinner {
        admin: AccountId,
        room: RoomId,
        winner: AccountId,
        notes: Option<String>,
    },
    ExpireRoom {
        admin: AccountId,
        room: RoomId,
    },
    BanAccount {
        admin: AccountId,
        account: AccountId,
        ban: BanRequest,
        penalty: Decimal,
    },
    UnbanAccount {
        admin: AccountId,
        account: AccountId,
    },
}

/// What a successfully applied command produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Account(Account),
    Wallet(Wallet),
    Transaction(Transaction),
    Room(Room),
    Payout(Payout),
    Forfeiture(Forfeiture),
    /// Command succeeded and has nothing to report
    Done,
}
