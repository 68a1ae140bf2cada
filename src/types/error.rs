//! Error types for the wager settlement engine
//!
//! Every failure the engine can report is a variant of [`WagerError`]. Variants
//! carry the ids and amounts involved so callers can log them verbatim, and each
//! maps onto one of the coarse [`ErrorKind`] categories a transport layer
//! translates into a status code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use super::account::AccountId;
use super::room::{RoomId, RoomStatus};
use super::transaction::{TransactionId, TransactionStatus};

/// Error category a caller maps to a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Forbidden,
    InsufficientFunds,
    DeadlinePassed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InsufficientFunds => "insufficient funds",
            ErrorKind::DeadlinePassed => "deadline passed",
        };
        f.write_str(name)
    }
}

/// Main error type for the settlement engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WagerError {
    /// Amount is zero, negative, or otherwise unusable for the operation
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount { amount: Decimal, operation: String },

    /// Stake is outside the configured range or not a multiple of the step
    #[error("Invalid stake {stake}: must be between {min} and {max} and a multiple of {step}")]
    InvalidStake {
        stake: Decimal,
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },

    /// Withdrawal below the configured minimum
    #[error("Withdrawal of {requested} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal { requested: Decimal, minimum: Decimal },

    /// A required text field (evidence, reason, reference) was empty
    #[error("{operation} requires a non-empty {field}")]
    MissingField { field: String, operation: String },

    /// Temporary ban requested without a positive number of days
    #[error("Temporary ban for account {account} requires a positive number of days")]
    MissingBanDuration { account: AccountId },

    /// Temporary ban would end past the last representable instant
    #[error("Temporary ban of {days} days for account {account} is too long")]
    BanTooLong { account: AccountId, days: u32 },

    /// Declared winner did not take part in the room
    #[error("Account {account} is not a participant of room {room} and cannot win it")]
    WinnerNotParticipant { room: RoomId, account: AccountId },

    /// Checked decimal arithmetic overflowed
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: String },

    /// Engine configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    #[error("Room {room} not found")]
    RoomNotFound { room: RoomId },

    #[error("Transaction {tx} not found")]
    TransactionNotFound { tx: TransactionId },

    /// Journal reference that no earlier command introduced
    #[error("Unknown reference '{reference}'")]
    UnknownReference { reference: String },

    #[error("Account {account} already exists")]
    AccountExists { account: AccountId },

    /// Journal reference introduced twice
    #[error("Reference '{reference}' is already bound")]
    DuplicateReference { reference: String },

    /// Room is not in a state that allows the operation
    #[error("Room {room} is {status}, cannot {operation}")]
    InvalidRoomState {
        room: RoomId,
        status: RoomStatus,
        operation: String,
    },

    /// Expiry requested before the room deadline elapsed
    #[error("Room {room} deadline {deadline} has not passed yet")]
    DeadlineNotReached { room: RoomId, deadline: DateTime<Utc> },

    /// Ledger entry is not a withdrawal
    #[error("Transaction {tx} is not a withdrawal")]
    NotAWithdrawal { tx: TransactionId },

    /// Withdrawal was already approved or rejected
    #[error("Withdrawal {tx} is {status}, expected pending")]
    WithdrawalNotPending {
        tx: TransactionId,
        status: TransactionStatus,
    },

    /// Withdrawal attempted while the combined balance is negative
    #[error("Account {account} has outstanding debt (total {total}), cannot withdraw")]
    OutstandingDebt { account: AccountId, total: Decimal },

    #[error("Account {account} cannot join its own room {room}")]
    SelfJoin { room: RoomId, account: AccountId },

    #[error("Account {account} does not own room {room}")]
    NotRoomOwner { room: RoomId, account: AccountId },

    #[error("Account {account} is not a participant of room {room}")]
    NotParticipant { room: RoomId, account: AccountId },

    #[error("Account {account} is not an admin")]
    AdminRequired { account: AccountId },

    #[error("Account {account} is banned{}", until.map(|u| format!(" until {}", u)).unwrap_or_default())]
    AccountBanned {
        account: AccountId,
        until: Option<DateTime<Utc>>,
    },

    /// Total balance below the amount a funds-checked operation needs
    #[error("Insufficient funds for account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    /// Result or dispute submitted after the room deadline
    #[error("Room {room} deadline {deadline} has passed")]
    DeadlinePassed { room: RoomId, deadline: DateTime<Utc> },
}

impl WagerError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            WagerError::InvalidAmount { .. }
            | WagerError::InvalidStake { .. }
            | WagerError::BelowMinimumWithdrawal { .. }
            | WagerError::MissingField { .. }
            | WagerError::MissingBanDuration { .. }
            | WagerError::BanTooLong { .. }
            | WagerError::WinnerNotParticipant { .. }
            | WagerError::ArithmeticOverflow { .. }
            | WagerError::InvalidConfig { .. } => ErrorKind::InvalidInput,

            WagerError::AccountNotFound { .. }
            | WagerError::RoomNotFound { .. }
            | WagerError::TransactionNotFound { .. }
            | WagerError::UnknownReference { .. } => ErrorKind::NotFound,

            WagerError::AccountExists { .. }
            | WagerError::DuplicateReference { .. }
            | WagerError::InvalidRoomState { .. }
            | WagerError::DeadlineNotReached { .. }
            | WagerError::NotAWithdrawal { .. }
            | WagerError::WithdrawalNotPending { .. }
            | WagerError::OutstandingDebt { .. } => ErrorKind::Conflict,

            WagerError::SelfJoin { .. }
            | WagerError::NotRoomOwner { .. }
            | WagerError::NotParticipant { .. }
            | WagerError::AdminRequired { .. }
            | WagerError::AccountBanned { .. } => ErrorKind::Forbidden,

            WagerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,

            WagerError::DeadlinePassed { .. } => ErrorKind::DeadlinePassed,
        }
    }
}

// Helper functions for creating common errors

impl WagerError {
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        WagerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    pub fn missing_field(field: &str, operation: &str) -> Self {
        WagerError::MissingField {
            field: field.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str) -> Self {
        WagerError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    pub fn invalid_room_state(room: RoomId, status: RoomStatus, operation: &str) -> Self {
        WagerError::InvalidRoomState {
            room,
            status,
            operation: operation.to_string(),
        }
    }

    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        WagerError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        WagerError::InvalidConfig {
            message: message.into(),
        }
    }
}
