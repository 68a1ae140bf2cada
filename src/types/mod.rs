//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: accounts, roles and ban state
//! - `wallet`: the two-bucket wallet and its balance rules
//! - `room`: rooms and their lifecycle states
//! - `transaction`: ledger entries
//! - `command`: engine commands and their outcomes
//! - `journal`: journal records replayed through the engine
//! - `error`: error types for the engine

pub mod account;
pub mod command;
pub mod error;
pub mod journal;
pub mod room;
pub mod transaction;
pub mod wallet;

pub use account::{Account, AccountId, BanState, BanType, Role};
pub use command::{Balance, BanRequest, Command, Forfeiture, Outcome, Payout};
pub use error::{ErrorKind, WagerError};
pub use journal::{EntityKey, JournalAction, JournalRecord};
pub use room::{Dispute, MatchType, ResultEvidence, Room, RoomId, RoomResults, RoomStatus, Side};
pub use transaction::{NewEntry, Transaction, TransactionId, TransactionKind, TransactionStatus};
pub use wallet::{Applied, Bucket, Movement, Wallet};
