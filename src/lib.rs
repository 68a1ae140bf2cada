//! Wager Engine Library
//! # Overview
//!
//! Wallet and room settlement for peer-to-peer match wagering. Players fund a
//! two-bucket wallet, escrow stakes into head-to-head rooms, and an admin
//! settles each room by paying the pool minus commission to the winner.
//! A journal replay surface drives the engine from CSV with a sync and an
//! async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Wallet, Room, Transaction, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Orchestration of every wallet and room operation
//!   - [`core::account_manager`] - Account storage with per-account locking
//!   - [`core::room_store`] - Rooms and the participant index
//!   - [`core::ledger`] - Append-only transaction history
//!   - [`core::replay`] / [`core::batch_processor`] - Journal replay
//! - [`io`] - Journal readers and CSV output
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Wallet
//!
//! - `deposit_balance`: external deposits and refunds; may go negative
//!   through penalties
//! - `winning_balance`: payouts; the only withdrawable bucket
//! - `total`: sum of both buckets
//!
//! Debits draw from the positive part of the deposit bucket first and take
//! the rest from winnings.
//!
//! # Room Lifecycle
//!
//! ```text
//! Waiting ──join──▶ Active ──dispute──▶ Disputed
//!    │                │                    │
//!  cancel      declare / expire     declare / expire
//!    ▼                ▼                    ▼
//! Cancelled       Completed            Completed
//! ```
//!
//! Cancelled rooms are removed from the store once the stake is refunded.

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{EngineConfig, SettlementEngine};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, Room, RoomId, RoomStatus, Transaction, TransactionId, WagerError, Wallet,
};
