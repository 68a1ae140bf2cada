//! Core business logic module
//!
//! This module contains the settlement components:
//! - `clock` - Time source abstraction
//! - `config` - Settlement policy parameters
//! - `account_manager` - Account storage with per-account locking
//! - `room_store` - Room storage with a participant index
//! - `ledger` - Append-only transaction history
//! - `ban_policy` - Ban states, penalties and seizures
//! - `engine` - Orchestration of every wallet and room operation
//! - `replay` - Journal reference resolution on top of the engine
//! - `batch_processor` - Concurrent replay of independent journal records

pub mod account_manager;
pub mod ban_policy;
pub mod batch_processor;
pub mod clock;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod replay;
pub mod room_store;

pub use account_manager::AccountManager;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Reconciliation, SettlementEngine, DEFAULT_HISTORY_LIMIT};
pub use ledger::Ledger;
pub use replay::Replayer;
pub use room_store::RoomStore;
