//! Processing strategies for journal replay
//!
//! A strategy owns the whole pipeline: reading the journal, replaying every
//! record through a fresh [`SettlementEngine`] and writing the final account
//! states. The synchronous and asynchronous strategies can be swapped at
//! runtime and produce the same account output for the same journal.

use crate::cli::StrategyType;
use crate::core::{EngineConfig, SettlementEngine, SystemClock};
use crate::types::WagerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, ReplayConfig};
pub use sync::SyncProcessingStrategy;

/// Replay pipeline over a journal file
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the journal at `input_path` and write the final account states
    /// to `output`
    ///
    /// Returns the engine holding the replayed state so callers can inspect
    /// or export the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or the output cannot
    /// be written. Malformed rows and rejected commands are logged and
    /// skipped; they never fail the replay.
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<SettlementEngine, String>;
}

/// Create a processing strategy
///
/// `replay` only tunes the async strategy and is ignored for sync.
pub fn create_strategy(
    strategy_type: StrategyType,
    engine: EngineConfig,
    replay: Option<ReplayConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(engine)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            engine,
            replay.unwrap_or_default(),
        )),
    }
}

/// Fresh engine for a replay
///
/// Journal records carry their own instants, so the wall clock is only a
/// fallback for direct engine calls.
fn replay_engine(config: &EngineConfig) -> Result<SettlementEngine, String> {
    SettlementEngine::new(config.clone(), Arc::new(SystemClock))
        .map_err(|e| format!("Invalid engine configuration: {}", e))
}

fn log_rejection(line: u64, error: &WagerError) {
    warn!(line, kind = ?error.kind(), error = %error, "journal record rejected");
}
