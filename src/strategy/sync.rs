//! Synchronous replay strategy
//!
//! Streams the journal one row at a time through [`SyncReader`] and applies
//! every record in file order on the calling thread.

use crate::core::{EngineConfig, Replayer, SettlementEngine};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_rejection, replay_engine, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Single-threaded, in-order replay
///
/// Every record is applied on the calling thread before the next one is
/// read, which makes this strategy the reference the async one is checked
/// against.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wager_engine::core::EngineConfig;
/// use wager_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
///
/// let strategy = SyncProcessingStrategy::new(EngineConfig::default());
/// let mut output = Vec::new();
/// let engine = strategy
///     .process(Path::new("journal.csv"), &mut output)
///     .unwrap();
/// println!("{} ledger entries", engine.ledger_entries().len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: EngineConfig,
}

impl SyncProcessingStrategy {
    /// Create a sync strategy
    ///
    /// # Arguments
    ///
    /// * `config` - Policy for the engine each replay starts from
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the journal row by row and write the account CSV
    ///
    /// # Returns
    ///
    /// * `Ok(SettlementEngine)` holding the replayed state
    /// * `Err(String)` if the configuration is invalid, the file cannot be
    ///   opened or the output cannot be written
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<SettlementEngine, String> {
        let engine = replay_engine(&self.config)?;
        let replayer = Replayer::new(engine.clone());
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0u64;
        let mut rejected = 0u64;
        for result in reader {
            match result {
                Ok(record) => match replayer.apply(&record) {
                    Ok(_) => applied += 1,
                    Err(e) => {
                        rejected += 1;
                        log_rejection(record.line, &e);
                    }
                },
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "skipping malformed journal record");
                }
            }
        }
        info!(applied, rejected, "journal replayed");

        write_accounts_csv(&engine.snapshot(), output)?;
        Ok(engine)
    }
}
