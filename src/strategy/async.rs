//! Asynchronous batch replay strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── ReplayConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (entity partitioning + tokio tasks)
//!         └── Replayer → SettlementEngine (DashMap-backed state)
//! ```
//!
//! Batches are replayed one after another so a record never overtakes an
//! earlier one touching the same entity. Inside a batch, groups that share
//! no account or reference run concurrently on the runtime's worker threads.

use crate::core::{BatchProcessor, EngineConfig, Replayer, SettlementEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::{log_rejection, replay_engine, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Batching and concurrency knobs for the async strategy
///
/// Controls how many records are read per batch and how many worker threads
/// the runtime gets for the groups inside a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Number of journal records per batch
    pub batch_size: usize,
    /// Worker threads available to concurrent groups
    pub max_concurrent_batches: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl ReplayConfig {
    /// Create a config, falling back to defaults for zero values
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Records per batch (default: 1000)
    /// * `max_concurrent_batches` - Worker threads (default: CPU cores)
    ///
    /// # Examples
    ///
    /// ```
    /// use wager_engine::strategy::ReplayConfig;
    ///
    /// let config = ReplayConfig::new(0, 2);
    /// assert_eq!(config.batch_size, 1000);
    /// assert_eq!(config.max_concurrent_batches, 2);
    /// ```
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid concurrency, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Multi-threaded batch replay
///
/// # Thread Safety
///
/// The engine behind a replay is a set of `Arc`-shared DashMaps, so group
/// tasks on different worker threads mutate it without further locking.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    engine: EngineConfig,
    config: ReplayConfig,
}

impl AsyncProcessingStrategy {
    /// Create an async strategy
    ///
    /// # Arguments
    ///
    /// * `engine` - Policy for the engine each replay starts from
    /// * `config` - Batch size and worker thread count
    pub fn new(engine: EngineConfig, config: ReplayConfig) -> Self {
        Self { engine, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the journal batch by batch and write the account CSV
    ///
    /// 1. Builds a multi-threaded tokio runtime
    /// 2. Reads records in batches with `AsyncReader`
    /// 3. Replays each batch to completion before reading the next
    /// 4. Writes the final account states
    ///
    /// # Returns
    ///
    /// * `Ok(SettlementEngine)` holding the replayed state
    /// * `Err(String)` if the configuration is invalid, the file cannot be
    ///   opened, a group task failed or the output cannot be written
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<SettlementEngine, String> {
        let engine = replay_engine(&self.engine)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(Replayer::new(engine.clone()));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0u64;
            let mut rejected = 0u64;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for result in processor.process_batch(batch).await? {
                    match &result.result {
                        Ok(_) => applied += 1,
                        Err(e) => {
                            rejected += 1;
                            log_rejection(result.record.line, e);
                        }
                    }
                }
            }
            info!(applied, rejected, "journal replayed");

            Ok::<(), String>(())
        })?;

        write_accounts_csv(&engine.snapshot(), output)?;
        Ok(engine)
    }
}
