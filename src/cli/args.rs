use crate::core::EngineConfig;
use crate::strategy::ReplayConfig;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wager-engine")]
#[command(
    about = "Replay a wager journal and report the final wallet balances",
    long_about = None
)]
pub struct CliArgs {
    #[arg(value_name = "INPUT", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for in-order streaming or 'async' for batched concurrent replay"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for concurrent replay (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    #[arg(
        long = "commission-rate",
        value_name = "RATE",
        help = "Commission taken from each pool, as a fraction (default: 0.20)"
    )]
    pub commission_rate: Option<Decimal>,

    #[arg(
        long = "min-withdrawal",
        value_name = "AMOUNT",
        help = "Smallest withdrawal a player may request (default: 150)"
    )]
    pub min_withdrawal: Option<Decimal>,

    #[arg(
        long = "ledger-out",
        value_name = "PATH",
        help = "Also write every ledger entry to this CSV file"
    )]
    pub ledger_out: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    pub fn to_replay_config(&self) -> ReplayConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = ReplayConfig::default();
            ReplayConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            ReplayConfig::default()
        }
    }

    /// Engine policy with command-line overrides applied
    ///
    /// The result is validated when the engine is built.
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            commission_rate: self.commission_rate.unwrap_or(default.commission_rate),
            min_withdrawal: self.min_withdrawal.unwrap_or(default.min_withdrawal),
            ..default
        }
    }
}
