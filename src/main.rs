//! Wager engine CLI
//!
//! Replays a command journal through the settlement engine and prints the
//! final wallet of every account.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > accounts.csv
//! cargo run -- --strategy sync journal.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv > accounts.csv
//! cargo run -- --commission-rate 0.15 --ledger-out ledger.csv journal.csv > accounts.csv
//! RUST_LOG=info cargo run -- journal.csv > accounts.csv
//! ```
//!
//! Diagnostics go to stderr; stdout carries only the account CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, unreadable journal, invalid configuration, etc.)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use tracing_subscriber::EnvFilter;
use wager_engine::cli::{self, CliArgs};
use wager_engine::io::write_ledger_csv;
use wager_engine::strategy;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &CliArgs) -> Result<(), String> {
    let replay = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_replay_config());
    let strategy = strategy::create_strategy(args.strategy.clone(), args.to_engine_config(), replay);

    let mut output = std::io::stdout().lock();
    let engine = strategy.process(&args.input_file, &mut output)?;
    output
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    if let Some(path) = &args.ledger_out {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))?;
        let mut writer = BufWriter::new(file);
        write_ledger_csv(&engine.ledger_entries(), &mut writer)?;
        writer
            .flush()
            .map_err(|e| format!("Failed to flush '{}': {}", path.display(), e))?;
    }

    Ok(())
}

fn main() {
    init_tracing();
    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
