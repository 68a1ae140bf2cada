// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, StrategyType};

use clap::Parser;

pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
