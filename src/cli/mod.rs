//! CLI argument parsing

mod args;

pub use args::CliArgs;

use clap::Parser;

/// Parse command-line arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
