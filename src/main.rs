//! Voucher Bridge CLI
//!
//! Command-line interface for delivering CSV voucher batches to the
//! external accounting endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- headers.csv items.csv > result.json
//! cargo run -- --dry-run headers.csv items.csv > preview.json
//! cargo run -- --host erp.internal --port 9000 headers.csv items.csv
//! ```
//!
//! The program reads both CSV files, runs one delivery batch through the
//! bridge pipeline, and prints the batch result as JSON to stdout.
//!
//! # Exit Codes
//!
//! - 0: The batch ran to completion (individual vouchers may still have failed;
//!   see the per-record statuses in the output)
//! - 1: Catastrophic error (unreadable input, limits exceeded, batch already
//!   in progress, ...)

use std::process;
use tracing_subscriber::EnvFilter;
use voucher_bridge::core::{run_batch, BatchOptions};
use voucher_bridge::delivery::{HttpTransport, TokioSleeper};
use voucher_bridge::{cli, BridgeError};

// The external endpoint serializes its requests, so the pipeline runs on a
// single thread; only the delivery path awaits.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let config = args.to_config();

    if let Err(e) = run(&args, &config).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: &cli::CliArgs, config: &voucher_bridge::BridgeConfig) -> Result<(), BridgeError> {
    let transport = HttpTransport::new(config)?;
    let result = run_batch(
        config,
        &args.header_file,
        &args.items_file,
        transport,
        TokioSleeper,
        BatchOptions::default(),
    )
    .await?;

    let json = serde_json::to_string_pretty(&result).map_err(|e| BridgeError::IoError {
        message: e.to_string(),
    })?;
    println!("{}", json);
    Ok(())
}
