use crate::config::{BridgeConfig, Endpoint, LedgerNames, Limits, RetryPolicy};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Deliver CSV voucher batches to the external accounting system
#[derive(Parser, Debug)]
#[command(name = "voucher-bridge")]
#[command(about = "Validate CSV vouchers and deliver them to the accounting endpoint", long_about = None)]
pub struct CliArgs {
    /// Header file: one row per voucher
    #[arg(value_name = "HEADERS", help = "Path to the voucher header CSV")]
    pub header_file: PathBuf,

    /// Line-item file: one row per item, linked by voucher number
    #[arg(value_name = "ITEMS", help = "Path to the line-item CSV")]
    pub items_file: PathBuf,

    /// External endpoint host
    #[arg(long, value_name = "HOST", default_value = "localhost")]
    pub host: String,

    /// External endpoint port
    #[arg(long, value_name = "PORT", default_value_t = 9000)]
    pub port: u16,

    /// Connect timeout in seconds
    #[arg(long = "connect-timeout", value_name = "SECS", default_value_t = 30)]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds
    #[arg(long = "read-timeout", value_name = "SECS", default_value_t = 60)]
    pub read_timeout_secs: u64,

    /// Delivery attempts per voucher, including the first
    #[arg(long = "max-retries", value_name = "COUNT", default_value_t = 3)]
    pub max_retries: u32,

    /// Maximum input file size in bytes
    #[arg(long = "max-file-size", value_name = "BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_file_size: u64,

    /// Maximum data rows per input file
    #[arg(long = "max-rows", value_name = "COUNT", default_value_t = 10_000)]
    pub max_rows: usize,

    /// Maximum vouchers per batch
    #[arg(long = "max-batch-size", value_name = "COUNT", default_value_t = 500)]
    pub max_batch_size: usize,

    /// Deliver duplicates instead of skipping them
    #[arg(long = "allow-duplicates")]
    pub allow_duplicates: bool,

    /// Also ask the external system whether a voucher already exists
    #[arg(long = "remote-dedup")]
    pub remote_dedup: bool,

    /// Run the pipeline up to encoding and report payloads instead of delivering
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Audit log path (defaults to audit.jsonl beside the header file)
    #[arg(long = "audit-log", value_name = "PATH")]
    pub audit_log: Option<PathBuf>,

    /// Ledger name for the sales account side
    #[arg(long = "sales-ledger", value_name = "NAME")]
    pub sales_ledger: Option<String>,

    /// Ledger name for the purchase account side
    #[arg(long = "purchase-ledger", value_name = "NAME")]
    pub purchase_ledger: Option<String>,

    /// Ledger name for the central tax component
    #[arg(long = "cgst-ledger", value_name = "NAME")]
    pub cgst_ledger: Option<String>,

    /// Ledger name for the state tax component
    #[arg(long = "sgst-ledger", value_name = "NAME")]
    pub sgst_ledger: Option<String>,

    /// Ledger name for the integrated tax component
    #[arg(long = "igst-ledger", value_name = "NAME")]
    pub igst_ledger: Option<String>,

    /// Ledger name for the rounding adjustment
    #[arg(long = "round-off-ledger", value_name = "NAME")]
    pub round_off_ledger: Option<String>,
}

impl CliArgs {
    /// Build the bridge configuration from the parsed arguments
    ///
    /// Invalid zero values fall back to defaults with a warning rather
    /// than aborting the run.
    pub fn to_config(&self) -> BridgeConfig {
        let default_ledgers = LedgerNames::default();
        BridgeConfig {
            endpoint: Endpoint {
                host: self.host.clone(),
                port: self.port,
            },
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            retry: RetryPolicy::new(self.max_retries, Duration::from_secs(2)),
            limits: Limits::new(self.max_file_size, self.max_rows, self.max_batch_size),
            skip_duplicates: !self.allow_duplicates,
            dry_run: self.dry_run,
            remote_dedup: self.remote_dedup,
            ledgers: LedgerNames {
                sales_account: self
                    .sales_ledger
                    .clone()
                    .unwrap_or(default_ledgers.sales_account),
                purchase_account: self
                    .purchase_ledger
                    .clone()
                    .unwrap_or(default_ledgers.purchase_account),
                cgst: self.cgst_ledger.clone().unwrap_or(default_ledgers.cgst),
                sgst: self.sgst_ledger.clone().unwrap_or(default_ledgers.sgst),
                igst: self.igst_ledger.clone().unwrap_or(default_ledgers.igst),
                round_off: self
                    .round_off_ledger
                    .clone()
                    .unwrap_or(default_ledgers.round_off),
            },
            audit_log: self.audit_log.clone(),
        }
    }
}
