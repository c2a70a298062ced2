//! Bridge configuration
//!
//! The configuration surface is a fixed set of named options (endpoint,
//! timeouts, retry budget, input limits, duplicate handling, dry-run) plus
//! the ledger-name mapping used by the codec. Invalid values fall back to
//! defaults with a warning rather than aborting.

use std::path::PathBuf;
use std::time::Duration;

/// External endpoint location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Base URL of the voucher import endpoint
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint {
            host: "localhost".to_string(),
            port: 9000,
        }
    }
}

/// Retry budget and backoff for transport-level failures
///
/// Defaults: 3 attempts with 2s/4s/8s between them. Rejections carried in a
/// successful response are never retried; this policy only covers transport
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        let max_attempts = if max_attempts == 0 {
            tracing::warn!("max retries of 0 is invalid, falling back to 3");
            3
        } else {
            max_attempts
        };
        RetryPolicy {
            max_attempts,
            backoff_base,
        }
    }

    /// Backoff delay after the given (1-based) failed attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // 2s, 4s, 8s, ... capped to avoid shift overflow on absurd budgets
        let exponent = (attempt.saturating_sub(1)).min(16);
        self.backoff_base * (1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

/// Input guardrails; exceeding any of them aborts the batch up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum input file size in bytes
    pub max_file_size: u64,
    /// Maximum data rows per input file
    pub max_rows: usize,
    /// Maximum joined bundles per batch
    pub max_batch_size: usize,
}

impl Limits {
    pub fn new(max_file_size: u64, max_rows: usize, max_batch_size: usize) -> Self {
        let default = Limits::default();
        let max_file_size = if max_file_size == 0 {
            tracing::warn!("max file size of 0 is invalid, falling back to default");
            default.max_file_size
        } else {
            max_file_size
        };
        let max_rows = if max_rows == 0 {
            tracing::warn!("max row count of 0 is invalid, falling back to default");
            default.max_rows
        } else {
            max_rows
        };
        let max_batch_size = if max_batch_size == 0 {
            tracing::warn!("max batch size of 0 is invalid, falling back to default");
            default.max_batch_size
        } else {
            max_batch_size
        };
        Limits {
            max_file_size,
            max_rows,
            max_batch_size,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_file_size: 10 * 1024 * 1024,
            max_rows: 10_000,
            max_batch_size: 500,
        }
    }
}

/// Ledger names used when building accounting entries
///
/// The external system identifies ledgers by name. Which names apply
/// (including reverse-charge substitutions) is site-specific, so the
/// mapping is configuration, never hardcoded in the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerNames {
    pub sales_account: String,
    pub purchase_account: String,
    pub cgst: String,
    pub sgst: String,
    pub igst: String,
    pub round_off: String,
}

impl Default for LedgerNames {
    fn default() -> Self {
        LedgerNames {
            sales_account: "Sales".to_string(),
            purchase_account: "Purchase".to_string(),
            cgst: "CGST".to_string(),
            sgst: "SGST".to_string(),
            igst: "IGST".to_string(),
            round_off: "Round Off".to_string(),
        }
    }
}

/// Complete configuration for one bridge run
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub endpoint: Endpoint,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
    pub limits: Limits,
    /// Skip bundles whose fingerprint was already seen (default on)
    pub skip_duplicates: bool,
    /// Stop before delivery and report payloads instead (default off)
    pub dry_run: bool,
    /// Also consult the external system for existing vouchers
    pub remote_dedup: bool,
    pub ledgers: LedgerNames,
    /// Audit log location; defaults to `audit.jsonl` beside the header file
    pub audit_log: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            endpoint: Endpoint::default(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            limits: Limits::default(),
            skip_duplicates: true,
            dry_run: false,
            remote_dedup: false,
            ledgers: LedgerNames::default(),
            audit_log: None,
        }
    }
}
