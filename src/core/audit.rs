//! Audit trail
//!
//! One structured JSON line per processed bundle and one per batch,
//! appended to the audit log and mirrored as tracing events. Entries are
//! written once and never updated. Audit is best-effort observability: a
//! failed write is logged and the batch carries on.
//!
//! Party tax identifiers are partially masked before they reach the log.

use crate::types::{BatchResult, DeliveryAttempt, RecordStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Mask a tax identifier, keeping the first two and last three characters
pub fn mask_tax_id(tax_id: &str) -> String {
    let chars: Vec<char> = tax_id.chars().collect();
    if chars.len() <= 5 {
        return "*".repeat(chars.len());
    }
    let mut masked = String::with_capacity(chars.len());
    masked.extend(&chars[..2]);
    masked.extend(std::iter::repeat('*').take(chars.len() - 5));
    masked.extend(&chars[chars.len() - 3..]);
    masked
}

/// One audit entry for a bundle that reached its terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub batch_id: String,
    pub document_number: String,
    /// Fingerprint digest; empty for rows that never became a bundle
    pub fingerprint: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<DeliveryAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Partially masked; the raw identifier never reaches the log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_taxid: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Append-only audit sink
///
/// Opening or writing the log can fail without consequence for the batch;
/// every failure is reported via `tracing::warn` exactly once per call.
pub struct AuditRecorder {
    path: PathBuf,
    file: Option<File>,
}

impl AuditRecorder {
    pub fn new(path: &Path) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "audit log unavailable");
                None
            }
        };
        AuditRecorder {
            path: path.to_path_buf(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one bundle's terminal outcome; called exactly once per bundle
    pub fn record_bundle(&mut self, entry: &AuditEntry) {
        tracing::info!(
            audit.document = %entry.document_number,
            audit.status = ?entry.status,
            audit.attempts = entry.attempts.len(),
            "voucher processed"
        );
        self.write_line(&serde_json::json!({ "kind": "voucher", "entry": entry }));
    }

    /// Record the batch summary; called exactly once per batch
    pub fn record_batch(&mut self, result: &BatchResult) {
        tracing::info!(
            audit.batch = %result.batch_id,
            audit.total = result.total,
            audit.successful = result.successful,
            audit.failed = result.failed,
            audit.skipped = result.skipped,
            "batch finished"
        );
        self.write_line(&serde_json::json!({ "kind": "batch", "result": result }));
    }

    fn write_line(&mut self, value: &serde_json::Value) {
        let Some(file) = self.file.as_mut() else {
            tracing::warn!(path = %self.path.display(), "audit entry dropped, log unavailable");
            return;
        };
        if let Err(error) = writeln!(file, "{}", value) {
            tracing::warn!(path = %self.path.display(), error = %error, "audit write failed");
        }
    }
}
