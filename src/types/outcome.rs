//! Outcome types produced while a batch runs
//!
//! Validation findings, delivery attempts, per-record terminal statuses and
//! the immutable batch summary consumed by the external caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational; never blocks delivery
    Warning,
    /// Blocks delivery of the affected bundle
    Error,
}

/// One validation finding: severity, field path and a human-readable message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", tag, self.field, self.message)
    }
}

/// Tri-state status derived from a bundle's findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

/// Result of running the validation engine over one bundle
///
/// Findings accumulate in rule order; any error-severity finding forces the
/// overall status to `Error` and blocks delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub findings: Vec<Finding>,
}

impl ValidationOutcome {
    pub fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn status(&self) -> ValidationStatus {
        if self
            .findings
            .iter()
            .any(|f| f.severity == Severity::Error)
        {
            ValidationStatus::Error
        } else if self.findings.is_empty() {
            ValidationStatus::Ok
        } else {
            ValidationStatus::Warning
        }
    }

    /// True when the bundle must not be delivered
    pub fn blocks_delivery(&self) -> bool {
        self.status() == ValidationStatus::Error
    }

    /// Findings rendered as display strings, for results and audit entries
    pub fn messages(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.to_string()).collect()
    }
}

/// Outcome of one transport exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// Transport succeeded; the reply may still carry a rejection
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
    },
    /// Connection refused, timeout or reset; retried per the backoff policy
    TransportError { message: String },
    /// Application-level rejection carried inside a successful response
    Rejected,
}

/// One transport exchange for one bundle
///
/// A bundle accumulates attempts in order; the sequence ends at the first
/// success or when the retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Attempt number, 1-based
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Terminal status of one record in the batch result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Voucher created in the external system
    #[serde(rename = "SUCCESS")]
    Delivered,
    /// Blocked by an error-severity validation (or codec) finding
    #[serde(rename = "FAILED_VALIDATION")]
    FailedValidation,
    /// Retries exhausted, rejection, or unparsable reply
    #[serde(rename = "FAILED_DELIVERY")]
    FailedDelivery,
    /// Fingerprint already seen in this batch or in the external system
    #[serde(rename = "SKIPPED_DUPLICATE")]
    SkippedDuplicate,
    /// Never became a joinable, well-formed bundle
    #[serde(rename = "SKIPPED_INVALID")]
    SkippedInvalid,
    /// Not attempted: the batch deadline passed first
    #[serde(rename = "SKIPPED")]
    Skipped,
}

impl RecordStatus {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            RecordStatus::SkippedDuplicate | RecordStatus::SkippedInvalid | RecordStatus::Skipped
        )
    }
}

/// Terminal outcome of one record, as reported to the external caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    pub document_number: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Validation findings for this record, empty unless validation ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,
    /// Generated payload; present only in dry-run mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl RecordResult {
    pub fn new(document_number: impl Into<String>, status: RecordStatus) -> Self {
        RecordResult {
            document_number: document_number.into(),
            status,
            external_id: None,
            error: None,
            findings: Vec::new(),
            payload: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Immutable summary of one batch run
///
/// Created once when the orchestrator finishes and never mutated afterwards;
/// consumed by the audit sink and the external caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<RecordResult>,
    pub audit_log_path: String,
}

impl BatchResult {
    /// Build the summary from per-record results, computing the aggregates
    pub fn summarize(
        batch_id: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: Vec<RecordResult>,
        audit_log_path: String,
    ) -> Self {
        let successful = results
            .iter()
            .filter(|r| r.status == RecordStatus::Delivered)
            .count();
        let failed = results
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    RecordStatus::FailedValidation | RecordStatus::FailedDelivery
                )
            })
            .count();
        let skipped = results.iter().filter(|r| r.status.is_skip()).count();

        BatchResult {
            batch_id,
            started_at,
            finished_at,
            total: results.len(),
            successful,
            failed,
            skipped,
            results,
            audit_log_path,
        }
    }
}
