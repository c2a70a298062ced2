//! Batch orchestrator
//!
//! Drives each bundle through validation, duplicate checks, encoding,
//! delivery and reply interpretation, one bundle at a time in the loader's
//! output order. States move strictly forward; a failure in one bundle
//! never prevents the remaining bundles from being attempted, and every
//! input row ends up in the batch result with an explicit status.
//!
//! Only one batch may run at a time process-wide; a second invocation is
//! rejected while one is in progress. A batch-level deadline marks
//! un-started bundles as skipped and lets the batch end cleanly.

use crate::codec;
use crate::config::{BridgeConfig, LedgerNames};
use crate::core::audit::{mask_tax_id, AuditEntry, AuditRecorder};
use crate::core::fingerprint::{to_hex, VoucherFingerprint};
use crate::core::loader::{join, LoadReject};
use crate::core::registry::{DuplicateRegistry, InMemoryRegistry, RemoteRegistry};
use crate::core::rules::ValidationEngine;
use crate::delivery::client::{DeliveryClient, Sleeper};
use crate::delivery::reply::{interpret, ReplyOutcome};
use crate::delivery::transport::Transport;
use crate::io::reader::read_rows;
use crate::io::schema::{
    parse_header_rows, parse_item_rows, RawHeaderRow, RawItemRow, HEADER_COLUMNS, ITEM_COLUMNS,
};
use crate::types::{
    BatchResult, BridgeError, RecordBundle, RecordResult, RecordStatus,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Process-wide flag: only one delivery batch at a time
static BATCH_ACTIVE: AtomicBool = AtomicBool::new(false);

/// RAII guard for the single-batch invariant
pub struct BatchGuard;

impl BatchGuard {
    /// Claim the batch slot, failing if another batch holds it
    pub fn acquire() -> Result<Self, BridgeError> {
        BATCH_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BatchGuard)
            .map_err(|_| BridgeError::BatchInProgress)
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        BATCH_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Per-run options that are not part of the fixed configuration surface
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Wall-clock budget for the whole batch, measured from its start;
    /// bundles not yet started when it passes are marked skipped
    pub deadline: Option<Duration>,
}

/// The batch orchestrator
///
/// Owns the delivery client, the duplicate registries and the audit sink
/// for the duration of one batch; none of them are shared with anything
/// else while it runs.
pub struct Orchestrator<T: Transport, S: Sleeper> {
    client: DeliveryClient<T, S>,
    engine: ValidationEngine,
    batch_registry: InMemoryRegistry,
    remote_registry: Option<Box<dyn DuplicateRegistry>>,
    recorder: AuditRecorder,
    ledgers: LedgerNames,
    skip_duplicates: bool,
    dry_run: bool,
    deadline: Option<Duration>,
}

impl<T: Transport, S: Sleeper> Orchestrator<T, S> {
    pub fn new(client: DeliveryClient<T, S>, recorder: AuditRecorder, ledgers: LedgerNames) -> Self {
        Orchestrator {
            client,
            engine: ValidationEngine::new(),
            batch_registry: InMemoryRegistry::new(),
            remote_registry: None,
            recorder,
            ledgers,
            skip_duplicates: true,
            dry_run: false,
            deadline: None,
        }
    }

    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_remote_registry(mut self, registry: Box<dyn DuplicateRegistry>) -> Self {
        self.remote_registry = Some(registry);
        self
    }

    pub fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run one batch to completion
    ///
    /// `rejects` are row sets the loader or schema layer already refused;
    /// they are reported up front so nothing is silently dropped.
    pub async fn run(
        &mut self,
        batch_id: String,
        started_at: DateTime<Utc>,
        bundles: Vec<RecordBundle>,
        rejects: Vec<LoadReject>,
    ) -> BatchResult {
        let clock = Instant::now();
        let mut results: Vec<RecordResult> = Vec::with_capacity(rejects.len() + bundles.len());

        for reject in rejects {
            tracing::warn!(document = %reject.document_number, reason = %reject.reason, "row set rejected");
            results.push(
                RecordResult::new(reject.document_number, RecordStatus::SkippedInvalid)
                    .with_error(reject.reason),
            );
        }

        for bundle in bundles {
            let deadline_passed = self
                .deadline
                .map(|d| clock.elapsed() >= d)
                .unwrap_or(false);
            if deadline_passed {
                let result = self.skip_for_deadline(&batch_id, &bundle);
                results.push(result);
                continue;
            }
            let result = self.process_bundle(&batch_id, bundle).await;
            results.push(result);
        }

        let batch = BatchResult::summarize(
            batch_id,
            started_at,
            Utc::now(),
            results,
            self.recorder.path().display().to_string(),
        );
        self.recorder.record_batch(&batch);
        batch
    }

    /// Drive one bundle to its terminal state
    async fn process_bundle(&mut self, batch_id: &str, bundle: RecordBundle) -> RecordResult {
        let document = bundle.header.number.clone();
        let bundle_started = Utc::now();
        tracing::info!(document = %document, kind = %bundle.header.kind, "voucher loaded");

        let fingerprint = VoucherFingerprint::of(&bundle.header);
        let outcome = self.engine.validate(&bundle);
        let findings = outcome.messages();
        if outcome.blocks_delivery() {
            tracing::warn!(document = %document, findings = findings.len(), "validation failed");
            let mut result = RecordResult::new(&document, RecordStatus::FailedValidation)
                .with_error("business validation failed");
            result.findings = findings.clone();
            self.audit(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
            return result;
        }
        tracing::debug!(document = %document, "voucher validated");

        if self.skip_duplicates {
            if self.batch_registry.lookup(&fingerprint).await {
                let result = RecordResult::new(&document, RecordStatus::SkippedDuplicate)
                    .with_error("duplicate of an earlier voucher in this batch");
                self.audit(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
                return result;
            }
            if let Some(remote) = self.remote_registry.as_mut() {
                if remote.lookup(&fingerprint).await {
                    let result = RecordResult::new(&document, RecordStatus::SkippedDuplicate)
                        .with_error("voucher already exists in the external system");
                    self.audit(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
                    return result;
                }
            }
        }
        self.batch_registry.record(&fingerprint);

        let payload = match codec::encode(&bundle, &self.ledgers) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(document = %document, error = %error, "encoding failed");
                let mut result = RecordResult::new(&document, RecordStatus::FailedValidation)
                    .with_error(error.to_string());
                result.findings = findings.clone();
                self.audit(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
                return result;
            }
        };
        tracing::debug!(document = %document, bytes = payload.len(), "voucher encoded");

        if self.dry_run {
            let mut result = RecordResult::new(&document, RecordStatus::Delivered);
            result.findings = findings.clone();
            result.payload = Some(payload);
            self.audit(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
            return result;
        }

        let mut record = self.client.deliver(&payload).await;
        let reply = record.reply.take();
        let mut result = match reply {
            None => {
                let message = record
                    .last_transport_error()
                    .unwrap_or("transport failed")
                    .to_string();
                RecordResult::new(&document, RecordStatus::FailedDelivery).with_error(format!(
                    "transport failed after {} attempt(s): {}",
                    record.attempts.len(),
                    message
                ))
            }
            Some(raw) => match interpret(&raw) {
                ReplyOutcome::Created { external_id } => {
                    if let Some(id) = &external_id {
                        record.set_external_id(id);
                    }
                    if let Some(remote) = self.remote_registry.as_mut() {
                        remote.record(&fingerprint);
                    }
                    tracing::info!(document = %document, external_id = ?external_id, "voucher delivered");
                    let mut result = RecordResult::new(&document, RecordStatus::Delivered);
                    result.external_id = external_id;
                    result
                }
                ReplyOutcome::Rejected { messages } => {
                    record.mark_rejected();
                    let error = if messages.is_empty() {
                        "rejected by external system".to_string()
                    } else {
                        format!("rejected by external system: {}", messages.join("; "))
                    };
                    tracing::warn!(document = %document, error = %error, "voucher rejected");
                    RecordResult::new(&document, RecordStatus::FailedDelivery).with_error(error)
                }
                ReplyOutcome::Malformed { detail } => {
                    tracing::warn!(document = %document, detail = %detail, "unparsable reply");
                    RecordResult::new(&document, RecordStatus::FailedDelivery)
                        .with_error(format!("unparsable reply from external system: {}", detail))
                }
            },
        };
        result.findings = findings.clone();

        let mut entry = self.entry(batch_id, &bundle, &fingerprint, &result, findings, bundle_started);
        entry.attempts = record.attempts;
        self.recorder.record_bundle(&entry);
        result
    }

    fn skip_for_deadline(&mut self, batch_id: &str, bundle: &RecordBundle) -> RecordResult {
        tracing::warn!(document = %bundle.header.number, "batch deadline exceeded, not attempting");
        let result = RecordResult::new(&bundle.header.number, RecordStatus::Skipped)
            .with_error("batch deadline exceeded before this voucher was attempted");
        let now = Utc::now();
        let fingerprint = VoucherFingerprint::of(&bundle.header);
        let entry = self.entry(batch_id, bundle, &fingerprint, &result, Vec::new(), now);
        self.recorder.record_bundle(&entry);
        result
    }

    fn audit(
        &mut self,
        batch_id: &str,
        bundle: &RecordBundle,
        fingerprint: &VoucherFingerprint,
        result: &RecordResult,
        findings: Vec<String>,
        started_at: DateTime<Utc>,
    ) {
        let entry = self.entry(batch_id, bundle, fingerprint, result, findings, started_at);
        self.recorder.record_bundle(&entry);
    }

    fn entry(
        &self,
        batch_id: &str,
        bundle: &RecordBundle,
        fingerprint: &VoucherFingerprint,
        result: &RecordResult,
        findings: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry {
            batch_id: batch_id.to_string(),
            document_number: bundle.header.number.clone(),
            fingerprint: fingerprint.digest().to_string(),
            status: result.status,
            findings,
            attempts: Vec::new(),
            external_id: result.external_id.clone(),
            party_taxid: bundle.header.party_taxid.as_deref().map(mask_tax_id),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Run the whole pipeline for one pair of input files
///
/// Reads and schema-validates both CSVs, joins them into bundles, then
/// hands everything to the orchestrator. Catastrophic input problems
/// (unreadable file, limits exceeded) abort here, before any bundle is
/// processed, and surface as a single top-level error.
pub async fn run_batch<T: Transport + 'static, S: Sleeper>(
    config: &BridgeConfig,
    header_path: &Path,
    items_path: &Path,
    transport: T,
    sleeper: S,
    options: BatchOptions,
) -> Result<BatchResult, BridgeError> {
    let _guard = BatchGuard::acquire()?;
    let started_at = Utc::now();

    let header_rows = read_rows::<RawHeaderRow>(header_path, &HEADER_COLUMNS, &config.limits)?;
    let item_rows = read_rows::<RawItemRow>(items_path, &ITEM_COLUMNS, &config.limits)?;

    let (headers, header_findings) = parse_header_rows(header_rows);
    let (items, item_findings) = parse_item_rows(item_rows);

    // One reject per offending row set, all of its findings joined
    let mut rejects: Vec<LoadReject> = Vec::new();
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for finding in header_findings.into_iter().chain(item_findings) {
        let subject = finding.subject();
        match grouped.iter_mut().find(|(s, _)| *s == subject) {
            Some((_, messages)) => messages.push(finding.to_string()),
            None => grouped.push((subject, vec![finding.to_string()])),
        }
    }
    for (subject, messages) in grouped {
        rejects.push(LoadReject {
            document_number: subject,
            reason: messages.join("; "),
        });
    }

    let load = join(headers, items);
    rejects.extend(load.rejects);

    if load.bundles.len() > config.limits.max_batch_size {
        return Err(BridgeError::BatchTooLarge {
            bundles: load.bundles.len(),
            limit: config.limits.max_batch_size,
        });
    }

    let batch_id = make_batch_id(started_at, header_path, items_path);
    tracing::info!(
        batch = %batch_id,
        bundles = load.bundles.len(),
        rejects = rejects.len(),
        dry_run = config.dry_run,
        "batch loaded"
    );

    let audit_path = config
        .audit_log
        .clone()
        .unwrap_or_else(|| header_path.with_file_name("audit.jsonl"));
    let recorder = AuditRecorder::new(&audit_path);

    let client = DeliveryClient::new(transport.clone(), sleeper, config.retry);
    let mut orchestrator = Orchestrator::new(client, recorder, config.ledgers.clone())
        .with_skip_duplicates(config.skip_duplicates)
        .with_dry_run(config.dry_run)
        .with_deadline(options.deadline);
    if config.remote_dedup {
        orchestrator =
            orchestrator.with_remote_registry(Box::new(RemoteRegistry::new(transport)));
    }

    Ok(orchestrator
        .run(batch_id, started_at, load.bundles, rejects)
        .await)
}

/// Batch identifier: start timestamp plus a short digest of the input paths
fn make_batch_id(started_at: DateTime<Utc>, header_path: &Path, items_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(header_path.display().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(items_path.display().to_string().as_bytes());
    hasher.update(
        started_at
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    let digest = to_hex(&hasher.finalize());
    format!("{}-{}", started_at.format("%Y%m%d%H%M%S"), &digest[..8])
}
