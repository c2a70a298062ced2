//! Business logic components
//!
//! - [`loader`] - joins the two validated row sets into record bundles
//! - [`rules`] - business and tax validation over one bundle
//! - [`fingerprint`] - normalized voucher identity for duplicate detection
//! - [`registry`] - intra-batch and cross-run duplicate registries
//! - [`orchestrator`] - drives bundles through the delivery pipeline
//! - [`audit`] - append-only audit trail

pub mod audit;
pub mod fingerprint;
pub mod loader;
pub mod orchestrator;
pub mod registry;
pub mod rules;

pub use audit::{mask_tax_id, AuditEntry, AuditRecorder};
pub use fingerprint::VoucherFingerprint;
pub use loader::{join, LoadOutcome, LoadReject};
pub use orchestrator::{run_batch, BatchGuard, BatchOptions, Orchestrator};
pub use registry::{DuplicateRegistry, InMemoryRegistry, RemoteRegistry};
pub use rules::{RuleToggles, ValidationEngine, LINE_TOLERANCE, TOTAL_TOLERANCE};
