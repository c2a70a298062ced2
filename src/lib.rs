//! Voucher Bridge Library
//! # Overview
//!
//! This library ingests paired CSV files describing financial vouchers
//! (invoice headers plus line items), validates them against structural and
//! tax-compliance rules, converts validated records into the external
//! accounting system's voucher wire format, delivers them over a
//! synchronous request/response transport with retries, and records a
//! complete, idempotent audit trail per record and per batch.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (bundles, outcomes, errors)
//! - [`cli`] - CLI argument parsing
//! - [`config`] - The fixed configuration surface
//! - [`io`] - CSV reading and structural schema validation
//! - [`core`] - Business logic components:
//!   - [`core::loader`] - Joining line items to headers
//!   - [`core::rules`] - Business and tax validation
//!   - [`core::orchestrator`] - Batch sequencing with error isolation
//!   - [`core::audit`] - Append-only audit trail
//! - [`codec`] - Pure bundle-to-wire-format encoding
//! - [`delivery`] - Transport, retry/backoff and reply interpretation
//!
//! # Pipeline
//!
//! Each bundle moves strictly forward through validation, duplicate
//! checks, encoding, delivery and reply interpretation. A failure in one
//! bundle never aborts the rest of the batch: every input row ends up in
//! the final [`types::BatchResult`] with an explicit status.

pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod delivery;
pub mod io;
pub mod types;

pub use crate::core::{run_batch, BatchOptions, Orchestrator};
pub use codec::{encode, CodecError};
pub use config::BridgeConfig;
pub use delivery::{DeliveryClient, HttpTransport, MockTransport, RecordingSleeper, TokioSleeper};
pub use types::{BatchResult, BridgeError, RecordBundle, RecordResult, RecordStatus};
