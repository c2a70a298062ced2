//! Core types for the voucher bridge
//!
//! This module contains the domain records parsed from the input CSVs,
//! the outcome types produced while a batch runs, and the bridge-wide
//! error type.

pub mod error;
pub mod outcome;
pub mod voucher;

pub use error::BridgeError;
pub use outcome::{
    AttemptOutcome, BatchResult, DeliveryAttempt, Finding, RecordResult, RecordStatus, Severity,
    ValidationOutcome, ValidationStatus,
};
pub use voucher::{LineItem, RecordBundle, VoucherHeader, VoucherKind};
