//! Error types for the voucher bridge
//!
//! One bridge-wide error enum covering the failure classes that abort a
//! batch or a component, plus conversions from component-local errors.
//!
//! # Error Categories
//!
//! - **Catastrophic input errors**: unreadable file, size/row limits.
//!   These abort the whole batch before any bundle is processed.
//! - **Codec errors**: a bundle missing a field its variant requires.
//! - **Transport setup errors**: the HTTP client could not be built.
//! - **Concurrency guard**: a second batch while one is in progress.
//!
//! Per-row schema findings and per-bundle validation findings are not
//! errors in this sense; they are reported through the batch result.

use crate::codec::CodecError;
use thiserror::Error;

/// Main error type for the voucher bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// File not found at the specified path
    ///
    /// Fatal: the batch never starts.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error while reading input files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// The CSV structure itself could not be read
    ///
    /// Row-level problems are schema findings, not this error; this covers
    /// a file whose header line cannot be read at all.
    #[error("CSV error in '{path}': {message}")]
    CsvError { path: String, message: String },

    /// Input file exceeds the configured size limit
    #[error("File '{path}' is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// Input file exceeds the configured row limit
    #[error("File '{path}' exceeds the {limit} row limit")]
    TooManyRows { path: String, limit: usize },

    /// The joined batch exceeds the configured bundle limit
    #[error("Batch of {bundles} vouchers exceeds the {limit} voucher limit")]
    BatchTooLarge { bundles: usize, limit: usize },

    /// Column names or order do not match the fixed contract
    #[error("File '{path}' has unexpected columns: expected [{expected}], found [{found}]")]
    ColumnMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Another delivery batch is already running in this process
    #[error("A delivery batch is already in progress")]
    BatchInProgress,

    /// The HTTP client for the external endpoint could not be built
    #[error("Failed to set up transport: {message}")]
    TransportSetup { message: String },

    /// A bundle could not be encoded for the external system
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<std::io::Error> for BridgeError {
    fn from(error: std::io::Error) -> Self {
        BridgeError::IoError {
            message: error.to_string(),
        }
    }
}

impl BridgeError {
    /// Create a FileNotFound error
    pub fn file_not_found(path: &std::path::Path) -> Self {
        BridgeError::FileNotFound {
            path: path.display().to_string(),
        }
    }

    /// Create a CsvError with path context
    pub fn csv_error(path: &std::path::Path, error: &csv::Error) -> Self {
        BridgeError::CsvError {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create a ColumnMismatch error from expected/found column lists
    pub fn column_mismatch(path: &std::path::Path, expected: &[&str], found: &[String]) -> Self {
        BridgeError::ColumnMismatch {
            path: path.display().to_string(),
            expected: expected.join(", "),
            found: found.join(", "),
        }
    }
}
