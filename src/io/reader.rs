//! CSV file reading with input guardrails
//!
//! Reads one delimited file into raw string rows, enforcing the size and
//! row limits up front. Limit violations and unreadable files are
//! catastrophic: they abort the batch before any bundle is processed.
//! A row the CSV layer cannot deserialize is yielded as an `Err` with the
//! csv error text so the schema layer can report it without aborting.

use crate::config::Limits;
use crate::types::BridgeError;
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read all rows of one CSV file into raw records
///
/// The header line must match `expected_columns` exactly, in names and in
/// order; anything else is a [`BridgeError::ColumnMismatch`]. Data rows are
/// numbered from 2 (line 1 is the column header) and returned in file order.
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, exceeds the size
/// or row limit, or its column header does not match the contract.
pub fn read_rows<T: DeserializeOwned>(
    path: &Path,
    expected_columns: &[&str],
    limits: &Limits,
) -> Result<Vec<(usize, Result<T, String>)>, BridgeError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BridgeError::file_not_found(path),
        _ => BridgeError::from(e),
    })?;
    if metadata.len() > limits.max_file_size {
        return Err(BridgeError::FileTooLarge {
            path: path.display().to_string(),
            size: metadata.len(),
            limit: limits.max_file_size,
        });
    }

    let file = fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BridgeError::file_not_found(path),
        _ => BridgeError::from(e),
    })?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| BridgeError::csv_error(path, &e))?;
    let found: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    if found != expected_columns {
        return Err(BridgeError::column_mismatch(path, expected_columns, &found));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        if rows.len() >= limits.max_rows {
            return Err(BridgeError::TooManyRows {
                path: path.display().to_string(),
                limit: limits.max_rows,
            });
        }
        let row = index + 2;
        rows.push((row, record.map_err(|e| e.to_string())));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::schema::{RawHeaderRow, HEADER_COLUMNS};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const HEADER_LINE: &str = "voucher_type,voucher_date,voucher_number,party_name,party_taxid,reference,taxable_total,cgst_total,sgst_total,igst_total,round_off,invoice_total";

    #[test]
    fn test_read_rows_in_file_order() {
        let content = format!(
            "{}\nsales,15/04/2024,INV-001,Acme,,,100.00,,,,,100.00\nsales,16/04/2024,INV-002,Acme,,,200.00,,,,,200.00\n",
            HEADER_LINE
        );
        let file = create_temp_csv(&content);

        let rows =
            read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &Limits::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[1].0, 3);
        assert_eq!(rows[0].1.as_ref().unwrap().voucher_number, "INV-001");
        assert_eq!(rows[1].1.as_ref().unwrap().voucher_number, "INV-002");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = read_rows::<RawHeaderRow>(
            Path::new("no_such_file.csv"),
            &HEADER_COLUMNS,
            &Limits::default(),
        );
        assert!(matches!(result, Err(BridgeError::FileNotFound { .. })));
    }

    #[test]
    fn test_column_mismatch_is_fatal() {
        let file = create_temp_csv("voucher_type,voucher_date\nsales,15/04/2024\n");
        let result =
            read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &Limits::default());
        assert!(matches!(result, Err(BridgeError::ColumnMismatch { .. })));
    }

    #[test]
    fn test_reordered_columns_are_a_mismatch() {
        // Same names, different order: still a contract violation
        let reordered = HEADER_LINE.replacen(
            "voucher_type,voucher_date",
            "voucher_date,voucher_type",
            1,
        );
        let file = create_temp_csv(&format!("{}\n", reordered));
        let result =
            read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &Limits::default());
        assert!(matches!(result, Err(BridgeError::ColumnMismatch { .. })));
    }

    #[test]
    fn test_row_limit_is_fatal() {
        let content = format!(
            "{}\nsales,15/04/2024,INV-001,Acme,,,100.00,,,,,100.00\nsales,16/04/2024,INV-002,Acme,,,200.00,,,,,200.00\n",
            HEADER_LINE
        );
        let file = create_temp_csv(&content);
        let limits = Limits {
            max_rows: 1,
            ..Limits::default()
        };

        let result = read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &limits);
        assert!(matches!(result, Err(BridgeError::TooManyRows { .. })));
    }

    #[test]
    fn test_file_size_limit_is_fatal() {
        let content = format!("{}\n", HEADER_LINE);
        let file = create_temp_csv(&content);
        let limits = Limits {
            max_file_size: 8,
            ..Limits::default()
        };

        let result = read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &limits);
        assert!(matches!(result, Err(BridgeError::FileTooLarge { .. })));
    }

    #[test]
    fn test_short_row_is_reported_not_fatal() {
        let content = format!("{}\nsales,15/04/2024,INV-001\n", HEADER_LINE);
        let file = create_temp_csv(&content);

        let rows =
            read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &Limits::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].1.is_err());
    }

    #[test]
    fn test_empty_file_after_header_yields_no_rows() {
        let file = create_temp_csv(&format!("{}\n", HEADER_LINE));
        let rows =
            read_rows::<RawHeaderRow>(file.path(), &HEADER_COLUMNS, &Limits::default()).unwrap();
        assert!(rows.is_empty());
    }
}
