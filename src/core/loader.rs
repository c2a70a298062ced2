//! Record loader and joiner
//!
//! Joins validated line-item rows to validated header rows by document
//! number. Orphan items, headers with zero line items and duplicate header
//! keys are reported without failing the batch; the first occurrence of a
//! duplicated key wins and later ones become conflicts. Bundle order
//! follows the header file's row order, which is the processing order the
//! orchestrator uses.

use crate::types::{LineItem, RecordBundle, VoucherHeader};
use std::collections::HashMap;

/// A row set that never became a deliverable bundle, and why
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReject {
    pub document_number: String,
    pub reason: String,
}

/// Everything the loader produced for one batch
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Joinable bundles, in header-file row order
    pub bundles: Vec<RecordBundle>,
    /// Rejected row sets, in the order they were discovered
    pub rejects: Vec<LoadReject>,
}

/// Join items to headers by document number
pub fn join(headers: Vec<VoucherHeader>, items: Vec<LineItem>) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    // Group items by key, remembering first-seen order for orphan reporting
    let mut groups: HashMap<String, Vec<LineItem>> = HashMap::new();
    let mut group_order: Vec<String> = Vec::new();
    for item in items {
        if !groups.contains_key(&item.header_key) {
            group_order.push(item.header_key.clone());
        }
        groups.entry(item.header_key.clone()).or_default().push(item);
    }

    let mut seen_numbers: HashMap<String, usize> = HashMap::new();
    for header in headers {
        if let Some(first_row) = seen_numbers.get(&header.number) {
            tracing::warn!(
                document = %header.number,
                row = header.source_row,
                "duplicate header key, first occurrence wins"
            );
            outcome.rejects.push(LoadReject {
                document_number: header.number.clone(),
                reason: format!(
                    "duplicate header key at row {} conflicts with row {}",
                    header.source_row, first_row
                ),
            });
            continue;
        }
        seen_numbers.insert(header.number.clone(), header.source_row);

        match groups.remove(&header.number) {
            Some(items) => outcome.bundles.push(RecordBundle { header, items }),
            None => {
                outcome.rejects.push(LoadReject {
                    document_number: header.number.clone(),
                    reason: "header has no matching line items".to_string(),
                });
            }
        }
    }

    // Whatever is left in the groups never matched a header
    for key in group_order {
        if let Some(items) = groups.remove(&key) {
            outcome.rejects.push(LoadReject {
                document_number: key,
                reason: format!(
                    "{} line item(s) have no matching header",
                    items.len()
                ),
            });
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoucherKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn header(number: &str, row: usize) -> VoucherHeader {
        VoucherHeader {
            kind: VoucherKind::Sales,
            date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            number: number.to_string(),
            party_name: "Acme".to_string(),
            party_taxid: None,
            reference: None,
            taxable_total: Decimal::new(10000, 2),
            cgst_total: Decimal::ZERO,
            sgst_total: Decimal::ZERO,
            igst_total: Decimal::ZERO,
            round_off: Decimal::ZERO,
            invoice_total: Decimal::new(10000, 2),
            source_row: row,
        }
    }

    fn item(key: &str, row: usize) -> LineItem {
        LineItem {
            header_key: key.to_string(),
            description: "Widget".to_string(),
            quantity: None,
            rate: None,
            taxable_value: Decimal::new(10000, 2),
            cgst_rate: Decimal::ZERO,
            cgst_amount: Decimal::ZERO,
            sgst_rate: Decimal::ZERO,
            sgst_amount: Decimal::ZERO,
            igst_rate: Decimal::ZERO,
            igst_amount: Decimal::ZERO,
            item_code: None,
            source_row: row,
        }
    }

    #[test]
    fn test_join_preserves_header_order() {
        let outcome = join(
            vec![header("INV-2", 2), header("INV-1", 3)],
            vec![item("INV-1", 2), item("INV-2", 3)],
        );
        assert!(outcome.rejects.is_empty());
        let numbers: Vec<_> = outcome
            .bundles
            .iter()
            .map(|b| b.document_number().to_string())
            .collect();
        assert_eq!(numbers, vec!["INV-2", "INV-1"]);
    }

    #[test]
    fn test_items_keep_file_order_within_bundle() {
        let outcome = join(
            vec![header("INV-1", 2)],
            vec![item("INV-1", 4), item("INV-1", 2), item("INV-1", 3)],
        );
        let rows: Vec<_> = outcome.bundles[0].items.iter().map(|i| i.source_row).collect();
        assert_eq!(rows, vec![4, 2, 3]);
    }

    #[test]
    fn test_header_with_zero_items_is_rejected() {
        let outcome = join(vec![header("INV-1", 2)], vec![]);
        assert!(outcome.bundles.is_empty());
        assert_eq!(outcome.rejects.len(), 1);
        assert_eq!(outcome.rejects[0].document_number, "INV-1");
        assert!(outcome.rejects[0].reason.contains("no matching line items"));
    }

    #[test]
    fn test_orphan_items_are_rejected_as_a_group() {
        let outcome = join(
            vec![header("INV-1", 2)],
            vec![item("INV-1", 2), item("INV-9", 3), item("INV-9", 4)],
        );
        assert_eq!(outcome.bundles.len(), 1);
        assert_eq!(outcome.rejects.len(), 1);
        assert_eq!(outcome.rejects[0].document_number, "INV-9");
        assert!(outcome.rejects[0].reason.contains("2 line item(s)"));
    }

    #[test]
    fn test_duplicate_header_first_occurrence_wins() {
        let mut second = header("INV-1", 3);
        second.party_name = "Other Party".to_string();
        let outcome = join(
            vec![header("INV-1", 2), second],
            vec![item("INV-1", 2)],
        );
        assert_eq!(outcome.bundles.len(), 1);
        assert_eq!(outcome.bundles[0].header.party_name, "Acme");
        assert_eq!(outcome.rejects.len(), 1);
        assert!(outcome.rejects[0]
            .reason
            .contains("duplicate header key at row 3 conflicts with row 2"));
    }

    #[test]
    fn test_mixed_batch_reports_everything() {
        let outcome = join(
            vec![header("INV-1", 2), header("INV-2", 3), header("INV-2", 4)],
            vec![item("INV-1", 2), item("INV-2", 3), item("ORPHAN", 4)],
        );
        assert_eq!(outcome.bundles.len(), 2);
        assert_eq!(outcome.rejects.len(), 2);
    }
}
