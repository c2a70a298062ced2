//! Voucher domain records
//!
//! This module defines the records that flow through the bridge: a voucher
//! header, its line items, and the joined bundle that validation, encoding
//! and delivery operate on.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Voucher variants supported by the bridge
///
/// Each variant maps the same bundle fields to a different accounting-entry
/// layout in the external system. The enum is closed on purpose: adding a
/// variant means adding one new case to every exhaustive match, checked at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    /// Sales invoice: party ledger on the debit side
    Sales,

    /// Purchase invoice: party ledger on the credit side
    ///
    /// Requires the supplier's document reference on the header.
    Purchase,

    /// Sales order: like a sale, but carries inventory lines
    ///
    /// Requires item code, quantity and rate on every line item.
    Order,
}

impl VoucherKind {
    /// Wire label used in the external system's voucher type attribute
    pub fn wire_label(&self) -> &'static str {
        match self {
            VoucherKind::Sales => "Sales",
            VoucherKind::Purchase => "Purchase",
            VoucherKind::Order => "Sales Order",
        }
    }
}

impl std::fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_label())
    }
}

/// One voucher header row, after schema validation
///
/// All monetary fields carry at most two decimal places; optional monetary
/// columns default to zero when the source cell is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherHeader {
    /// Voucher variant declared in the source file
    pub kind: VoucherKind,

    /// Document date (single fixed day/month/year calendar format)
    pub date: NaiveDate,

    /// Document number, the join key for line items
    pub number: String,

    /// Party ledger name in the external system
    pub party_name: String,

    /// Party tax identifier (15 alphanumeric characters when present)
    ///
    /// Carried verbatim on the wire; partially masked in audit output.
    pub party_taxid: Option<String>,

    /// Free-text reference (supplier invoice number, order reference, ...)
    pub reference: Option<String>,

    /// Declared sum of line-item taxable values
    pub taxable_total: Decimal,

    /// Declared central tax component total
    pub cgst_total: Decimal,

    /// Declared state tax component total
    pub sgst_total: Decimal,

    /// Declared integrated tax component total
    pub igst_total: Decimal,

    /// Rounding adjustment; the only monetary column allowed to be negative
    pub round_off: Decimal,

    /// Declared overall invoice amount
    pub invoice_total: Decimal,

    /// 1-based line number in the header file (header line included)
    pub source_row: usize,
}

/// One line-item row, after schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Document number linking this item to its header
    pub header_key: String,

    /// Item description, required free text
    pub description: String,

    /// Billed quantity; present together with `rate` or not at all
    pub quantity: Option<Decimal>,

    /// Unit rate; present together with `quantity` or not at all
    pub rate: Option<Decimal>,

    /// Taxable value of the line (flat value when quantity/rate are absent)
    pub taxable_value: Decimal,

    pub cgst_rate: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_rate: Decimal,
    pub sgst_amount: Decimal,
    pub igst_rate: Decimal,
    pub igst_amount: Decimal,

    /// Inventory reference, required for order vouchers
    pub item_code: Option<String>,

    /// 1-based line number in the item file (header line included)
    pub source_row: usize,
}

impl LineItem {
    /// True when the line declares any dual-component (CGST/SGST) tax
    pub fn uses_split_tax(&self) -> bool {
        !self.cgst_rate.is_zero()
            || !self.cgst_amount.is_zero()
            || !self.sgst_rate.is_zero()
            || !self.sgst_amount.is_zero()
    }

    /// True when the line declares any single-component (IGST) tax
    pub fn uses_integrated_tax(&self) -> bool {
        !self.igst_rate.is_zero() || !self.igst_amount.is_zero()
    }
}

/// One voucher: a header and its ordered line items
///
/// Invariant: bundles are only constructed by the loader, which guarantees
/// every item's `header_key` matches the header's `number` and that the item
/// list is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBundle {
    pub header: VoucherHeader,
    pub items: Vec<LineItem>,
}

impl RecordBundle {
    /// Document number of the underlying header
    pub fn document_number(&self) -> &str {
        &self.header.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case(VoucherKind::Sales, "Sales")]
    #[case(VoucherKind::Purchase, "Purchase")]
    #[case(VoucherKind::Order, "Sales Order")]
    fn test_wire_labels(#[case] kind: VoucherKind, #[case] expected: &str) {
        assert_eq!(kind.wire_label(), expected);
        assert_eq!(kind.to_string(), expected);
    }

    fn item(cgst: &str, sgst: &str, igst: &str) -> LineItem {
        LineItem {
            header_key: "INV-1".to_string(),
            description: "widget".to_string(),
            quantity: None,
            rate: None,
            taxable_value: dec("100.00"),
            cgst_rate: Decimal::ZERO,
            cgst_amount: dec(cgst),
            sgst_rate: Decimal::ZERO,
            sgst_amount: dec(sgst),
            igst_rate: Decimal::ZERO,
            igst_amount: dec(igst),
            item_code: None,
            source_row: 2,
        }
    }

    #[rstest]
    #[case::split_only("9.00", "9.00", "0", true, false)]
    #[case::integrated_only("0", "0", "18.00", false, true)]
    #[case::untaxed("0", "0", "0", false, false)]
    #[case::mixed("9.00", "0", "18.00", true, true)]
    fn test_tax_mode_flags(
        #[case] cgst: &str,
        #[case] sgst: &str,
        #[case] igst: &str,
        #[case] split: bool,
        #[case] integrated: bool,
    ) {
        let item = item(cgst, sgst, igst);
        assert_eq!(item.uses_split_tax(), split);
        assert_eq!(item.uses_integrated_tax(), integrated);
    }
}
