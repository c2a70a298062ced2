//! Structural schema validation for the two CSV contracts
//!
//! Each file has a fixed column specification: exact names, exact order.
//! Raw rows are deserialized into all-string records first, then converted
//! to typed records here, collecting one finding per offending column
//! rather than stopping at the first problem. Malformed rows are reported
//! and excluded from joining; they never abort the file.
//!
//! Format rules: monetary values carry at most two decimal places, dates
//! must match a single fixed day/month/year format, and the party tax id
//! must be 15 alphanumeric characters when present.

use crate::types::{LineItem, VoucherHeader, VoucherKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Column contract for the header file, in order
pub const HEADER_COLUMNS: [&str; 12] = [
    "voucher_type",
    "voucher_date",
    "voucher_number",
    "party_name",
    "party_taxid",
    "reference",
    "taxable_total",
    "cgst_total",
    "sgst_total",
    "igst_total",
    "round_off",
    "invoice_total",
];

/// Column contract for the line-item file, in order
pub const ITEM_COLUMNS: [&str; 12] = [
    "voucher_number",
    "description",
    "quantity",
    "rate",
    "taxable_value",
    "cgst_rate",
    "cgst_amount",
    "sgst_rate",
    "sgst_amount",
    "igst_rate",
    "igst_amount",
    "item_code",
];

/// The calendar format every date column must match exactly
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Raw header row as deserialized from CSV, all fields as strings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawHeaderRow {
    pub voucher_type: String,
    pub voucher_date: String,
    pub voucher_number: String,
    pub party_name: String,
    pub party_taxid: String,
    pub reference: String,
    pub taxable_total: String,
    pub cgst_total: String,
    pub sgst_total: String,
    pub igst_total: String,
    pub round_off: String,
    pub invoice_total: String,
}

/// Raw line-item row as deserialized from CSV, all fields as strings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawItemRow {
    pub voucher_number: String,
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub taxable_value: String,
    pub cgst_rate: String,
    pub cgst_amount: String,
    pub sgst_rate: String,
    pub sgst_amount: String,
    pub igst_rate: String,
    pub igst_amount: String,
    pub item_code: String,
}

/// One structural finding: row, column and what was wrong
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFinding {
    /// 1-based line number in the file (line 1 is the column header)
    pub row: usize,
    pub column: String,
    pub message: String,
    /// Document number of the offending row, when it could be read
    pub document_number: Option<String>,
}

impl SchemaFinding {
    /// Label for batch-result reporting: the document number when known,
    /// otherwise the row position
    pub fn subject(&self) -> String {
        match &self.document_number {
            Some(number) => number.clone(),
            None => format!("row {}", self.row),
        }
    }
}

impl std::fmt::Display for SchemaFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}, column {}: {}", self.row, self.column, self.message)
    }
}

/// Collects findings for one row while its columns are parsed
struct RowContext<'a> {
    row: usize,
    document_number: Option<String>,
    findings: &'a mut Vec<SchemaFinding>,
    count_before: usize,
}

impl<'a> RowContext<'a> {
    fn new(row: usize, findings: &'a mut Vec<SchemaFinding>) -> Self {
        let count_before = findings.len();
        RowContext {
            row,
            document_number: None,
            findings,
            count_before,
        }
    }

    fn report(&mut self, column: &str, message: impl Into<String>) {
        self.findings.push(SchemaFinding {
            row: self.row,
            column: column.to_string(),
            message: message.into(),
            document_number: self.document_number.clone(),
        });
    }

    /// True when this row produced no findings
    fn clean(&self) -> bool {
        self.findings.len() == self.count_before
    }
}

fn required_text(ctx: &mut RowContext<'_>, column: &str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        ctx.report(column, "is required");
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a monetary column: at most two decimal places, non-negative unless
/// `allow_negative`. Empty input yields zero when not required.
fn parse_money(
    ctx: &mut RowContext<'_>,
    column: &str,
    value: &str,
    required: bool,
    allow_negative: bool,
) -> Decimal {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if required {
            ctx.report(column, "is required");
        }
        return Decimal::ZERO;
    }
    match Decimal::from_str(trimmed) {
        Ok(amount) => {
            if amount.scale() > 2 {
                ctx.report(column, format!("'{}' has more than two decimal places", trimmed));
                Decimal::ZERO
            } else if amount.is_sign_negative() && !amount.is_zero() && !allow_negative {
                ctx.report(column, format!("'{}' must not be negative", trimmed));
                Decimal::ZERO
            } else {
                amount
            }
        }
        Err(_) => {
            ctx.report(column, format!("'{}' is not a valid amount", trimmed));
            Decimal::ZERO
        }
    }
}

/// Parse an optional non-negative numeric column (tax rates, quantities)
fn parse_numeric(ctx: &mut RowContext<'_>, column: &str, value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Decimal::from_str(trimmed) {
        Ok(number) if number.is_sign_negative() && !number.is_zero() => {
            ctx.report(column, format!("'{}' must not be negative", trimmed));
            None
        }
        Ok(number) => Some(number),
        Err(_) => {
            ctx.report(column, format!("'{}' is not a valid number", trimmed));
            None
        }
    }
}

fn parse_date(ctx: &mut RowContext<'_>, column: &str, value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        ctx.report(column, "is required");
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            ctx.report(
                column,
                format!("'{}' does not match the dd/mm/yyyy format", trimmed),
            );
            None
        }
    }
}

fn parse_kind(ctx: &mut RowContext<'_>, column: &str, value: &str) -> Option<VoucherKind> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        ctx.report(column, "is required");
        return None;
    }
    match trimmed.to_lowercase().as_str() {
        "sales" => Some(VoucherKind::Sales),
        "purchase" => Some(VoucherKind::Purchase),
        "order" => Some(VoucherKind::Order),
        other => {
            ctx.report(column, format!("'{}' is not a known voucher type", other));
            None
        }
    }
}

fn parse_taxid(ctx: &mut RowContext<'_>, column: &str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() == 15 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(trimmed.to_string())
    } else {
        ctx.report(
            column,
            format!("'{}' is not a 15-character alphanumeric tax id", trimmed),
        );
        None
    }
}

/// Validate raw header rows into typed headers
///
/// Rows that produced any finding are excluded from the returned headers;
/// all findings are returned alongside. Rows the CSV layer could not even
/// deserialize arrive as `Err` and become a single whole-row finding.
pub fn parse_header_rows(
    raw: Vec<(usize, Result<RawHeaderRow, String>)>,
) -> (Vec<VoucherHeader>, Vec<SchemaFinding>) {
    let mut headers = Vec::new();
    let mut findings = Vec::new();

    for (row, record) in raw {
        let record = match record {
            Ok(record) => record,
            Err(message) => {
                findings.push(SchemaFinding {
                    row,
                    column: "(row)".to_string(),
                    message,
                    document_number: None,
                });
                continue;
            }
        };

        let mut ctx = RowContext::new(row, &mut findings);
        ctx.document_number = optional_text(&record.voucher_number);

        let kind = parse_kind(&mut ctx, "voucher_type", &record.voucher_type);
        let date = parse_date(&mut ctx, "voucher_date", &record.voucher_date);
        let number = required_text(&mut ctx, "voucher_number", &record.voucher_number);
        let party_name = required_text(&mut ctx, "party_name", &record.party_name);
        let party_taxid = parse_taxid(&mut ctx, "party_taxid", &record.party_taxid);
        let reference = optional_text(&record.reference);
        let taxable_total = parse_money(&mut ctx, "taxable_total", &record.taxable_total, true, false);
        let cgst_total = parse_money(&mut ctx, "cgst_total", &record.cgst_total, false, false);
        let sgst_total = parse_money(&mut ctx, "sgst_total", &record.sgst_total, false, false);
        let igst_total = parse_money(&mut ctx, "igst_total", &record.igst_total, false, false);
        let round_off = parse_money(&mut ctx, "round_off", &record.round_off, false, true);
        let invoice_total = parse_money(&mut ctx, "invoice_total", &record.invoice_total, true, false);

        if !ctx.clean() {
            continue;
        }
        // A clean row implies every required parse produced a value
        if let (Some(kind), Some(date), Some(number), Some(party_name)) =
            (kind, date, number, party_name)
        {
            headers.push(VoucherHeader {
                kind,
                date,
                number,
                party_name,
                party_taxid,
                reference,
                taxable_total,
                cgst_total,
                sgst_total,
                igst_total,
                round_off,
                invoice_total,
                source_row: row,
            });
        }
    }

    (headers, findings)
}

/// Validate raw line-item rows into typed items
///
/// The quantity/rate pair is conditional: both present or both empty.
pub fn parse_item_rows(
    raw: Vec<(usize, Result<RawItemRow, String>)>,
) -> (Vec<LineItem>, Vec<SchemaFinding>) {
    let mut items = Vec::new();
    let mut findings = Vec::new();

    for (row, record) in raw {
        let record = match record {
            Ok(record) => record,
            Err(message) => {
                findings.push(SchemaFinding {
                    row,
                    column: "(row)".to_string(),
                    message,
                    document_number: None,
                });
                continue;
            }
        };

        let mut ctx = RowContext::new(row, &mut findings);
        ctx.document_number = optional_text(&record.voucher_number);

        let header_key = required_text(&mut ctx, "voucher_number", &record.voucher_number);
        let description = required_text(&mut ctx, "description", &record.description);
        let quantity = parse_numeric(&mut ctx, "quantity", &record.quantity);
        let rate = parse_numeric(&mut ctx, "rate", &record.rate);
        if quantity.is_some() != rate.is_some() {
            ctx.report("quantity", "quantity and rate must be given together");
        }
        let taxable_value = parse_money(&mut ctx, "taxable_value", &record.taxable_value, true, false);
        let cgst_rate = parse_numeric(&mut ctx, "cgst_rate", &record.cgst_rate).unwrap_or(Decimal::ZERO);
        let cgst_amount = parse_money(&mut ctx, "cgst_amount", &record.cgst_amount, false, false);
        let sgst_rate = parse_numeric(&mut ctx, "sgst_rate", &record.sgst_rate).unwrap_or(Decimal::ZERO);
        let sgst_amount = parse_money(&mut ctx, "sgst_amount", &record.sgst_amount, false, false);
        let igst_rate = parse_numeric(&mut ctx, "igst_rate", &record.igst_rate).unwrap_or(Decimal::ZERO);
        let igst_amount = parse_money(&mut ctx, "igst_amount", &record.igst_amount, false, false);
        let item_code = optional_text(&record.item_code);

        if !ctx.clean() {
            continue;
        }
        if let (Some(header_key), Some(description)) = (header_key, description) {
            items.push(LineItem {
                header_key,
                description,
                quantity,
                rate,
                taxable_value,
                cgst_rate,
                cgst_amount,
                sgst_rate,
                sgst_amount,
                igst_rate,
                igst_amount,
                item_code,
                source_row: row,
            });
        }
    }

    (items, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn header_row(overrides: &[(&str, &str)]) -> RawHeaderRow {
        let mut row = RawHeaderRow {
            voucher_type: "sales".to_string(),
            voucher_date: "15/04/2024".to_string(),
            voucher_number: "INV-001".to_string(),
            party_name: "Acme Traders".to_string(),
            party_taxid: "27AAPFU0939F1ZV".to_string(),
            reference: "".to_string(),
            taxable_total: "10000.00".to_string(),
            cgst_total: "900.00".to_string(),
            sgst_total: "900.00".to_string(),
            igst_total: "".to_string(),
            round_off: "".to_string(),
            invoice_total: "11800.00".to_string(),
        };
        for (field, value) in overrides {
            match *field {
                "voucher_type" => row.voucher_type = value.to_string(),
                "voucher_date" => row.voucher_date = value.to_string(),
                "voucher_number" => row.voucher_number = value.to_string(),
                "party_name" => row.party_name = value.to_string(),
                "party_taxid" => row.party_taxid = value.to_string(),
                "taxable_total" => row.taxable_total = value.to_string(),
                "round_off" => row.round_off = value.to_string(),
                "invoice_total" => row.invoice_total = value.to_string(),
                other => panic!("unknown override: {}", other),
            }
        }
        row
    }

    #[test]
    fn test_valid_header_row_parses() {
        let (headers, findings) = parse_header_rows(vec![(2, Ok(header_row(&[])))]);
        assert!(findings.is_empty());
        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert_eq!(header.kind, VoucherKind::Sales);
        assert_eq!(header.number, "INV-001");
        assert_eq!(header.date, NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
        assert_eq!(header.igst_total, Decimal::ZERO);
        assert_eq!(header.source_row, 2);
    }

    #[rstest]
    #[case::bad_type("voucher_type", "journal", "not a known voucher type")]
    #[case::iso_date("voucher_date", "2024-04-15", "dd/mm/yyyy")]
    #[case::us_date("voucher_date", "04/15/2024", "dd/mm/yyyy")]
    #[case::missing_number("voucher_number", "", "is required")]
    #[case::missing_party("party_name", "", "is required")]
    #[case::short_taxid("party_taxid", "27AAPF", "15-character")]
    #[case::three_decimals("taxable_total", "100.125", "more than two decimal places")]
    #[case::not_a_number("invoice_total", "ten", "not a valid amount")]
    #[case::negative_total("taxable_total", "-5.00", "must not be negative")]
    fn test_header_findings(
        #[case] field: &str,
        #[case] value: &str,
        #[case] expected: &str,
    ) {
        let (headers, findings) =
            parse_header_rows(vec![(2, Ok(header_row(&[(field, value)])))]);
        assert!(headers.is_empty());
        assert_eq!(findings.len(), 1, "findings: {:?}", findings);
        assert_eq!(findings[0].column, field);
        assert!(
            findings[0].message.contains(expected),
            "message '{}' should contain '{}'",
            findings[0].message,
            expected
        );
    }

    #[test]
    fn test_negative_round_off_is_allowed() {
        let (headers, findings) =
            parse_header_rows(vec![(2, Ok(header_row(&[("round_off", "-0.25")])))]);
        assert!(findings.is_empty());
        assert_eq!(headers[0].round_off, Decimal::new(-25, 2));
    }

    #[test]
    fn test_malformed_row_collects_all_findings() {
        let row = header_row(&[
            ("voucher_type", "journal"),
            ("voucher_date", "yesterday"),
            ("taxable_total", "abc"),
        ]);
        let (headers, findings) = parse_header_rows(vec![(5, Ok(row))]);
        assert!(headers.is_empty());
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.row == 5));
        assert!(findings
            .iter()
            .all(|f| f.document_number.as_deref() == Some("INV-001")));
    }

    #[test]
    fn test_undeserializable_row_becomes_row_finding() {
        let (headers, findings) =
            parse_header_rows(vec![(3, Err("wrong number of fields".to_string()))]);
        assert!(headers.is_empty());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].column, "(row)");
        assert_eq!(findings[0].subject(), "row 3");
    }

    fn item_row() -> RawItemRow {
        RawItemRow {
            voucher_number: "INV-001".to_string(),
            description: "Widget".to_string(),
            quantity: "10".to_string(),
            rate: "500.00".to_string(),
            taxable_value: "5000.00".to_string(),
            cgst_rate: "9".to_string(),
            cgst_amount: "450.00".to_string(),
            sgst_rate: "9".to_string(),
            sgst_amount: "450.00".to_string(),
            igst_rate: "".to_string(),
            igst_amount: "".to_string(),
            item_code: "WID-01".to_string(),
        }
    }

    #[test]
    fn test_valid_item_row_parses() {
        let (items, findings) = parse_item_rows(vec![(2, Ok(item_row()))]);
        assert!(findings.is_empty());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].header_key, "INV-001");
        assert_eq!(items[0].quantity, Some(Decimal::new(10, 0)));
        assert_eq!(items[0].igst_amount, Decimal::ZERO);
    }

    #[test]
    fn test_flat_value_item_without_quantity_and_rate() {
        let mut row = item_row();
        row.quantity = "".to_string();
        row.rate = "".to_string();
        let (items, findings) = parse_item_rows(vec![(2, Ok(row))]);
        assert!(findings.is_empty());
        assert_eq!(items[0].quantity, None);
        assert_eq!(items[0].rate, None);
    }

    #[test]
    fn test_quantity_without_rate_is_a_finding() {
        let mut row = item_row();
        row.rate = "".to_string();
        let (items, findings) = parse_item_rows(vec![(2, Ok(row))]);
        assert!(items.is_empty());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("given together"));
    }

    #[test]
    fn test_findings_carry_document_number_for_reporting() {
        let mut row = item_row();
        row.description = "".to_string();
        let (_, findings) = parse_item_rows(vec![(7, Ok(row))]);
        assert_eq!(findings[0].subject(), "INV-001");
    }
}
