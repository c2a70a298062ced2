//! Voucher codec: validated bundle to external wire payload
//!
//! A pure, side-effect-free transform. The same bundle always serializes
//! to byte-identical output, which the duplicate checks and dry-run review
//! rely on. Each voucher variant maps the bundle to a different
//! accounting-entry layout:
//!
//! - **Sales**: party ledger on the debit side, sales account and tax
//!   ledgers on the credit side.
//! - **Purchase**: mirror image, and the supplier's document reference is
//!   mandatory.
//! - **Order**: sales layout plus one inventory entry per line item, which
//!   makes item code, quantity and rate mandatory on every line.
//!
//! A bundle missing a field its variant requires is rejected with a
//! [`CodecError`]; the codec never emits a partially-empty payload.

pub mod xml;

use crate::config::LedgerNames;
use crate::types::{LineItem, RecordBundle, VoucherKind};
use rust_decimal::Decimal;
use thiserror::Error;
use self::xml::{close, escape, format_amount, format_date, open, tag};

/// Errors from encoding one bundle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The bundle lacks a field its voucher variant requires
    #[error("Voucher {document_number} cannot be encoded: {field} is required for {kind} vouchers")]
    MissingField {
        document_number: String,
        kind: VoucherKind,
        field: String,
    },

    /// A bundle with no line items reached the codec
    #[error("Voucher {document_number} has no line items")]
    NoLineItems { document_number: String },
}

impl CodecError {
    fn missing(bundle: &RecordBundle, field: impl Into<String>) -> Self {
        CodecError::MissingField {
            document_number: bundle.header.number.clone(),
            kind: bundle.header.kind,
            field: field.into(),
        }
    }
}

/// Encode one error-free bundle into the import envelope
///
/// # Errors
///
/// Returns a [`CodecError`] when the bundle has no line items or lacks a
/// field the variant requires; nothing is emitted in that case.
pub fn encode(bundle: &RecordBundle, ledgers: &LedgerNames) -> Result<String, CodecError> {
    if bundle.items.is_empty() {
        return Err(CodecError::NoLineItems {
            document_number: bundle.header.number.clone(),
        });
    }
    check_variant_fields(bundle)?;

    let mut buf = String::new();
    open(&mut buf, "ENVELOPE");
    open(&mut buf, "HEADER");
    tag(&mut buf, "TALLYREQUEST", "Import Data");
    close(&mut buf, "HEADER");
    open(&mut buf, "BODY");
    open(&mut buf, "IMPORTDATA");
    open(&mut buf, "REQUESTDESC");
    tag(&mut buf, "REPORTNAME", "Vouchers");
    close(&mut buf, "REQUESTDESC");
    open(&mut buf, "REQUESTDATA");
    open(&mut buf, "TALLYMESSAGE");
    write_voucher(&mut buf, bundle, ledgers);
    close(&mut buf, "TALLYMESSAGE");
    close(&mut buf, "REQUESTDATA");
    close(&mut buf, "IMPORTDATA");
    close(&mut buf, "BODY");
    close(&mut buf, "ENVELOPE");
    Ok(buf)
}

/// Per-variant required-field checks, before anything is written
fn check_variant_fields(bundle: &RecordBundle) -> Result<(), CodecError> {
    match bundle.header.kind {
        VoucherKind::Sales => Ok(()),
        VoucherKind::Purchase => {
            if bundle.header.reference.is_none() {
                return Err(CodecError::missing(bundle, "reference"));
            }
            Ok(())
        }
        VoucherKind::Order => {
            for (index, item) in bundle.items.iter().enumerate() {
                if item.item_code.is_none() {
                    return Err(CodecError::missing(
                        bundle,
                        format!("items[{}].item_code", index),
                    ));
                }
                if item.quantity.is_none() || item.rate.is_none() {
                    return Err(CodecError::missing(
                        bundle,
                        format!("items[{}].quantity/rate", index),
                    ));
                }
            }
            Ok(())
        }
    }
}

fn write_voucher(buf: &mut String, bundle: &RecordBundle, ledgers: &LedgerNames) {
    let header = &bundle.header;
    buf.push_str("<VOUCHER VCHTYPE=\"");
    buf.push_str(&escape(header.kind.wire_label()));
    buf.push_str("\" ACTION=\"Create\">");

    tag(buf, "DATE", &format_date(header.date));
    tag(buf, "VOUCHERTYPENAME", header.kind.wire_label());
    tag(buf, "VOUCHERNUMBER", &header.number);
    tag(buf, "PARTYLEDGERNAME", &header.party_name);
    if let Some(taxid) = &header.party_taxid {
        tag(buf, "PARTYGSTIN", taxid);
    }
    if let Some(reference) = &header.reference {
        tag(buf, "REFERENCE", reference);
    }

    match header.kind {
        VoucherKind::Sales => write_ledger_entries(buf, bundle, ledgers, Side::PartyDebit),
        VoucherKind::Purchase => write_ledger_entries(buf, bundle, ledgers, Side::PartyCredit),
        VoucherKind::Order => {
            write_ledger_entries(buf, bundle, ledgers, Side::PartyDebit);
            for item in &bundle.items {
                write_inventory_entry(buf, item);
            }
        }
    }

    close(buf, "VOUCHER");
}

/// Which side of the entry the party ledger sits on
#[derive(Clone, Copy, PartialEq)]
enum Side {
    PartyDebit,
    PartyCredit,
}

fn write_ledger_entries(buf: &mut String, bundle: &RecordBundle, ledgers: &LedgerNames, side: Side) {
    let header = &bundle.header;
    let party_is_debit = side == Side::PartyDebit;
    let account_name = if party_is_debit {
        &ledgers.sales_account
    } else {
        &ledgers.purchase_account
    };

    ledger_entry(buf, &header.party_name, header.invoice_total, party_is_debit);
    ledger_entry(buf, account_name, header.taxable_total, !party_is_debit);
    for (name, total) in [
        (&ledgers.cgst, header.cgst_total),
        (&ledgers.sgst, header.sgst_total),
        (&ledgers.igst, header.igst_total),
    ] {
        if !total.is_zero() {
            ledger_entry(buf, name, total, !party_is_debit);
        }
    }
    if !header.round_off.is_zero() {
        ledger_entry(buf, &ledgers.round_off, header.round_off, !party_is_debit);
    }
}

fn ledger_entry(buf: &mut String, ledger: &str, amount: Decimal, debit: bool) {
    open(buf, "ALLLEDGERENTRIES.LIST");
    tag(buf, "LEDGERNAME", ledger);
    tag(buf, "ISDEEMEDPOSITIVE", if debit { "Yes" } else { "No" });
    tag(buf, "AMOUNT", &format_amount(amount));
    close(buf, "ALLLEDGERENTRIES.LIST");
}

fn write_inventory_entry(buf: &mut String, item: &LineItem) {
    open(buf, "ALLINVENTORYENTRIES.LIST");
    // Variant check guarantees these are present for order vouchers
    if let Some(code) = &item.item_code {
        tag(buf, "STOCKITEMNAME", code);
    }
    tag(buf, "DESCRIPTION", &item.description);
    if let Some(quantity) = item.quantity {
        tag(buf, "BILLEDQTY", &format_amount(quantity));
    }
    if let Some(rate) = item.rate {
        tag(buf, "RATE", &format_amount(rate));
    }
    tag(buf, "AMOUNT", &format_amount(item.taxable_value));
    close(buf, "ALLINVENTORYENTRIES.LIST");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoucherHeader;
    use chrono::NaiveDate;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn bundle(kind: VoucherKind) -> RecordBundle {
        RecordBundle {
            header: VoucherHeader {
                kind,
                date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
                number: "INV-001".to_string(),
                party_name: "Acme & Sons".to_string(),
                party_taxid: Some("27AAPFU0939F1ZV".to_string()),
                reference: Some("PO-77".to_string()),
                taxable_total: dec("10000.00"),
                cgst_total: dec("900.00"),
                sgst_total: dec("900.00"),
                igst_total: Decimal::ZERO,
                round_off: dec("0.00"),
                invoice_total: dec("11800.00"),
                source_row: 2,
            },
            items: vec![LineItem {
                header_key: "INV-001".to_string(),
                description: "Widget".to_string(),
                quantity: Some(dec("10")),
                rate: Some(dec("1000.00")),
                taxable_value: dec("10000.00"),
                cgst_rate: dec("9"),
                cgst_amount: dec("900.00"),
                sgst_rate: dec("9"),
                sgst_amount: dec("900.00"),
                igst_rate: Decimal::ZERO,
                igst_amount: Decimal::ZERO,
                item_code: Some("WID-01".to_string()),
                source_row: 2,
            }],
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let bundle = bundle(VoucherKind::Sales);
        let ledgers = LedgerNames::default();
        let first = encode(&bundle, &ledgers).unwrap();
        let second = encode(&bundle, &ledgers).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sales_layout_puts_party_on_debit_side() {
        let payload = encode(&bundle(VoucherKind::Sales), &LedgerNames::default()).unwrap();
        let party = payload
            .find("<LEDGERNAME>Acme &amp; Sons</LEDGERNAME><ISDEEMEDPOSITIVE>Yes</ISDEEMEDPOSITIVE>");
        let sales = payload
            .find("<LEDGERNAME>Sales</LEDGERNAME><ISDEEMEDPOSITIVE>No</ISDEEMEDPOSITIVE>");
        assert!(party.is_some(), "payload: {}", payload);
        assert!(sales.is_some(), "payload: {}", payload);
        assert!(payload.contains("VCHTYPE=\"Sales\""));
        assert!(!payload.contains("ALLINVENTORYENTRIES"));
    }

    #[test]
    fn test_purchase_layout_mirrors_sides() {
        let payload = encode(&bundle(VoucherKind::Purchase), &LedgerNames::default()).unwrap();
        assert!(payload.contains(
            "<LEDGERNAME>Acme &amp; Sons</LEDGERNAME><ISDEEMEDPOSITIVE>No</ISDEEMEDPOSITIVE>"
        ));
        assert!(payload.contains(
            "<LEDGERNAME>Purchase</LEDGERNAME><ISDEEMEDPOSITIVE>Yes</ISDEEMEDPOSITIVE>"
        ));
    }

    #[test]
    fn test_order_layout_includes_inventory_lines() {
        let payload = encode(&bundle(VoucherKind::Order), &LedgerNames::default()).unwrap();
        assert!(payload.contains("VCHTYPE=\"Sales Order\""));
        assert!(payload.contains("<ALLINVENTORYENTRIES.LIST>"));
        assert!(payload.contains("<STOCKITEMNAME>WID-01</STOCKITEMNAME>"));
        assert!(payload.contains("<BILLEDQTY>10.00</BILLEDQTY>"));
    }

    #[test]
    fn test_purchase_without_reference_is_rejected() {
        let mut bundle = bundle(VoucherKind::Purchase);
        bundle.header.reference = None;
        let result = encode(&bundle, &LedgerNames::default());
        assert_eq!(
            result,
            Err(CodecError::MissingField {
                document_number: "INV-001".to_string(),
                kind: VoucherKind::Purchase,
                field: "reference".to_string(),
            })
        );
    }

    #[rstest]
    #[case::no_item_code(true, false)]
    #[case::no_quantity(false, true)]
    fn test_order_missing_inventory_fields_is_rejected(
        #[case] drop_code: bool,
        #[case] drop_quantity: bool,
    ) {
        let mut bundle = bundle(VoucherKind::Order);
        if drop_code {
            bundle.items[0].item_code = None;
        }
        if drop_quantity {
            bundle.items[0].quantity = None;
        }
        let result = encode(&bundle, &LedgerNames::default());
        assert!(matches!(result, Err(CodecError::MissingField { .. })));
    }

    #[test]
    fn test_empty_bundle_is_rejected() {
        let mut bundle = bundle(VoucherKind::Sales);
        bundle.items.clear();
        assert!(matches!(
            encode(&bundle, &LedgerNames::default()),
            Err(CodecError::NoLineItems { .. })
        ));
    }

    #[test]
    fn test_zero_tax_components_are_omitted() {
        let payload = encode(&bundle(VoucherKind::Sales), &LedgerNames::default()).unwrap();
        assert!(payload.contains("<LEDGERNAME>CGST</LEDGERNAME>"));
        assert!(payload.contains("<LEDGERNAME>SGST</LEDGERNAME>"));
        assert!(!payload.contains("<LEDGERNAME>IGST</LEDGERNAME>"));
        assert!(!payload.contains("<LEDGERNAME>Round Off</LEDGERNAME>"));
    }

    #[test]
    fn test_custom_ledger_names_are_used() {
        let ledgers = LedgerNames {
            sales_account: "Domestic Sales".to_string(),
            ..LedgerNames::default()
        };
        let payload = encode(&bundle(VoucherKind::Sales), &ledgers).unwrap();
        assert!(payload.contains("<LEDGERNAME>Domestic Sales</LEDGERNAME>"));
    }

    #[test]
    fn test_free_text_is_escaped() {
        let mut bundle = bundle(VoucherKind::Sales);
        bundle.header.reference = Some("a<b>&\"c\"".to_string());
        let payload = encode(&bundle, &LedgerNames::default()).unwrap();
        assert!(payload.contains("<REFERENCE>a&lt;b&gt;&amp;&quot;c&quot;</REFERENCE>"));
    }
}
