//! Voucher fingerprints for duplicate detection
//!
//! A fingerprint identifies one voucher across runs. Its source fields are
//! normalized (trimmed, case-folded, separators stripped) before hashing,
//! so incidental formatting differences in the source CSV never change the
//! identity.

use crate::types::VoucherHeader;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Stable identity of one voucher
///
/// Keeps the normalized source fields alongside the digest so the remote
/// duplicate registry can query the external system by document number and
/// date without re-deriving them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoucherFingerprint {
    kind: String,
    party: String,
    number: String,
    date: NaiveDate,
    digest: String,
}

impl VoucherFingerprint {
    /// Fingerprint of one header
    pub fn of(header: &VoucherHeader) -> Self {
        let kind = normalize(header.kind.wire_label());
        let party = normalize(&header.party_name);
        let number = normalize(&header.number);
        let date = header.date;

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"|");
        hasher.update(party.as_bytes());
        hasher.update(b"|");
        hasher.update(number.as_bytes());
        hasher.update(b"|");
        hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
        let digest = to_hex(&hasher.finalize());

        VoucherFingerprint {
            kind,
            party,
            number,
            date,
            digest,
        }
    }

    /// Hex digest, the value recorded in registries and audit entries
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Normalized document number, for remote lookups
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Document date, for remote lookups
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl std::fmt::Display for VoucherFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.digest)
    }
}

/// Trim, case-fold and strip separator characters
fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '-' | '/' | '.' | ',' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoucherKind;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn header(number: &str, party: &str) -> VoucherHeader {
        VoucherHeader {
            kind: VoucherKind::Sales,
            date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            number: number.to_string(),
            party_name: party.to_string(),
            party_taxid: None,
            reference: None,
            taxable_total: Decimal::ZERO,
            cgst_total: Decimal::ZERO,
            sgst_total: Decimal::ZERO,
            igst_total: Decimal::ZERO,
            round_off: Decimal::ZERO,
            invoice_total: Decimal::ZERO,
            source_row: 2,
        }
    }

    #[rstest]
    #[case::case_folded("INV-001", "inv-001")]
    #[case::separators_stripped("INV-001", "INV 001")]
    #[case::mixed("INV-001", "  inv.001 ")]
    #[case::slashes("INV/001", "INV-0/01")]
    fn test_formatting_differences_produce_equal_fingerprints(
        #[case] left: &str,
        #[case] right: &str,
    ) {
        let a = VoucherFingerprint::of(&header(left, "Acme Traders"));
        let b = VoucherFingerprint::of(&header(right, "ACME TRADERS"));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[rstest]
    #[case::different_number("INV-001", "INV-002")]
    #[case::digit_shift("INV-10", "INV-1")]
    fn test_different_vouchers_differ(#[case] left: &str, #[case] right: &str) {
        let a = VoucherFingerprint::of(&header(left, "Acme"));
        let b = VoucherFingerprint::of(&header(right, "Acme"));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_kind_is_part_of_the_identity() {
        let sales = VoucherFingerprint::of(&header("INV-001", "Acme"));
        let mut purchase_header = header("INV-001", "Acme");
        purchase_header.kind = VoucherKind::Purchase;
        let purchase = VoucherFingerprint::of(&purchase_header);
        assert_ne!(sales.digest(), purchase.digest());
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let fp = VoucherFingerprint::of(&header("INV-001", "Acme"));
        assert_eq!(fp.digest().len(), 64);
        assert!(fp.digest().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
