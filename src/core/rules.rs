//! Business and tax validation engine
//!
//! Cross-field and cross-file numeric reconciliation over one bundle. The
//! engine always evaluates every enabled rule before returning, so a
//! bundle with five problems reports all five. Each rule can be toggled
//! off independently for testing.
//!
//! Tolerances are absolute: half a currency unit for per-line and
//! per-component reconciliation, one currency unit for the overall total
//! identity, and a larger escalation threshold above which a per-line rate
//! mismatch stops being a warning and becomes an error. The engine only
//! cross-verifies declared values; it never recalculates or corrects them.

use crate::types::{RecordBundle, ValidationOutcome};
use rust_decimal::Decimal;

/// Absolute tolerance for line-sum and per-component reconciliation
pub const LINE_TOLERANCE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Absolute tolerance for the overall total identity
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(100, 0, 0, false, 2);

/// Rate-arithmetic deviation above which a warning escalates to an error
pub const RATE_ESCALATION: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

/// Which rules run; all on by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleToggles {
    pub reconciliation: bool,
    pub tax_mode: bool,
    pub total_identity: bool,
    pub rate_arithmetic: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        RuleToggles {
            reconciliation: true,
            tax_mode: true,
            total_identity: true,
            rate_arithmetic: true,
        }
    }
}

/// The validation engine over one bundle
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationEngine {
    toggles: RuleToggles,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toggles(toggles: RuleToggles) -> Self {
        ValidationEngine { toggles }
    }

    /// Validate one bundle, accumulating findings across all enabled rules
    pub fn validate(&self, bundle: &RecordBundle) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        if self.toggles.reconciliation {
            self.check_reconciliation(bundle, &mut outcome);
        }
        if self.toggles.tax_mode {
            self.check_tax_mode(bundle, &mut outcome);
        }
        if self.toggles.total_identity {
            self.check_total_identity(bundle, &mut outcome);
        }
        if self.toggles.rate_arithmetic {
            self.check_rate_arithmetic(bundle, &mut outcome);
        }

        outcome
    }

    /// Line-item sums against header totals, taxable value and each tax
    /// component independently
    fn check_reconciliation(&self, bundle: &RecordBundle, outcome: &mut ValidationOutcome) {
        let header = &bundle.header;
        let components: [(&str, Decimal, fn(&crate::types::LineItem) -> Decimal); 4] = [
            ("taxable_total", header.taxable_total, |i| i.taxable_value),
            ("cgst_total", header.cgst_total, |i| i.cgst_amount),
            ("sgst_total", header.sgst_total, |i| i.sgst_amount),
            ("igst_total", header.igst_total, |i| i.igst_amount),
        ];

        for (field, declared, pick) in components {
            let sum: Decimal = bundle.items.iter().map(pick).sum();
            let diff = (sum - declared).abs();
            if diff > LINE_TOLERANCE {
                outcome.error(
                    field,
                    format!(
                        "line items sum to {} but the header declares {} (difference {})",
                        sum, declared, diff
                    ),
                );
            }
        }
    }

    /// Split (CGST/SGST) and integrated (IGST) tax are mutually exclusive
    /// within one voucher
    fn check_tax_mode(&self, bundle: &RecordBundle, outcome: &mut ValidationOutcome) {
        let any_split = bundle.items.iter().any(|i| i.uses_split_tax());
        let any_integrated = bundle.items.iter().any(|i| i.uses_integrated_tax());
        if any_split && any_integrated {
            outcome.error(
                "items",
                "voucher mixes split (CGST/SGST) and integrated (IGST) tax components",
            );
        }
    }

    /// Overall amount = taxable total + tax components + rounding
    fn check_total_identity(&self, bundle: &RecordBundle, outcome: &mut ValidationOutcome) {
        let header = &bundle.header;
        let expected = header.taxable_total
            + header.cgst_total
            + header.sgst_total
            + header.igst_total
            + header.round_off;
        let diff = (header.invoice_total - expected).abs();
        if diff > TOTAL_TOLERANCE {
            outcome.error(
                "invoice_total",
                format!(
                    "declared {} but components add up to {} (difference {})",
                    header.invoice_total, expected, diff
                ),
            );
        }
    }

    /// Declared tax amount vs taxable value x rate / 100, per line and per
    /// component; warnings inside the escalation band, errors beyond it
    fn check_rate_arithmetic(&self, bundle: &RecordBundle, outcome: &mut ValidationOutcome) {
        for (index, item) in bundle.items.iter().enumerate() {
            let components = [
                ("cgst", item.cgst_rate, item.cgst_amount),
                ("sgst", item.sgst_rate, item.sgst_amount),
                ("igst", item.igst_rate, item.igst_amount),
            ];
            for (name, rate, declared) in components {
                if rate.is_zero() {
                    continue;
                }
                let expected = (item.taxable_value * rate / Decimal::ONE_HUNDRED).round_dp(2);
                let diff = (declared - expected).abs();
                if diff <= LINE_TOLERANCE {
                    continue;
                }
                let field = format!("items[{}].{}_amount", index, name);
                let message = format!(
                    "declared {} but {} at {}% is {} (difference {})",
                    declared, item.taxable_value, rate, expected, diff
                );
                if diff > RATE_ESCALATION {
                    outcome.error(field, message);
                } else {
                    outcome.warn(field, message);
                }
            }
        }
    }
}
