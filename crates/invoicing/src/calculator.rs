//! Invoice totals calculator.
//!
//! Pure and deterministic: the same lines and config always give the same
//! totals. Nothing here rounds; call `rounded()` on the results to get the
//! two-decimal display values.

use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{SubtotalBasis, VatConfig};
use crate::line_item::{LineInput, TaxCode};
use crate::money::{self, round_display};

/// Per-line amounts.
///
/// `total == net + vat` and `net == gross - discount` hold exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub gross: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

impl LineTotals {
    pub fn rounded(&self) -> Self {
        Self {
            gross: round_display(self.gross),
            discount: round_display(self.discount),
            net: round_display(self.net),
            vat: round_display(self.vat),
            total: round_display(self.total),
        }
    }
}

/// Aggregate amounts for a set of lines.
///
/// `vat_amount` and `total` are sums of the line values. `subtotal` follows
/// the configured [`SubtotalBasis`]; `discount_total` is reported either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_display(self.subtotal),
            discount_total: round_display(self.discount_total),
            vat_amount: round_display(self.vat_amount),
            total: round_display(self.total),
        }
    }
}

impl Add for InvoiceTotals {
    type Output = InvoiceTotals;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            subtotal: self.subtotal.saturating_add(rhs.subtotal),
            discount_total: self.discount_total.saturating_add(rhs.discount_total),
            vat_amount: self.vat_amount.saturating_add(rhs.vat_amount),
            total: self.total.saturating_add(rhs.total),
        }
    }
}

impl AddAssign for InvoiceTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for InvoiceTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// Net and VAT for one tax code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCodeTotals {
    pub net: Decimal,
    pub vat: Decimal,
}

impl Add for TaxCodeTotals {
    type Output = TaxCodeTotals;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            net: self.net.saturating_add(rhs.net),
            vat: self.vat.saturating_add(rhs.vat),
        }
    }
}

/// Net/VAT split by tax code (the shape VAT returns report in).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub standard: TaxCodeTotals,
    pub zero: TaxCodeTotals,
    pub exempt: TaxCodeTotals,
}

impl VatBreakdown {
    pub fn get(&self, code: TaxCode) -> TaxCodeTotals {
        match code {
            TaxCode::Standard => self.standard,
            TaxCode::Zero => self.zero,
            TaxCode::Exempt => self.exempt,
        }
    }

    fn slot_mut(&mut self, code: TaxCode) -> &mut TaxCodeTotals {
        match code {
            TaxCode::Standard => &mut self.standard,
            TaxCode::Zero => &mut self.zero,
            TaxCode::Exempt => &mut self.exempt,
        }
    }

    pub fn record(&mut self, code: TaxCode, line: &LineTotals) {
        let slot = self.slot_mut(code);
        *slot = *slot + TaxCodeTotals {
            net: line.net,
            vat: line.vat,
        };
    }

    pub fn net_total(&self) -> Decimal {
        TaxCode::ALL
            .iter()
            .fold(Decimal::ZERO, |acc, code| acc.saturating_add(self.get(*code).net))
    }

    pub fn vat_total(&self) -> Decimal {
        TaxCode::ALL
            .iter()
            .fold(Decimal::ZERO, |acc, code| acc.saturating_add(self.get(*code).vat))
    }

    pub fn rounded(&self) -> Self {
        let round = |t: TaxCodeTotals| TaxCodeTotals {
            net: round_display(t.net),
            vat: round_display(t.vat),
        };
        Self {
            standard: round(self.standard),
            zero: round(self.zero),
            exempt: round(self.exempt),
        }
    }
}

impl Add for VatBreakdown {
    type Output = VatBreakdown;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            standard: self.standard + rhs.standard,
            zero: self.zero + rhs.zero,
            exempt: self.exempt + rhs.exempt,
        }
    }
}

impl Sum for VatBreakdown {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Computes line and invoice totals under a [`VatConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceCalculator {
    config: VatConfig,
}

impl InvoiceCalculator {
    pub fn new(config: VatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VatConfig {
        &self.config
    }

    /// Same settings, different standard rate (invoice-level override).
    ///
    /// The rate is not re-validated here; invoices and companies validate
    /// their rates when they are set.
    pub fn with_standard_rate(&self, standard_rate: Decimal) -> Self {
        Self {
            config: VatConfig {
                standard_rate,
                ..self.config
            },
        }
    }

    /// Net, VAT and total for one line.
    ///
    /// Net is not clamped: a fixed discount larger than the gross amount
    /// yields a negative net (validated lines cannot get there).
    pub fn compute_line_total<L: LineInput + ?Sized>(&self, item: &L) -> LineTotals {
        let gross = item.quantity().saturating_mul(item.unit_price());
        let discount = item.discount().amount_on(gross);
        let net = gross.saturating_sub(discount);

        let tax_code = item.tax_code();
        let vat = if tax_code.is_taxed() {
            let rate = item.vat_rate().unwrap_or(self.config.standard_rate);
            money::percent_of(net, rate)
        } else {
            Decimal::ZERO
        };

        LineTotals {
            gross,
            discount,
            net,
            vat,
            total: net.saturating_add(vat),
        }
    }

    /// Aggregate totals. An empty slice gives all zeros.
    pub fn compute_invoice_totals<L: LineInput>(&self, items: &[L]) -> InvoiceTotals {
        let mut gross = Decimal::ZERO;
        let mut totals = InvoiceTotals::zero();

        for item in items {
            let line = self.compute_line_total(item);
            gross = gross.saturating_add(line.gross);
            totals.discount_total = totals.discount_total.saturating_add(line.discount);
            totals.vat_amount = totals.vat_amount.saturating_add(line.vat);
            totals.total = totals.total.saturating_add(line.total);
            totals.subtotal = totals.subtotal.saturating_add(line.net);
        }

        if self.config.subtotal_basis == SubtotalBasis::Gross {
            totals.subtotal = gross;
        }
        totals
    }

    /// Net/VAT per tax code.
    pub fn vat_breakdown<L: LineInput>(&self, items: &[L]) -> VatBreakdown {
        let mut breakdown = VatBreakdown::default();
        for item in items {
            breakdown.record(item.tax_code(), &self.compute_line_total(item));
        }
        breakdown
    }
}
