//! Dashboard figures derived from invoices.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vatdesk_invoicing::money::round_display;
use vatdesk_invoicing::{Invoice, InvoiceCalculator, InvoiceDirection, InvoiceStatus};

/// Headline numbers for the dashboard cards and the revenue chart.
///
/// Only booked (issued or paid) invoices are counted. Amounts include VAT
/// and are rounded for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub receivable_total: Decimal,
    pub payable_total: Decimal,
    pub outstanding_receivables: Decimal,
    pub outstanding_payables: Decimal,
    pub vat_collected: Decimal,
    pub vat_paid: Decimal,
    pub overdue_count: usize,
    /// Receivable totals keyed by issue month (`YYYY-MM`).
    pub monthly_revenue: BTreeMap<String, Decimal>,
}

impl DashboardSummary {
    pub fn build<'a, I>(invoices: I, calculator: &InvoiceCalculator, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut summary = Self::default();

        for invoice in invoices {
            if !invoice.status().is_booked() {
                continue;
            }
            let totals = invoice.totals(calculator);
            let unpaid = invoice.status() == InvoiceStatus::Issued;

            match invoice.direction() {
                InvoiceDirection::Receivable => {
                    accumulate(&mut summary.receivable_total, totals.total);
                    accumulate(&mut summary.vat_collected, totals.vat_amount);
                    if unpaid {
                        accumulate(&mut summary.outstanding_receivables, totals.total);
                    }
                    let month = month_key(invoice.issue_date());
                    accumulate(summary.monthly_revenue.entry(month).or_default(), totals.total);
                }
                InvoiceDirection::Payable => {
                    accumulate(&mut summary.payable_total, totals.total);
                    accumulate(&mut summary.vat_paid, totals.vat_amount);
                    if unpaid {
                        accumulate(&mut summary.outstanding_payables, totals.total);
                    }
                }
            }

            if invoice.is_overdue(today) {
                summary.overdue_count += 1;
            }
        }

        summary.rounded()
    }

    /// Net VAT position (collected minus paid).
    pub fn vat_position(&self) -> Decimal {
        self.vat_collected.saturating_sub(self.vat_paid)
    }

    fn rounded(mut self) -> Self {
        self.receivable_total = round_display(self.receivable_total);
        self.payable_total = round_display(self.payable_total);
        self.outstanding_receivables = round_display(self.outstanding_receivables);
        self.outstanding_payables = round_display(self.outstanding_payables);
        self.vat_collected = round_display(self.vat_collected);
        self.vat_paid = round_display(self.vat_paid);
        for amount in self.monthly_revenue.values_mut() {
            *amount = round_display(*amount);
        }
        self
    }
}

/// Sums saturate like the calculator's, so huge books never panic.
fn accumulate(sum: &mut Decimal, amount: Decimal) {
    *sum = sum.saturating_add(amount);
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}
