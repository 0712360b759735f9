use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vatdesk_core::{CompanyId, DomainError, DomainResult, Entity, VatReturnId};
use vatdesk_invoicing::money::round_display;
use vatdesk_invoicing::{Invoice, InvoiceCalculator, InvoiceDirection, VatBreakdown};

/// Inclusive date range a VAT return covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PeriodBounds", into = "PeriodBounds")]
pub struct VatPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Serialize, Deserialize)]
struct PeriodBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<PeriodBounds> for VatPeriod {
    type Error = DomainError;

    fn try_from(bounds: PeriodBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl From<VatPeriod> for PeriodBounds {
    fn from(period: VatPeriod) -> Self {
        PeriodBounds {
            start: period.start,
            end: period.end,
        }
    }
}

impl VatPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation("VAT period end precedes its start"));
        }
        Ok(Self { start, end })
    }

    /// Calendar quarter `q` (1..=4) of `year`.
    pub fn quarter(year: i32, q: u32) -> DomainResult<Self> {
        if !(1..=4).contains(&q) {
            return Err(DomainError::validation(format!("quarter must be 1..=4 (got {q})")));
        }
        let start = NaiveDate::from_ymd_opt(year, 3 * q - 2, 1)
            .ok_or_else(|| DomainError::validation(format!("year out of range: {year}")))?;
        let end = if q == 4 {
            NaiveDate::from_ymd_opt(year, 12, 31)
        } else {
            NaiveDate::from_ymd_opt(year, 3 * q + 1, 1).and_then(|d| d.pred_opt())
        }
        .ok_or_else(|| DomainError::validation(format!("year out of range: {year}")))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl core::fmt::Display for VatPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VatReturnStatus {
    Draft,
    Filed,
}

/// Periodic VAT filing: output VAT on sales minus input VAT on purchases.
///
/// Figures are kept unrounded; [`VatReturn::summary`] gives display values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VatReturnRecord", into = "VatReturnRecord")]
pub struct VatReturn {
    id: VatReturnId,
    company_id: CompanyId,
    period: VatPeriod,
    sales: VatBreakdown,
    purchases: VatBreakdown,
    invoice_count: usize,
    status: VatReturnStatus,
    filed_on: Option<NaiveDate>,
}

/// Stored form of a [`VatReturn`], checked on the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatReturnRecord {
    pub id: VatReturnId,
    pub company_id: CompanyId,
    pub period: VatPeriod,
    pub sales: VatBreakdown,
    pub purchases: VatBreakdown,
    pub invoice_count: usize,
    pub status: VatReturnStatus,
    #[serde(default)]
    pub filed_on: Option<NaiveDate>,
}

/// Rounded, display-ready figures of a VAT return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatReturnSummary {
    pub id: VatReturnId,
    pub company_id: CompanyId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: VatReturnStatus,
    pub invoice_count: usize,
    pub sales: VatBreakdown,
    pub purchases: VatBreakdown,
    pub sales_net: Decimal,
    pub purchases_net: Decimal,
    pub output_vat: Decimal,
    pub input_vat: Decimal,
    pub net_vat_payable: Decimal,
}

impl VatReturn {
    /// Build a draft return from the company's booked invoices in `period`.
    ///
    /// Draft and void invoices, other companies' invoices and invoices issued
    /// outside the period are ignored. Invoice-level rate overrides apply.
    pub fn prepare<'a, I>(
        id: VatReturnId,
        company_id: CompanyId,
        period: VatPeriod,
        invoices: I,
        calculator: &InvoiceCalculator,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut sales = VatBreakdown::default();
        let mut purchases = VatBreakdown::default();
        let mut invoice_count = 0;

        for invoice in invoices {
            if invoice.company_id() != company_id
                || !invoice.status().is_booked()
                || !period.contains(invoice.issue_date())
            {
                continue;
            }
            let breakdown = invoice.vat_breakdown(calculator);
            match invoice.direction() {
                InvoiceDirection::Receivable => sales = sales + breakdown,
                InvoiceDirection::Payable => purchases = purchases + breakdown,
            }
            invoice_count += 1;
        }

        tracing::debug!(
            %company_id,
            %period,
            invoice_count,
            output_vat = %sales.vat_total(),
            input_vat = %purchases.vat_total(),
            "prepared VAT return"
        );

        Self {
            id,
            company_id,
            period,
            sales,
            purchases,
            invoice_count,
            status: VatReturnStatus::Draft,
            filed_on: None,
        }
    }

    pub fn id_typed(&self) -> VatReturnId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn period(&self) -> VatPeriod {
        self.period
    }

    pub fn sales(&self) -> &VatBreakdown {
        &self.sales
    }

    pub fn purchases(&self) -> &VatBreakdown {
        &self.purchases
    }

    pub fn invoice_count(&self) -> usize {
        self.invoice_count
    }

    pub fn status(&self) -> VatReturnStatus {
        self.status
    }

    pub fn filed_on(&self) -> Option<NaiveDate> {
        self.filed_on
    }

    pub fn output_vat(&self) -> Decimal {
        self.sales.vat_total()
    }

    pub fn input_vat(&self) -> Decimal {
        self.purchases.vat_total()
    }

    /// Output minus input VAT; negative means a refund is due.
    pub fn net_vat_payable(&self) -> Decimal {
        self.output_vat().saturating_sub(self.input_vat())
    }

    /// File the return. Only possible once the period has ended.
    pub fn file(&mut self, filed_on: NaiveDate) -> DomainResult<()> {
        if self.status == VatReturnStatus::Filed {
            return Err(DomainError::conflict("VAT return already filed"));
        }
        if filed_on < self.period.end() {
            return Err(DomainError::invariant(format!(
                "cannot file before the period ends ({})",
                self.period.end()
            )));
        }
        self.status = VatReturnStatus::Filed;
        self.filed_on = Some(filed_on);
        tracing::debug!(id = %self.id, %filed_on, "filed VAT return");
        Ok(())
    }

    pub fn summary(&self) -> VatReturnSummary {
        VatReturnSummary {
            id: self.id,
            company_id: self.company_id,
            period_start: self.period.start(),
            period_end: self.period.end(),
            status: self.status,
            invoice_count: self.invoice_count,
            sales: self.sales.rounded(),
            purchases: self.purchases.rounded(),
            sales_net: round_display(self.sales.net_total()),
            purchases_net: round_display(self.purchases.net_total()),
            output_vat: round_display(self.output_vat()),
            input_vat: round_display(self.input_vat()),
            net_vat_payable: round_display(self.net_vat_payable()),
        }
    }
}

fn is_non_negative(breakdown: &VatBreakdown) -> bool {
    [breakdown.standard, breakdown.zero, breakdown.exempt]
        .iter()
        .all(|t| t.net >= Decimal::ZERO && t.vat >= Decimal::ZERO)
}

impl TryFrom<VatReturnRecord> for VatReturn {
    type Error = DomainError;

    fn try_from(record: VatReturnRecord) -> Result<Self, Self::Error> {
        match (record.status, record.filed_on) {
            (VatReturnStatus::Draft, None) => {}
            (VatReturnStatus::Filed, Some(filed_on)) if filed_on >= record.period.end() => {}
            (VatReturnStatus::Filed, Some(_)) => {
                return Err(DomainError::invariant("VAT return filed before its period ended"));
            }
            (status, _) => {
                return Err(DomainError::invariant(format!(
                    "{status:?} VAT return has an inconsistent filing date"
                )));
            }
        }
        if !is_non_negative(&record.sales) || !is_non_negative(&record.purchases) {
            return Err(DomainError::validation("VAT return figures cannot be negative"));
        }

        Ok(Self {
            id: record.id,
            company_id: record.company_id,
            period: record.period,
            sales: record.sales,
            purchases: record.purchases,
            invoice_count: record.invoice_count,
            status: record.status,
            filed_on: record.filed_on,
        })
    }
}

impl From<VatReturn> for VatReturnRecord {
    fn from(ret: VatReturn) -> Self {
        VatReturnRecord {
            id: ret.id,
            company_id: ret.company_id,
            period: ret.period,
            sales: ret.sales,
            purchases: ret.purchases,
            invoice_count: ret.invoice_count,
            status: ret.status,
            filed_on: ret.filed_on,
        }
    }
}

impl Entity for VatReturn {
    type Id = VatReturnId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vatdesk_core::{CustomerId, InvoiceId};
    use vatdesk_invoicing::{Discount, LineItem, NewInvoice, SubtotalBasis, TaxCode, VatConfig};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calc() -> InvoiceCalculator {
        InvoiceCalculator::new(VatConfig::new(dec!(5), SubtotalBasis::Gross).unwrap())
    }

    fn invoice(
        company_id: CompanyId,
        direction: InvoiceDirection,
        issued: NaiveDate,
        lines: Vec<LineItem>,
    ) -> Invoice {
        let mut invoice = Invoice::draft(NewInvoice {
            id: InvoiceId::new(),
            number: "INV".to_string(),
            direction,
            company_id,
            customer_id: CustomerId::new(),
            category_id: None,
            issue_date: issued,
            due_date: issued,
            currency: "AED".to_string(),
            vat_rate: None,
        })
        .unwrap();
        for line in lines {
            invoice.add_line(line).unwrap();
        }
        invoice.issue().unwrap();
        invoice
    }

    fn standard(amount: Decimal) -> LineItem {
        LineItem::new("standard", dec!(1), amount, Discount::none(), TaxCode::Standard).unwrap()
    }

    fn zero_rated(amount: Decimal) -> LineItem {
        LineItem::new("zero", dec!(1), amount, Discount::none(), TaxCode::Zero).unwrap()
    }

    #[test]
    fn quarter_bounds() {
        let q1 = VatPeriod::quarter(2024, 1).unwrap();
        assert_eq!(q1.start(), date(2024, 1, 1));
        assert_eq!(q1.end(), date(2024, 3, 31));

        let q4 = VatPeriod::quarter(2024, 4).unwrap();
        assert_eq!(q4.start(), date(2024, 10, 1));
        assert_eq!(q4.end(), date(2024, 12, 31));

        assert!(VatPeriod::quarter(2024, 5).is_err());
        assert!(VatPeriod::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn output_minus_input_vat() {
        let company = CompanyId::new();
        let q1 = VatPeriod::quarter(2024, 1).unwrap();
        let invoices = vec![
            invoice(company, InvoiceDirection::Receivable, date(2024, 1, 10), vec![standard(dec!(1000)), zero_rated(dec!(200))]),
            invoice(company, InvoiceDirection::Receivable, date(2024, 3, 31), vec![standard(dec!(100))]),
            invoice(company, InvoiceDirection::Payable, date(2024, 2, 5), vec![standard(dec!(400))]),
        ];

        let ret = VatReturn::prepare(VatReturnId::new(), company, q1, &invoices, &calc());
        assert_eq!(ret.invoice_count(), 3);
        assert_eq!(ret.output_vat(), dec!(55));
        assert_eq!(ret.input_vat(), dec!(20));
        assert_eq!(ret.net_vat_payable(), dec!(35));
        assert_eq!(ret.sales().zero.net, dec!(200));
        assert_eq!(ret.sales().net_total(), dec!(1300));
        assert_eq!(ret.purchases().net_total(), dec!(400));
        assert_eq!(ret.status(), VatReturnStatus::Draft);
    }

    #[test]
    fn excludes_unbooked_foreign_and_out_of_period_invoices() {
        let company = CompanyId::new();
        let q1 = VatPeriod::quarter(2024, 1).unwrap();

        let booked = invoice(company, InvoiceDirection::Receivable, date(2024, 2, 1), vec![standard(dec!(100))]);
        let mut voided = invoice(company, InvoiceDirection::Receivable, date(2024, 2, 1), vec![standard(dec!(100))]);
        voided.void().unwrap();
        let other_company = invoice(CompanyId::new(), InvoiceDirection::Receivable, date(2024, 2, 1), vec![standard(dec!(100))]);
        let next_quarter = invoice(company, InvoiceDirection::Receivable, date(2024, 4, 1), vec![standard(dec!(100))]);
        let mut paid = invoice(company, InvoiceDirection::Payable, date(2024, 1, 1), vec![standard(dec!(60))]);
        paid.mark_paid(date(2024, 1, 20)).unwrap();

        let invoices = [booked, voided, other_company, next_quarter, paid];
        let ret = VatReturn::prepare(VatReturnId::new(), company, q1, invoices.iter(), &calc());
        assert_eq!(ret.invoice_count(), 2);
        assert_eq!(ret.output_vat(), dec!(5));
        assert_eq!(ret.input_vat(), dec!(3));
    }

    #[test]
    fn refund_when_input_exceeds_output() {
        let company = CompanyId::new();
        let period = VatPeriod::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let invoices = vec![invoice(company, InvoiceDirection::Payable, date(2024, 1, 15), vec![standard(dec!(999.99))])];

        let ret = VatReturn::prepare(VatReturnId::new(), company, period, &invoices, &calc());
        assert_eq!(ret.net_vat_payable(), dec!(-49.9995));

        let summary = ret.summary();
        assert_eq!(summary.input_vat, dec!(50.00));
        assert_eq!(summary.net_vat_payable, dec!(-50.00));
        assert_eq!(summary.purchases_net, dec!(999.99));
    }

    #[test]
    fn filing_requires_period_end_and_happens_once() {
        let company = CompanyId::new();
        let q1 = VatPeriod::quarter(2024, 1).unwrap();
        let mut ret = VatReturn::prepare(VatReturnId::new(), company, q1, &Vec::<Invoice>::new(), &calc());
        assert_eq!(ret.net_vat_payable(), Decimal::ZERO);

        assert!(matches!(ret.file(date(2024, 3, 30)), Err(DomainError::InvariantViolation(_))));
        ret.file(date(2024, 4, 20)).unwrap();
        assert_eq!(ret.status(), VatReturnStatus::Filed);
        assert_eq!(ret.filed_on(), Some(date(2024, 4, 20)));
        assert!(matches!(ret.file(date(2024, 4, 21)), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn deserialization_checks_period_and_filing_state() {
        let company = CompanyId::new();
        let q1 = VatPeriod::quarter(2024, 1).unwrap();
        let invoices = vec![invoice(company, InvoiceDirection::Receivable, date(2024, 2, 1), vec![standard(dec!(100))])];
        let mut ret = VatReturn::prepare(VatReturnId::new(), company, q1, &invoices, &calc());
        ret.file(date(2024, 4, 2)).unwrap();

        let json = serde_json::to_value(&ret).unwrap();
        assert_eq!(serde_json::from_value::<VatReturn>(json.clone()).unwrap(), ret);

        let mut early = json.clone();
        early["filed_on"] = serde_json::json!("2024-03-01");
        assert!(serde_json::from_value::<VatReturn>(early).is_err());

        let mut undated = json.clone();
        undated["filed_on"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<VatReturn>(undated).is_err());

        let mut negative = json.clone();
        negative["sales"]["standard"]["vat"] = serde_json::json!("-5");
        assert!(serde_json::from_value::<VatReturn>(negative).is_err());

        let mut backwards = json;
        backwards["period"] = serde_json::json!({ "start": "2024-03-31", "end": "2024-01-01" });
        assert!(serde_json::from_value::<VatReturn>(backwards).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: net payable equals output VAT minus input VAT, and
            /// matches the per-invoice VAT sums.
            #[test]
            fn net_payable_is_output_minus_input(
                sales in prop::collection::vec(1i64..1_000_000, 0..8),
                purchases in prop::collection::vec(1i64..1_000_000, 0..8)
            ) {
                let company = CompanyId::new();
                let period = VatPeriod::quarter(2024, 2).unwrap();
                let issued = date(2024, 5, 1);

                let mut invoices = Vec::new();
                for cents in &sales {
                    invoices.push(invoice(company, InvoiceDirection::Receivable, issued, vec![standard(Decimal::new(*cents, 2))]));
                }
                for cents in &purchases {
                    invoices.push(invoice(company, InvoiceDirection::Payable, issued, vec![standard(Decimal::new(*cents, 2))]));
                }

                let calc = calc();
                let ret = VatReturn::prepare(VatReturnId::new(), company, period, &invoices, &calc);

                let expected_output: Decimal = invoices
                    .iter()
                    .filter(|i| i.direction() == InvoiceDirection::Receivable)
                    .map(|i| i.totals(&calc).vat_amount)
                    .sum();
                let expected_input: Decimal = invoices
                    .iter()
                    .filter(|i| i.direction() == InvoiceDirection::Payable)
                    .map(|i| i.totals(&calc).vat_amount)
                    .sum();

                prop_assert_eq!(ret.invoice_count(), sales.len() + purchases.len());
                prop_assert_eq!(ret.output_vat(), expected_output);
                prop_assert_eq!(ret.input_vat(), expected_input);
                prop_assert_eq!(ret.net_vat_payable(), expected_output - expected_input);
            }
        }
    }
}
