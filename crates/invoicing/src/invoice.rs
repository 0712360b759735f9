use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vatdesk_core::{CategoryId, CompanyId, CustomerId, DomainError, DomainResult, Entity, InvoiceId};

use crate::calculator::{InvoiceCalculator, InvoiceTotals, VatBreakdown};
use crate::config::validate_rate;
use crate::line_item::LineItem;

/// Which side of the books an invoice sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceDirection {
    /// Sales invoice: we bill a customer (output VAT).
    Receivable,
    /// Purchase invoice: a supplier bills us (input VAT).
    Payable,
}

/// Invoice status lifecycle: `draft → issued → paid`, or `void` from draft/issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Void,
}

impl InvoiceStatus {
    /// Issued and paid invoices count towards VAT and revenue.
    pub fn is_booked(&self) -> bool {
        matches!(self, InvoiceStatus::Issued | InvoiceStatus::Paid)
    }
}

/// Command-like input for creating a draft invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub id: InvoiceId,
    pub number: String,
    pub direction: InvoiceDirection,
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    pub category_id: Option<CategoryId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    /// Invoice-level standard rate; `None` uses the calculator's rate.
    pub vat_rate: Option<Decimal>,
}

/// Serialized form of an invoice; validated on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub number: String,
    pub direction: InvoiceDirection,
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    #[serde(default)]
    pub vat_rate: Option<Decimal>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
}

/// Invoice entity (receivable or payable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InvoiceRecord", into = "InvoiceRecord")]
pub struct Invoice {
    id: InvoiceId,
    number: String,
    direction: InvoiceDirection,
    company_id: CompanyId,
    customer_id: CustomerId,
    category_id: Option<CategoryId>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    vat_rate: Option<Decimal>,
    lines: Vec<LineItem>,
    status: InvoiceStatus,
    paid_on: Option<NaiveDate>,
}

fn validate_currency(currency: &str) -> DomainResult<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(DomainError::validation(
            "currency must be a three-letter ISO code (e.g. EUR)",
        ));
    }
    Ok(())
}

impl Invoice {
    /// Create a draft invoice with no lines.
    pub fn draft(cmd: NewInvoice) -> DomainResult<Self> {
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("invoice number must not be empty"));
        }
        if cmd.due_date < cmd.issue_date {
            return Err(DomainError::validation("due date must not precede issue date"));
        }
        validate_currency(&cmd.currency)?;
        if let Some(rate) = cmd.vat_rate {
            validate_rate(rate)?;
        }

        Ok(Self {
            id: cmd.id,
            number: cmd.number,
            direction: cmd.direction,
            company_id: cmd.company_id,
            customer_id: cmd.customer_id,
            category_id: cmd.category_id,
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            currency: cmd.currency,
            vat_rate: cmd.vat_rate,
            lines: Vec::new(),
            status: InvoiceStatus::Draft,
            paid_on: None,
        })
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn direction(&self) -> InvoiceDirection {
        self.direction
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn vat_rate(&self) -> Option<Decimal> {
        self.vat_rate
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn paid_on(&self) -> Option<NaiveDate> {
        self.paid_on
    }

    fn ensure_draft(&self) -> DomainResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invariant("only draft invoices can be edited"));
        }
        Ok(())
    }

    fn ensure_index(&self, index: usize) -> DomainResult<()> {
        if index >= self.lines.len() {
            return Err(DomainError::validation(format!(
                "line index {index} out of range ({} lines)",
                self.lines.len()
            )));
        }
        Ok(())
    }

    pub fn add_line(&mut self, line: LineItem) -> DomainResult<()> {
        self.ensure_draft()?;
        self.lines.push(line);
        Ok(())
    }

    pub fn replace_line(&mut self, index: usize, line: LineItem) -> DomainResult<()> {
        self.ensure_draft()?;
        self.ensure_index(index)?;
        self.lines[index] = line;
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> DomainResult<LineItem> {
        self.ensure_draft()?;
        self.ensure_index(index)?;
        Ok(self.lines.remove(index))
    }

    /// Set or clear the invoice-level standard rate (draft only).
    pub fn set_vat_rate(&mut self, rate: Option<Decimal>) -> DomainResult<()> {
        self.ensure_draft()?;
        if let Some(rate) = rate {
            validate_rate(rate)?;
        }
        self.vat_rate = rate;
        Ok(())
    }

    pub fn issue(&mut self) -> DomainResult<()> {
        match self.status {
            InvoiceStatus::Draft => {}
            InvoiceStatus::Issued | InvoiceStatus::Paid => {
                return Err(DomainError::conflict("invoice already issued"));
            }
            InvoiceStatus::Void => {
                return Err(DomainError::invariant("cannot issue a void invoice"));
            }
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot issue invoice without lines"));
        }
        self.status = InvoiceStatus::Issued;
        Ok(())
    }

    pub fn mark_paid(&mut self, paid_on: NaiveDate) -> DomainResult<()> {
        match self.status {
            InvoiceStatus::Issued => {}
            InvoiceStatus::Paid => return Err(DomainError::conflict("invoice already paid")),
            InvoiceStatus::Draft | InvoiceStatus::Void => {
                return Err(DomainError::invariant("only issued invoices can be paid"));
            }
        }
        if paid_on < self.issue_date {
            return Err(DomainError::validation("payment date must not precede issue date"));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_on = Some(paid_on);
        Ok(())
    }

    pub fn void(&mut self) -> DomainResult<()> {
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Issued => {
                self.status = InvoiceStatus::Void;
                Ok(())
            }
            InvoiceStatus::Paid => Err(DomainError::invariant("cannot void a paid invoice")),
            InvoiceStatus::Void => Err(DomainError::conflict("invoice is already void")),
        }
    }

    /// Issued, unpaid and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Issued && today > self.due_date
    }

    /// The calculator with this invoice's rate override applied.
    pub fn calculator(&self, base: &InvoiceCalculator) -> InvoiceCalculator {
        match self.vat_rate {
            Some(rate) => base.with_standard_rate(rate),
            None => *base,
        }
    }

    pub fn totals(&self, base: &InvoiceCalculator) -> InvoiceTotals {
        self.calculator(base).compute_invoice_totals(&self.lines)
    }

    pub fn vat_breakdown(&self, base: &InvoiceCalculator) -> VatBreakdown {
        self.calculator(base).vat_breakdown(&self.lines)
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = DomainError;

    fn try_from(record: InvoiceRecord) -> Result<Self, Self::Error> {
        let mut invoice = Invoice::draft(NewInvoice {
            id: record.id,
            number: record.number,
            direction: record.direction,
            company_id: record.company_id,
            customer_id: record.customer_id,
            category_id: record.category_id,
            issue_date: record.issue_date,
            due_date: record.due_date,
            currency: record.currency,
            vat_rate: record.vat_rate,
        })?;
        invoice.lines = record.lines;

        match (record.status, record.paid_on) {
            (InvoiceStatus::Draft, None) => {}
            (InvoiceStatus::Issued, None) => invoice.issue()?,
            (InvoiceStatus::Paid, Some(paid_on)) => {
                invoice.issue()?;
                invoice.mark_paid(paid_on)?;
            }
            (InvoiceStatus::Void, None) => invoice.status = InvoiceStatus::Void,
            (InvoiceStatus::Paid, None) => {
                return Err(DomainError::validation("paid invoice requires paid_on"));
            }
            (_, Some(_)) => {
                return Err(DomainError::validation("paid_on is only valid for paid invoices"));
            }
        }
        Ok(invoice)
    }
}

impl From<Invoice> for InvoiceRecord {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            number: invoice.number,
            direction: invoice.direction,
            company_id: invoice.company_id,
            customer_id: invoice.customer_id,
            category_id: invoice.category_id,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency,
            vat_rate: invoice.vat_rate,
            lines: invoice.lines,
            status: invoice.status,
            paid_on: invoice.paid_on,
        }
    }
}
