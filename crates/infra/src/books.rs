//! Application service over the repositories.
//!
//! `Books` owns one repository per entity type and enforces the rules that
//! span entities: an invoice's company, counterparty and category must exist
//! and fit together, and totals are always computed with the owning
//! company's VAT settings.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vatdesk_accounting::{Category, DashboardSummary, NewCategory, VatPeriod, VatReturn};
use vatdesk_core::{CompanyId, CustomerId, DomainError, DomainResult, InvoiceId, VatReturnId};
use vatdesk_invoicing::{
    Invoice, InvoiceCalculator, InvoiceDirection, InvoiceStatus, InvoiceTotals, SubtotalBasis, VatBreakdown,
};
use vatdesk_parties::{Company, Customer, CustomerKind, NewCompany, NewCustomer, UpdateDetails};

use crate::repository::{InMemoryRepository, Repository};

/// Serializable dump of everything `Books` holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooksSnapshot {
    pub companies: Vec<Company>,
    pub customers: Vec<Customer>,
    pub categories: Vec<Category>,
    pub invoices: Vec<Invoice>,
    pub vat_returns: Vec<VatReturn>,
}

/// How strictly an invoice's counterparty is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// New or edited work: suspended counterparties are refused for drafts.
    Live,
    /// Records restored from a snapshot were valid when written.
    Restore,
}

pub struct Books {
    companies: Arc<dyn Repository<Company>>,
    customers: Arc<dyn Repository<Customer>>,
    categories: Arc<dyn Repository<Category>>,
    invoices: Arc<dyn Repository<Invoice>>,
    vat_returns: Arc<dyn Repository<VatReturn>>,
    subtotal_basis: SubtotalBasis,
}

impl Books {
    pub fn new(
        companies: Arc<dyn Repository<Company>>,
        customers: Arc<dyn Repository<Customer>>,
        categories: Arc<dyn Repository<Category>>,
        invoices: Arc<dyn Repository<Invoice>>,
        vat_returns: Arc<dyn Repository<VatReturn>>,
        subtotal_basis: SubtotalBasis,
    ) -> Self {
        Self {
            companies,
            customers,
            categories,
            invoices,
            vat_returns,
            subtotal_basis,
        }
    }

    pub fn in_memory(subtotal_basis: SubtotalBasis) -> Self {
        Self::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            subtotal_basis,
        )
    }

    /// Load a snapshot into fresh in-memory books.
    ///
    /// Entities are validated while deserializing; this re-checks the rules
    /// between them (references, one VAT return per company and period).
    pub fn from_snapshot(snapshot: BooksSnapshot, subtotal_basis: SubtotalBasis) -> DomainResult<Self> {
        let books = Self::in_memory(subtotal_basis);
        for company in snapshot.companies {
            books.companies.insert(company)?;
        }
        for customer in snapshot.customers {
            books.add_customer(customer)?;
        }
        for category in snapshot.categories {
            books.categories.insert(category)?;
        }
        for invoice in snapshot.invoices {
            books.check_references(&invoice, Admission::Restore)?;
            books.invoices.insert(invoice)?;
        }
        for vat_return in snapshot.vat_returns {
            books.company(vat_return.company_id())?;
            books.ensure_period_free(vat_return.company_id(), vat_return.period())?;
            books.vat_returns.insert(vat_return)?;
        }
        tracing::debug!(
            invoices = books.invoices.list()?.len(),
            "loaded books snapshot"
        );
        Ok(books)
    }

    pub fn snapshot(&self) -> DomainResult<BooksSnapshot> {
        Ok(BooksSnapshot {
            companies: self.companies.list()?,
            customers: self.customers.list()?,
            categories: self.categories.list()?,
            invoices: self.invoices.list()?,
            vat_returns: self.vat_returns.list()?,
        })
    }

    pub fn subtotal_basis(&self) -> SubtotalBasis {
        self.subtotal_basis
    }

    pub fn register_company(&self, cmd: NewCompany) -> DomainResult<Company> {
        let company = Company::register(cmd)?;
        self.companies.insert(company.clone())?;
        Ok(company)
    }

    pub fn company(&self, id: CompanyId) -> DomainResult<Company> {
        self.companies
            .get(&id)?
            .ok_or_else(|| DomainError::not_found(format!("company {id}")))
    }

    /// Calculator configured with the company's default rate.
    pub fn calculator_for(&self, company_id: CompanyId) -> DomainResult<InvoiceCalculator> {
        Ok(self.company(company_id)?.calculator(self.subtotal_basis))
    }

    pub fn register_customer(&self, cmd: NewCustomer) -> DomainResult<Customer> {
        let customer = Customer::register(cmd)?;
        self.add_customer(customer.clone())?;
        Ok(customer)
    }

    fn add_customer(&self, customer: Customer) -> DomainResult<()> {
        self.company(customer.company_id())?;
        self.customers.insert(customer)?;
        Ok(())
    }

    pub fn customer(&self, id: CustomerId) -> DomainResult<Customer> {
        self.customers
            .get(&id)?
            .ok_or_else(|| DomainError::not_found(format!("customer {id}")))
    }

    pub fn update_customer(&self, id: CustomerId, update: UpdateDetails) -> DomainResult<Customer> {
        self.modify_customer(id, |customer| customer.update_details(update))
    }

    /// Suspended counterparties cannot receive new draft invoices.
    pub fn suspend_customer(&self, id: CustomerId) -> DomainResult<Customer> {
        self.modify_customer(id, Customer::suspend)
    }

    pub fn reactivate_customer(&self, id: CustomerId) -> DomainResult<Customer> {
        self.modify_customer(id, Customer::reactivate)
    }

    pub fn customers_of(&self, company_id: CompanyId) -> DomainResult<Vec<Customer>> {
        Ok(self.customers.find(&|c: &Customer| c.company_id() == company_id)?)
    }

    pub fn create_category(&self, cmd: NewCategory) -> DomainResult<Category> {
        let category = Category::create(cmd)?;
        self.categories.insert(category.clone())?;
        Ok(category)
    }

    /// Store a new invoice after checking it against its company,
    /// counterparty and category.
    pub fn record_invoice(&self, invoice: Invoice) -> DomainResult<()> {
        self.check_references(&invoice, Admission::Live)?;
        let id = invoice.id_typed();
        self.invoices.insert(invoice)?;
        tracing::info!(invoice_id = %id, "recorded invoice");
        Ok(())
    }

    /// Replace a stored draft (e.g. after editing its lines).
    ///
    /// Only drafts can be replaced, and only by another draft with the same
    /// company and direction; status changes go through `issue_invoice`,
    /// `mark_invoice_paid` and `void_invoice`.
    pub fn save_invoice(&self, invoice: Invoice) -> DomainResult<()> {
        let stored = self.invoice(invoice.id_typed())?;
        if stored.status() != InvoiceStatus::Draft {
            return Err(DomainError::invariant(format!(
                "{:?} invoices cannot be edited",
                stored.status()
            )));
        }
        if invoice.status() != InvoiceStatus::Draft {
            return Err(DomainError::invariant("saving cannot change an invoice's status"));
        }
        if invoice.company_id() != stored.company_id() || invoice.direction() != stored.direction() {
            return Err(DomainError::invariant("an invoice's company and direction are fixed"));
        }
        self.check_references(&invoice, Admission::Live)?;
        self.invoices.update(invoice)?;
        Ok(())
    }

    pub fn invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        self.invoices
            .get(&id)?
            .ok_or_else(|| DomainError::not_found(format!("invoice {id}")))
    }

    pub fn invoices_of(&self, company_id: CompanyId) -> DomainResult<Vec<Invoice>> {
        Ok(self.invoices.find(&|i: &Invoice| i.company_id() == company_id)?)
    }

    pub fn delete_invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        let invoice = self.invoice(id)?;
        if invoice.status() != InvoiceStatus::Draft {
            return Err(DomainError::invariant("only drafts can be deleted; void issued invoices"));
        }
        Ok(self.invoices.delete(&id)?)
    }

    pub fn issue_invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        self.modify_invoice(id, |invoice| invoice.issue())
    }

    pub fn mark_invoice_paid(&self, id: InvoiceId, paid_on: NaiveDate) -> DomainResult<Invoice> {
        self.modify_invoice(id, |invoice| invoice.mark_paid(paid_on))
    }

    pub fn void_invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        self.modify_invoice(id, |invoice| invoice.void())
    }

    /// Rounded totals of a stored invoice.
    pub fn invoice_totals(&self, id: InvoiceId) -> DomainResult<InvoiceTotals> {
        let invoice = self.invoice(id)?;
        let calculator = self.calculator_for(invoice.company_id())?;
        Ok(invoice.totals(&calculator).rounded())
    }

    pub fn invoice_vat_breakdown(&self, id: InvoiceId) -> DomainResult<VatBreakdown> {
        let invoice = self.invoice(id)?;
        let calculator = self.calculator_for(invoice.company_id())?;
        Ok(invoice.vat_breakdown(&calculator).rounded())
    }

    /// Prepare and store a draft return. At most one return per company and
    /// period.
    pub fn prepare_vat_return(&self, company_id: CompanyId, period: VatPeriod) -> DomainResult<VatReturn> {
        let calculator = self.calculator_for(company_id)?;
        self.ensure_period_free(company_id, period)?;

        let invoices = self.invoices_of(company_id)?;
        let vat_return = VatReturn::prepare(VatReturnId::new(), company_id, period, &invoices, &calculator);
        self.vat_returns.insert(vat_return.clone())?;
        tracing::info!(
            %company_id,
            %period,
            net_vat_payable = %vat_return.net_vat_payable(),
            "prepared VAT return"
        );
        Ok(vat_return)
    }

    pub fn file_vat_return(&self, id: VatReturnId, filed_on: NaiveDate) -> DomainResult<VatReturn> {
        let mut vat_return = self
            .vat_returns
            .get(&id)?
            .ok_or_else(|| DomainError::not_found(format!("VAT return {id}")))?;
        vat_return.file(filed_on)?;
        self.vat_returns.update(vat_return.clone())?;
        Ok(vat_return)
    }

    pub fn vat_returns_of(&self, company_id: CompanyId) -> DomainResult<Vec<VatReturn>> {
        Ok(self.vat_returns.find(&|r: &VatReturn| r.company_id() == company_id)?)
    }

    pub fn dashboard(&self, company_id: CompanyId, today: NaiveDate) -> DomainResult<DashboardSummary> {
        let calculator = self.calculator_for(company_id)?;
        let invoices = self.invoices_of(company_id)?;
        Ok(DashboardSummary::build(&invoices, &calculator, today))
    }

    fn ensure_period_free(&self, company_id: CompanyId, period: VatPeriod) -> DomainResult<()> {
        let existing = self
            .vat_returns
            .find(&|r: &VatReturn| r.company_id() == company_id && r.period() == period)?;
        if !existing.is_empty() {
            return Err(DomainError::conflict(format!("a VAT return for {period} already exists")));
        }
        Ok(())
    }

    fn modify_customer<F>(&self, id: CustomerId, change: F) -> DomainResult<Customer>
    where
        F: FnOnce(&mut Customer) -> DomainResult<()>,
    {
        let mut customer = self.customer(id)?;
        change(&mut customer)?;
        self.customers.update(customer.clone())?;
        tracing::debug!(customer_id = %id, status = ?customer.status(), "customer updated");
        Ok(customer)
    }

    fn modify_invoice<F>(&self, id: InvoiceId, change: F) -> DomainResult<Invoice>
    where
        F: FnOnce(&mut Invoice) -> DomainResult<()>,
    {
        let mut invoice = self.invoice(id)?;
        change(&mut invoice)?;
        self.invoices.update(invoice.clone())?;
        tracing::debug!(invoice_id = %id, status = ?invoice.status(), "invoice updated");
        Ok(invoice)
    }

    fn check_references(&self, invoice: &Invoice, admission: Admission) -> DomainResult<()> {
        self.company(invoice.company_id())?;

        let customer = self
            .customers
            .get(&invoice.customer_id())?
            .ok_or_else(|| DomainError::validation("invoice counterparty does not exist"))?;
        if customer.company_id() != invoice.company_id() {
            return Err(DomainError::validation("counterparty belongs to another company"));
        }
        let expected = match invoice.direction() {
            InvoiceDirection::Receivable => CustomerKind::Customer,
            InvoiceDirection::Payable => CustomerKind::Supplier,
        };
        if customer.kind() != expected {
            return Err(DomainError::validation(format!(
                "{:?} invoices need a {:?} counterparty",
                invoice.direction(),
                expected
            )));
        }
        if admission == Admission::Live && !customer.can_transact() && !invoice.status().is_booked() {
            return Err(DomainError::invariant("counterparty is suspended"));
        }

        if let Some(category_id) = invoice.category_id() {
            let category = self
                .categories
                .get(&category_id)?
                .ok_or_else(|| DomainError::validation("invoice category does not exist"))?;
            category.ensure_accepts(invoice)?;
        }
        Ok(())
    }
}
