use serde::{Deserialize, Serialize};

use vatdesk_core::{CompanyId, CustomerId, DomainError, DomainResult, Entity};

/// Counterparty kind: who we bill, or who bills us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerKind {
    Customer,
    Supplier,
}

/// Counterparty status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Suspended,
}

/// Contact information for a counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    fn validate(&self) -> DomainResult<()> {
        if let Some(email) = &self.email {
            let well_formed = email
                .split_once('@')
                .is_some_and(|(user, host)| !user.is_empty() && host.contains('.'));
            if !well_formed {
                return Err(DomainError::validation(format!("invalid email address: {email}")));
            }
        }
        Ok(())
    }
}

/// Input for registering a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub id: CustomerId,
    pub company_id: CompanyId,
    pub kind: CustomerKind,
    pub name: String,
    pub vat_number: Option<String>,
    pub contact: Option<ContactInfo>,
}

/// Partial update; `None` keeps the existing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub name: Option<String>,
    pub vat_number: Option<String>,
    pub contact: Option<ContactInfo>,
}

/// Stored form of a [`Customer`]; loading re-runs registration checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub company_id: CompanyId,
    pub kind: CustomerKind,
    pub name: String,
    pub vat_number: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
    pub status: CustomerStatus,
}

/// Customer or supplier of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomerRecord", into = "CustomerRecord")]
pub struct Customer {
    id: CustomerId,
    company_id: CompanyId,
    kind: CustomerKind,
    name: String,
    vat_number: Option<String>,
    contact: ContactInfo,
    status: CustomerStatus,
}

impl Customer {
    pub fn register(cmd: NewCustomer) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let contact = cmd.contact.unwrap_or_default();
        contact.validate()?;

        Ok(Self {
            id: cmd.id,
            company_id: cmd.company_id,
            kind: cmd.kind,
            name: cmd.name,
            vat_number: cmd.vat_number.filter(|v| !v.trim().is_empty()),
            contact,
            status: CustomerStatus::Active,
        })
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn kind(&self) -> CustomerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vat_number(&self) -> Option<&str> {
        self.vat_number.as_deref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    /// Suspended counterparties cannot be invoiced.
    pub fn can_transact(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    pub fn update_details(&mut self, update: UpdateDetails) -> DomainResult<()> {
        let name = update.name.unwrap_or_else(|| self.name.clone());
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let contact = update.contact.unwrap_or_else(|| self.contact.clone());
        contact.validate()?;

        self.name = name;
        self.contact = contact;
        if let Some(vat_number) = update.vat_number {
            self.vat_number = Some(vat_number).filter(|v| !v.trim().is_empty());
        }
        Ok(())
    }

    pub fn suspend(&mut self) -> DomainResult<()> {
        if self.status == CustomerStatus::Suspended {
            return Err(DomainError::conflict("customer is already suspended"));
        }
        self.status = CustomerStatus::Suspended;
        Ok(())
    }

    pub fn reactivate(&mut self) -> DomainResult<()> {
        if self.status == CustomerStatus::Active {
            return Err(DomainError::conflict("customer is already active"));
        }
        self.status = CustomerStatus::Active;
        Ok(())
    }
}

impl TryFrom<CustomerRecord> for Customer {
    type Error = DomainError;

    fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
        let mut customer = Self::register(NewCustomer {
            id: record.id,
            company_id: record.company_id,
            kind: record.kind,
            name: record.name,
            vat_number: record.vat_number,
            contact: Some(record.contact),
        })?;
        customer.status = record.status;
        Ok(customer)
    }
}

impl From<Customer> for CustomerRecord {
    fn from(customer: Customer) -> Self {
        CustomerRecord {
            id: customer.id,
            company_id: customer.company_id,
            kind: customer.kind,
            name: customer.name,
            vat_number: customer.vat_number,
            contact: customer.contact,
            status: customer.status,
        }
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
