use serde::{Deserialize, Serialize};

use vatdesk_core::{CategoryId, DomainError, DomainResult, Entity};
use vatdesk_invoicing::{Invoice, InvoiceDirection};

/// Whether a category books income or expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub id: CategoryId,
    pub name: String,
    pub kind: CategoryKind,
    /// Optional chart-of-accounts code (e.g. "4000").
    pub code: Option<String>,
}

/// Accounting category invoices are filed under.
///
/// Deserialization goes through [`Category::create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewCategory", into = "NewCategory")]
pub struct Category {
    id: CategoryId,
    name: String,
    kind: CategoryKind,
    code: Option<String>,
}

impl Category {
    pub fn create(cmd: NewCategory) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        let code = cmd.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if let Some(code) = &code {
            if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
                return Err(DomainError::validation(format!("invalid category code: {code}")));
            }
        }

        Ok(Self {
            id: cmd.id,
            name: cmd.name.trim().to_string(),
            kind: cmd.kind,
            code,
        })
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        self.name = name.trim().to_string();
        Ok(())
    }

    /// Income categories take receivables, expense categories take payables.
    pub fn accepts(&self, direction: InvoiceDirection) -> bool {
        matches!(
            (self.kind, direction),
            (CategoryKind::Income, InvoiceDirection::Receivable)
                | (CategoryKind::Expense, InvoiceDirection::Payable)
        )
    }

    /// Check that `invoice` may be filed under this category.
    pub fn ensure_accepts(&self, invoice: &Invoice) -> DomainResult<()> {
        if invoice.category_id() != Some(self.id) {
            return Err(DomainError::invariant("invoice is filed under a different category"));
        }
        if !self.accepts(invoice.direction()) {
            return Err(DomainError::invariant(format!(
                "{:?} category cannot hold {:?} invoices",
                self.kind,
                invoice.direction()
            )));
        }
        Ok(())
    }
}

impl TryFrom<NewCategory> for Category {
    type Error = DomainError;

    fn try_from(cmd: NewCategory) -> Result<Self, Self::Error> {
        Self::create(cmd)
    }
}

impl From<Category> for NewCategory {
    fn from(category: Category) -> Self {
        NewCategory {
            id: category.id,
            name: category.name,
            kind: category.kind,
            code: category.code,
        }
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
