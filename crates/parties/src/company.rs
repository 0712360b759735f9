use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vatdesk_core::{CompanyId, DomainError, DomainResult, Entity};
use vatdesk_invoicing::{config::validate_rate, InvoiceCalculator, SubtotalBasis, VatConfig};

/// Input for registering a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompany {
    pub id: CompanyId,
    pub name: String,
    pub vat_number: Option<String>,
    /// ISO 3166 alpha-2 country code.
    pub country: Option<String>,
    /// Standard VAT rate in percent used for this company's invoices.
    pub default_vat_rate: Decimal,
}

/// The business filing VAT.
///
/// Deserialization goes through [`Company::register`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewCompany", into = "NewCompany")]
pub struct Company {
    id: CompanyId,
    name: String,
    vat_number: Option<String>,
    country: Option<String>,
    default_vat_rate: Decimal,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Company {
    pub fn register(cmd: NewCompany) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }
        validate_rate(cmd.default_vat_rate)?;

        let country = normalize_optional(cmd.country).map(|c| c.to_uppercase());
        if let Some(code) = &country {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(DomainError::validation("country must be a two-letter code"));
            }
        }

        Ok(Self {
            id: cmd.id,
            name: cmd.name.trim().to_string(),
            vat_number: normalize_optional(cmd.vat_number),
            country,
            default_vat_rate: cmd.default_vat_rate,
        })
    }

    pub fn id_typed(&self) -> CompanyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vat_number(&self) -> Option<&str> {
        self.vat_number.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn default_vat_rate(&self) -> Decimal {
        self.default_vat_rate
    }

    pub fn set_default_vat_rate(&mut self, rate: Decimal) -> DomainResult<()> {
        validate_rate(rate)?;
        self.default_vat_rate = rate;
        Ok(())
    }

    /// Calculator settings for this company's invoices.
    pub fn vat_config(&self, subtotal_basis: SubtotalBasis) -> VatConfig {
        VatConfig {
            standard_rate: self.default_vat_rate,
            subtotal_basis,
        }
    }

    pub fn calculator(&self, subtotal_basis: SubtotalBasis) -> InvoiceCalculator {
        InvoiceCalculator::new(self.vat_config(subtotal_basis))
    }
}

impl TryFrom<NewCompany> for Company {
    type Error = DomainError;

    fn try_from(cmd: NewCompany) -> Result<Self, Self::Error> {
        Self::register(cmd)
    }
}

impl From<Company> for NewCompany {
    fn from(company: Company) -> Self {
        NewCompany {
            id: company.id,
            name: company.name,
            vat_number: company.vat_number,
            country: company.country,
            default_vat_rate: company.default_vat_rate,
        }
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
