//! VAT calculation settings.
//!
//! The standard rate and the meaning of "subtotal" are configuration, never
//! literals inside the calculator. Binaries load them from the environment;
//! companies carry their own default rate (see `vatdesk-parties`).

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vatdesk_core::{DomainError, DomainResult};

/// Environment variable holding the standard VAT rate in percent (e.g. `5`).
pub const STANDARD_RATE_ENV: &str = "VATDESK_STANDARD_VAT_RATE";

/// Environment variable selecting the subtotal basis (`gross` or `net`).
pub const SUBTOTAL_BASIS_ENV: &str = "VATDESK_SUBTOTAL_BASIS";

/// What the reported invoice subtotal means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtotalBasis {
    /// Σ quantity × unit price, before discounts.
    #[default]
    Gross,
    /// Σ line net amounts, after discounts.
    Net,
}

impl FromStr for SubtotalBasis {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gross" => Ok(SubtotalBasis::Gross),
            "net" => Ok(SubtotalBasis::Net),
            other => Err(DomainError::validation(format!(
                "subtotal basis must be one of: gross, net (got {other:?})"
            ))),
        }
    }
}

/// Settings for the invoice totals calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatConfig {
    /// Rate applied to `standard` lines without their own rate, in percent.
    pub standard_rate: Decimal,
    #[serde(default)]
    pub subtotal_basis: SubtotalBasis,
}

impl Default for VatConfig {
    fn default() -> Self {
        Self {
            standard_rate: Decimal::new(5, 0),
            subtotal_basis: SubtotalBasis::Gross,
        }
    }
}

impl VatConfig {
    pub fn new(standard_rate: Decimal, subtotal_basis: SubtotalBasis) -> DomainResult<Self> {
        validate_rate(standard_rate)?;
        Ok(Self {
            standard_rate,
            subtotal_basis,
        })
    }

    /// Copy of this config with a different standard rate.
    pub fn with_standard_rate(self, standard_rate: Decimal) -> DomainResult<Self> {
        Self::new(standard_rate, self.subtotal_basis)
    }

    /// Load from `VATDESK_STANDARD_VAT_RATE` / `VATDESK_SUBTOTAL_BASIS`.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (unset keys fall back to defaults).
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let standard_rate = match lookup(STANDARD_RATE_ENV) {
            Some(raw) => Decimal::from_str(raw.trim()).map_err(|e| {
                DomainError::validation(format!("{STANDARD_RATE_ENV}: {e}"))
            })?,
            None => {
                tracing::warn!(
                    rate = %defaults.standard_rate,
                    "{STANDARD_RATE_ENV} not set; using default standard VAT rate"
                );
                defaults.standard_rate
            }
        };

        let subtotal_basis = match lookup(SUBTOTAL_BASIS_ENV) {
            Some(raw) => raw.parse()?,
            None => defaults.subtotal_basis,
        };

        Self::new(standard_rate, subtotal_basis)
    }
}

/// VAT rates are percentages within 0..=100.
pub fn validate_rate(rate: Decimal) -> DomainResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation(format!(
            "VAT rate must be between 0 and 100 (got {rate})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = VatConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, VatConfig::default());
        assert_eq!(cfg.standard_rate, dec!(5));
        assert_eq!(cfg.subtotal_basis, SubtotalBasis::Gross);
    }

    #[test]
    fn reads_rate_and_basis() {
        let cfg = VatConfig::from_lookup(lookup(&[
            (STANDARD_RATE_ENV, " 20 "),
            (SUBTOTAL_BASIS_ENV, "NET"),
        ]))
        .unwrap();
        assert_eq!(cfg.standard_rate, dec!(20));
        assert_eq!(cfg.subtotal_basis, SubtotalBasis::Net);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(VatConfig::from_lookup(lookup(&[(STANDARD_RATE_ENV, "five")])).is_err());
        assert!(VatConfig::from_lookup(lookup(&[(STANDARD_RATE_ENV, "120")])).is_err());
        assert!(VatConfig::from_lookup(lookup(&[(SUBTOTAL_BASIS_ENV, "both")])).is_err());
    }

    #[test]
    fn with_standard_rate_keeps_basis() {
        let cfg = VatConfig::new(dec!(5), SubtotalBasis::Net).unwrap();
        let cfg = cfg.with_standard_rate(dec!(7.5)).unwrap();
        assert_eq!(cfg.standard_rate, dec!(7.5));
        assert_eq!(cfg.subtotal_basis, SubtotalBasis::Net);
        assert!(cfg.with_standard_rate(dec!(-1)).is_err());
    }
}
