use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vatdesk_core::{DomainError, DomainResult, ValueObject};

use crate::config::validate_rate;
use crate::money;

/// VAT treatment of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxCode {
    #[default]
    Standard,
    Zero,
    Exempt,
}

impl TaxCode {
    pub const ALL: [TaxCode; 3] = [TaxCode::Standard, TaxCode::Zero, TaxCode::Exempt];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCode::Standard => "standard",
            TaxCode::Zero => "zero",
            TaxCode::Exempt => "exempt",
        }
    }

    /// Whether VAT is charged on lines with this code.
    pub fn is_taxed(&self) -> bool {
        matches!(self, TaxCode::Standard)
    }
}

impl FromStr for TaxCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(TaxCode::Standard),
            "zero" => Ok(TaxCode::Zero),
            "exempt" => Ok(TaxCode::Exempt),
            other => Err(DomainError::validation(format!(
                "tax code must be one of: standard, zero, exempt (got {other:?})"
            ))),
        }
    }
}

impl core::fmt::Display for TaxCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Percent of the line's gross amount.
    #[default]
    Percentage,
    /// Absolute amount taken off the whole line (not per unit).
    Fixed,
}

impl FromStr for DiscountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" => Ok(DiscountKind::Percentage),
            "fixed" => Ok(DiscountKind::Fixed),
            other => Err(DomainError::validation(format!(
                "discount type must be one of: percentage, fixed (got {other:?})"
            ))),
        }
    }
}

/// Line discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl ValueObject for Discount {}

impl Default for Discount {
    fn default() -> Self {
        Self::none()
    }
}

impl Discount {
    /// No discount (0%).
    pub fn none() -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value: Decimal::ZERO,
        }
    }

    pub fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn fixed(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
        }
    }

    /// Amount this discount takes off `gross`. Not clamped.
    pub fn amount_on(&self, gross: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percentage => money::percent_of(gross, self.value),
            DiscountKind::Fixed => self.value,
        }
    }

    fn validate(&self, gross: Decimal) -> DomainResult<()> {
        if self.value < Decimal::ZERO {
            return Err(DomainError::validation("discount must not be negative"));
        }
        match self.kind {
            DiscountKind::Percentage if self.value > Decimal::ONE_HUNDRED => Err(
                DomainError::validation("percentage discount must not exceed 100"),
            ),
            DiscountKind::Fixed if self.value > gross => Err(DomainError::validation(
                "fixed discount must not exceed the line amount",
            )),
            _ => Ok(()),
        }
    }
}

/// Anything the totals calculator can price: validated lines and raw drafts.
pub trait LineInput {
    fn quantity(&self) -> Decimal;
    fn unit_price(&self) -> Decimal;
    fn discount(&self) -> Discount;
    fn tax_code(&self) -> TaxCode;

    /// Per-line VAT rate (percent) overriding the invoice rate.
    fn vat_rate(&self) -> Option<Decimal> {
        None
    }
}

impl<L: LineInput + ?Sized> LineInput for &L {
    fn quantity(&self) -> Decimal {
        (**self).quantity()
    }

    fn unit_price(&self) -> Decimal {
        (**self).unit_price()
    }

    fn discount(&self) -> Discount {
        (**self).discount()
    }

    fn tax_code(&self) -> TaxCode {
        (**self).tax_code()
    }

    fn vat_rate(&self) -> Option<Decimal> {
        (**self).vat_rate()
    }
}

/// Validated invoice line.
///
/// Invariants (checked on construction and deserialization):
/// - description is not blank
/// - quantity ≥ 1, unit price ≥ 0
/// - discount ≥ 0; percentage ≤ 100; fixed ≤ quantity × unit price
/// - VAT rate override, when present, is within 0..=100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineItemDraft")]
pub struct LineItem {
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    discount: Discount,
    tax_code: TaxCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    vat_rate: Option<Decimal>,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        discount: Discount,
        tax_code: TaxCode,
    ) -> DomainResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::validation("line description must not be empty"));
        }
        if quantity < Decimal::ONE {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit price must not be negative"));
        }
        discount.validate(quantity.saturating_mul(unit_price))?;

        Ok(Self {
            description,
            quantity,
            unit_price,
            discount,
            tax_code,
            vat_rate: None,
        })
    }

    /// Attach a per-line VAT rate (percent) overriding the invoice rate.
    pub fn with_vat_rate(mut self, rate: Decimal) -> DomainResult<Self> {
        validate_rate(rate)?;
        self.vat_rate = Some(rate);
        Ok(self)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl ValueObject for LineItem {}

impl LineInput for LineItem {
    fn quantity(&self) -> Decimal {
        self.quantity
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn discount(&self) -> Discount {
        self.discount
    }

    fn tax_code(&self) -> TaxCode {
        self.tax_code
    }

    fn vat_rate(&self) -> Option<Decimal> {
        self.vat_rate
    }
}

/// Discount as it arrives from a form row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountDraft {
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Value,
    #[serde(default)]
    pub value: Value,
}

/// Loosely-typed line as edited in a form.
///
/// Every numeric field may hold anything the form produced. The calculator
/// prices drafts directly, coercing non-numeric values to zero; use
/// `LineItem::try_from(draft)` to cross the validation boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemDraft {
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default, alias = "unitPrice")]
    pub unit_price: Value,
    #[serde(default)]
    pub discount: Option<DiscountDraft>,
    #[serde(default, alias = "taxCode")]
    pub tax_code: Value,
    #[serde(default, alias = "vatRate")]
    pub vat_rate: Value,
}

impl LineItemDraft {
    fn description_text(&self) -> String {
        match &self.description {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn discount_kind_lenient(&self) -> DiscountKind {
        self.discount
            .as_ref()
            .and_then(|d| d.kind.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn discount_value(&self) -> &Value {
        self.discount.as_ref().map(|d| &d.value).unwrap_or(&Value::Null)
    }
}

impl LineInput for LineItemDraft {
    fn quantity(&self) -> Decimal {
        money::coerce_json(&self.quantity)
    }

    fn unit_price(&self) -> Decimal {
        money::coerce_json(&self.unit_price)
    }

    fn discount(&self) -> Discount {
        Discount {
            kind: self.discount_kind_lenient(),
            value: money::coerce_json(self.discount_value()),
        }
    }

    /// Unknown or missing tax codes price as standard.
    fn tax_code(&self) -> TaxCode {
        self.tax_code
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Unparseable or out-of-range overrides are ignored, so the line falls
    /// back to the standard rate instead of pricing at 0%.
    fn vat_rate(&self) -> Option<Decimal> {
        money::parse_optional_json(&self.vat_rate).filter(|rate| validate_rate(*rate).is_ok())
    }
}

fn require_number(value: &Value, field: &str) -> DomainResult<Decimal> {
    money::parse_json(value)
        .ok_or_else(|| DomainError::validation(format!("{field} must be a number")))
}

fn parse_optional<T>(value: &Value, field: &str) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.parse().map(Some),
        _ => Err(DomainError::validation(format!("{field} must be a string"))),
    }
}

impl TryFrom<LineItemDraft> for LineItem {
    type Error = DomainError;

    fn try_from(draft: LineItemDraft) -> Result<Self, Self::Error> {
        let quantity = require_number(&draft.quantity, "quantity")?;
        let unit_price = require_number(&draft.unit_price, "unit price")?;

        let discount = match &draft.discount {
            None => Discount::none(),
            Some(d) => Discount {
                kind: parse_optional(&d.kind, "discount type")?.unwrap_or_default(),
                value: match &d.value {
                    Value::Null => Decimal::ZERO,
                    v => require_number(v, "discount value")?,
                },
            },
        };
        let tax_code = parse_optional(&draft.tax_code, "tax code")?.unwrap_or_default();

        let item = LineItem::new(draft.description_text(), quantity, unit_price, discount, tax_code)?;
        match &draft.vat_rate {
            Value::Null => Ok(item),
            Value::String(s) if s.trim().is_empty() => Ok(item),
            v => item.with_vat_rate(require_number(v, "VAT rate")?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn draft(value: serde_json::Value) -> LineItemDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn new_line_rejects_quantity_below_one() {
        let err = LineItem::new("Consulting", dec!(0), dec!(10), Discount::none(), TaxCode::Standard)
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("quantity") => {}
            other => panic!("expected quantity validation error, got {other:?}"),
        }
    }

    #[test]
    fn new_line_rejects_negative_price_and_blank_description() {
        assert!(LineItem::new("x", dec!(1), dec!(-0.01), Discount::none(), TaxCode::Zero).is_err());
        assert!(LineItem::new("  ", dec!(1), dec!(1), Discount::none(), TaxCode::Zero).is_err());
    }

    #[test]
    fn new_line_rejects_out_of_range_discounts() {
        let too_much = Discount::percentage(dec!(100.5));
        assert!(LineItem::new("x", dec!(1), dec!(10), too_much, TaxCode::Standard).is_err());

        let negative = Discount::fixed(dec!(-1));
        assert!(LineItem::new("x", dec!(1), dec!(10), negative, TaxCode::Standard).is_err());

        let above_gross = Discount::fixed(dec!(20.01));
        assert!(LineItem::new("x", dec!(2), dec!(10), above_gross, TaxCode::Standard).is_err());

        let full = Discount::fixed(dec!(20));
        assert!(LineItem::new("x", dec!(2), dec!(10), full, TaxCode::Standard).is_ok());
    }

    #[test]
    fn with_vat_rate_validates_range() {
        let line = LineItem::new("x", dec!(1), dec!(10), Discount::none(), TaxCode::Standard).unwrap();
        assert!(line.clone().with_vat_rate(dec!(101)).is_err());
        assert_eq!(line.with_vat_rate(dec!(20)).unwrap().vat_rate(), Some(dec!(20)));
    }

    #[test]
    fn draft_coerces_garbage_to_zero() {
        let d = draft(json!({
            "description": "Widget",
            "quantity": "abc",
            "unitPrice": null,
            "discount": { "type": "bogus", "value": "NaN" },
            "taxCode": "unknown"
        }));

        assert_eq!(d.quantity(), Decimal::ZERO);
        assert_eq!(d.unit_price(), Decimal::ZERO);
        assert_eq!(d.discount(), Discount::none());
        assert_eq!(d.tax_code(), TaxCode::Standard);
        assert_eq!(d.vat_rate(), None);
    }

    #[test]
    fn draft_accepts_form_field_names_and_numeric_strings() {
        let d = draft(json!({
            "description": "Hosting",
            "quantity": "3",
            "unitPrice": "19.90",
            "discount": { "type": "fixed", "value": 5 },
            "taxCode": "zero",
            "vatRate": "20"
        }));

        assert_eq!(d.quantity(), dec!(3));
        assert_eq!(d.unit_price(), dec!(19.90));
        assert_eq!(d.discount(), Discount::fixed(dec!(5)));
        assert_eq!(d.tax_code(), TaxCode::Zero);
        assert_eq!(d.vat_rate(), Some(dec!(20)));
    }

    #[test]
    fn draft_ignores_unusable_rate_override() {
        let calc = crate::InvoiceCalculator::default();
        for rate in [json!("abc"), json!(true), json!("150"), json!(-1)] {
            let d = draft(json!({
                "description": "Widget",
                "quantity": 1,
                "unitPrice": 100,
                "taxCode": "standard",
                "vatRate": rate
            }));
            assert_eq!(d.vat_rate(), None);
            assert_eq!(calc.compute_line_total(&d).vat, dec!(5));
        }
    }

    #[test]
    fn missing_draft_fields_default() {
        let d = draft(json!({}));
        assert_eq!(d.quantity(), Decimal::ZERO);
        assert_eq!(d.discount(), Discount::none());
        assert_eq!(d.tax_code(), TaxCode::Standard);
    }

    #[test]
    fn try_from_draft_validates() {
        let ok = draft(json!({
            "description": "Hosting",
            "quantity": 2,
            "unit_price": "50",
            "discount": { "kind": "fixed", "value": "20" },
            "tax_code": "standard"
        }));
        let line = LineItem::try_from(ok).unwrap();
        assert_eq!(line.description(), "Hosting");
        assert_eq!(line.quantity(), dec!(2));
        assert_eq!(line.discount(), Discount::fixed(dec!(20)));

        let bad_number = draft(json!({ "description": "x", "quantity": "abc", "unitPrice": 1 }));
        match LineItem::try_from(bad_number).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("quantity must be a number")),
            other => panic!("unexpected error: {other:?}"),
        }

        let bad_code = draft(json!({ "description": "x", "quantity": 1, "unitPrice": 1, "taxCode": "reduced" }));
        assert!(LineItem::try_from(bad_code).is_err());
    }

    #[test]
    fn line_item_deserializes_through_validation() {
        let line: LineItem = serde_json::from_value(json!({
            "description": "Support",
            "quantity": 1,
            "unit_price": 100,
            "tax_code": "exempt"
        }))
        .unwrap();
        assert_eq!(line.tax_code(), TaxCode::Exempt);

        let json = serde_json::to_value(&line).unwrap();
        let back: LineItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);

        let invalid = serde_json::from_value::<LineItem>(json!({
            "description": "Support",
            "quantity": 0,
            "unit_price": 100
        }));
        assert!(invalid.is_err());
    }
}
