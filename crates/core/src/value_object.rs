//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A discount of
/// 10% is equal to any other discount of 10%; an invoice is not equal to
/// another invoice just because their lines match (that is an `Entity`).
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Discount {
///     kind: DiscountKind,
///     value: Decimal,
/// }
///
/// impl ValueObject for Discount {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
