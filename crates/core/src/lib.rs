//! `vatdesk-core` - shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no storage): the
//! error model, strongly-typed identifiers, and the `Entity` / `ValueObject`
//! marker traits the domain crates build on.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, CompanyId, CustomerId, InvoiceId, VatReturnId};
pub use value_object::ValueObject;
