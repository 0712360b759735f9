//! Parties domain module (companies, customers and suppliers).
//!
//! A `Company` is the business whose books are kept; it owns the default VAT
//! rate. A `Customer` is any counterparty on an invoice.

pub mod company;
pub mod customer;

pub use company::{Company, NewCompany};
pub use customer::{
    ContactInfo, Customer, CustomerKind, CustomerRecord, CustomerStatus, NewCustomer, UpdateDetails,
};
