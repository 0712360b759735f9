//! Accounting domain module: categories, VAT returns, dashboard figures.
//!
//! VAT returns and dashboard summaries are derived from invoices through the
//! invoicing calculator; nothing here stores balances of its own.

pub mod category;
pub mod dashboard;
pub mod vat_return;

pub use category::{Category, CategoryKind, NewCategory};
pub use dashboard::DashboardSummary;
pub use vat_return::{VatPeriod, VatReturn, VatReturnRecord, VatReturnStatus, VatReturnSummary};
