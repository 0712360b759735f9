//! Invoicing domain module.
//!
//! Line items, the invoice totals calculator, VAT settings, and the invoice
//! entity. Everything here is deterministic domain logic (no IO, no storage).

pub mod calculator;
pub mod config;
pub mod invoice;
pub mod line_item;
pub mod money;

pub use calculator::{InvoiceCalculator, InvoiceTotals, LineTotals, TaxCodeTotals, VatBreakdown};
pub use config::{SubtotalBasis, VatConfig};
pub use invoice::{Invoice, InvoiceDirection, InvoiceRecord, InvoiceStatus, NewInvoice};
pub use line_item::{Discount, DiscountDraft, DiscountKind, LineInput, LineItem, LineItemDraft, TaxCode};
