//! Client invoicing: amount derivation, numbering and invoice records.

pub mod amount;
pub mod invoice;
pub mod number;

pub use amount::{billable_monthly, calculate_invoice_amount, resolve_invoice_amount, MARGIN_RATE};
pub use invoice::{Invoice, InvoiceStatus, NewInvoice, DEFAULT_DUE_DAYS};
pub use number::{
    InvoiceNumber, InvoiceNumberGenerator, RandomInvoiceNumbers, SequentialInvoiceNumbers,
    MAX_SEQUENCE,
};
