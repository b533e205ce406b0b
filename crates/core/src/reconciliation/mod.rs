//! Invoice and payment reconciliation.
//!
//! Payments settle invoices through allocations. An invoice's `paid_amount` is
//! the sum of its active allocations and `balance_due` is always
//! `total_amount - paid_amount`.

pub mod invoice;
pub mod payment;

#[cfg(test)]
mod reconciliation_props;

pub use invoice::{Invoice, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine};
pub use payment::{
    NewPayment, Payment, PaymentAllocation, PaymentMethod, PaymentStatus, unallocated_amount,
};
