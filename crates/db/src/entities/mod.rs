//! `SeaORM` entity definitions for the ledger tables.

pub mod accounts;
pub mod fiscal_periods;
pub mod fiscal_years;
pub mod invoice_lines;
pub mod invoices;
pub mod journal_entries;
pub mod journal_lines;
pub mod payment_allocations;
pub mod payments;
