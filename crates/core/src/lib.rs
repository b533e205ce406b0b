//! Core business logic for Folio.
//!
//! This crate contains the double-entry ledger with ZERO web or database dependencies.
//! Domain types, validation rules and the transactional engine live here; storage is
//! reached only through the [`store::LedgerStore`] seam.
//!
//! # Modules
//!
//! - `ledger` - Journal entries, balance rules and reversals
//! - `chart` - Chart of accounts and its hierarchy
//! - `fiscal` - Fiscal year and period management
//! - `reconciliation` - Invoices, payments and allocations
//! - `reports` - Balances, trial balance and account ledgers
//! - `engine` - Transactional operations over a store
//! - `store` - Unit-of-work seam and the in-memory store
//! - `events` - Domain events published after commit

pub mod chart;
pub mod engine;
pub mod events;
pub mod fiscal;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod scope;
pub mod store;

pub use engine::{EngineSettings, LedgerEngine};
pub use ledger::LedgerError;
pub use scope::Scope;
pub use store::{LedgerStore, MemoryStore, UnitOfWork};
