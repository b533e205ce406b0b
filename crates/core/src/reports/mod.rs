//! Ledger query surface.
//!
//! This module provides pure logic for read-only ledger queries:
//! - Account balances (own and rolled up, optionally as of a date)
//! - Trial Balance
//! - Account Ledger

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::ReportService;
pub use types::*;
