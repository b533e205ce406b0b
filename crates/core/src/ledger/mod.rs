//! Double-entry bookkeeping logic.
//!
//! This module implements the journal side of the ledger:
//! - Journal entries and lines, with their status machine
//! - Normal-balance rules and running balances
//! - Line shape and balance validation
//! - Reversing entries
//! - Error types for every ledger operation

pub mod balance;
pub mod error;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod validation_props;

pub use balance::{BalanceDeltas, NormalBalance, RunningBalance};
pub use error::{ErrorKind, LedgerError};
pub use reversal::{REVERSAL_SOURCE, ReversalService};
pub use types::{
    EntryStatus, EntryTotals, EntryWithLines, JournalEntry, JournalLine, LineInput,
    NewJournalEntry, PostedLine,
};
pub use validation::{ensure_postable_lines, validate_balance, validate_lines};
