//! Common types used across the ledger.

pub mod id;
pub mod money;

#[cfg(test)]
mod id_tests;
#[cfg(test)]
mod money_tests;

pub use id::*;
pub use money::{Currency, MONEY_SCALE, Money, MoneyError};
