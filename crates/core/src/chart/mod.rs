//! Chart of accounts.

pub mod account;
pub mod hierarchy;

pub use account::{Account, AccountType, NewAccount};
pub use hierarchy::AccountTree;
