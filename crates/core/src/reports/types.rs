//! Report data types.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{AccountId, Money};
use serde::{Deserialize, Serialize};

use crate::chart::AccountType;
use crate::ledger::{NormalBalance, RunningBalance};

/// Own and rolled-up balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account ID.
    pub account_id: AccountId,
    /// Cut-off date; `None` means the stored running balance.
    pub as_of: Option<NaiveDate>,
    /// Balance of lines posted directly against the account.
    pub own: Money,
    /// Own balance plus every descendant's.
    pub total: Money,
}

/// One account row of a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Total debit amount.
    pub total_debit: Money,
    /// Total credit amount.
    pub total_credit: Money,
    /// Net balance on the normal side.
    pub balance: Money,
}

/// Trial balance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// Cut-off date; `None` covers every posted line.
    pub as_of: Option<NaiveDate>,
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debit: Money,
    /// Total credit.
    pub total_credit: Money,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

/// One line in an account ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Entry number.
    pub entry_number: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// When the entry was posted.
    pub posted_at: DateTime<Utc>,
    /// Line number within the entry.
    pub line_number: u32,
    /// Line memo.
    pub memo: Option<String>,
    /// Debit amount.
    pub debit: Money,
    /// Credit amount.
    pub credit: Money,
    /// Balance before and after this line.
    pub running: RunningBalance,
}

/// Posted lines of one account with a running balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLedger {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Rows in posting order.
    pub rows: Vec<LedgerRow>,
    /// Balance after the last row.
    pub closing_balance: Money,
}
