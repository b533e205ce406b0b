//! Balance and trial-balance computation.
//!
//! Everything here is pure: callers load accounts and posted lines inside a
//! unit of work and hand them over.

use std::collections::HashMap;

use chrono::NaiveDate;
use folio_shared::types::{AccountId, Money};

use super::types::{
    AccountBalance, AccountLedger, LedgerRow, TrialBalanceReport, TrialBalanceRow,
    TrialBalanceTotals,
};
use crate::chart::{Account, AccountTree};
use crate::ledger::{PostedLine, RunningBalance};

/// Service for read-only ledger queries.
pub struct ReportService;

impl ReportService {
    /// Balance of `account` from posted lines dated on or before `as_of`.
    #[must_use]
    pub fn balance_from_lines(account: &Account, lines: &[PostedLine], as_of: NaiveDate) -> Money {
        lines
            .iter()
            .filter(|l| l.line.account_id == account.id && l.entry_date <= as_of)
            .map(|l| account.normal_balance.balance_change(l.line.debit, l.line.credit))
            .sum()
    }

    /// Own and rolled-up balance of an account.
    ///
    /// Without `as_of` the stored balances are used; with it, balances are
    /// rebuilt from `lines`. Returns `None` if the account is not in the tree.
    #[must_use]
    pub fn compute_balance(
        tree: &AccountTree,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
        lines: &[PostedLine],
    ) -> Option<AccountBalance> {
        let account = tree.get(account_id)?;
        let own_of = |a: &Account| match as_of {
            Some(date) => Self::balance_from_lines(a, lines, date),
            None => a.balance,
        };

        Some(AccountBalance {
            account_id,
            as_of,
            own: own_of(account),
            total: tree.rollup(account_id, own_of),
        })
    }

    /// Generates a trial balance from posted lines.
    ///
    /// Every non-deleted account with lines in range gets a row, whether or not
    /// it is still active; inactive accounts without activity are left out. The
    /// trial balance verifies that total debits equal total credits.
    #[must_use]
    pub fn generate_trial_balance(
        accounts: &[Account],
        lines: &[PostedLine],
        as_of: Option<NaiveDate>,
    ) -> TrialBalanceReport {
        let mut sums: HashMap<AccountId, (Money, Money)> = HashMap::new();
        for posted in lines {
            if as_of.is_some_and(|date| posted.entry_date > date) {
                continue;
            }
            let entry = sums.entry(posted.line.account_id).or_default();
            entry.0 += posted.line.debit;
            entry.1 += posted.line.credit;
        }

        let mut rows: Vec<TrialBalanceRow> = accounts
            .iter()
            .filter(|a| a.deleted_at.is_none() && (a.is_active || sums.contains_key(&a.id)))
            .map(|a| {
                let (total_debit, total_credit) = sums.get(&a.id).copied().unwrap_or_default();
                TrialBalanceRow {
                    account_id: a.id,
                    code: a.code.clone(),
                    name: a.name.clone(),
                    account_type: a.account_type,
                    normal_balance: a.normal_balance,
                    total_debit,
                    total_credit,
                    balance: a.normal_balance.balance_change(total_debit, total_credit),
                }
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debit: Money = rows.iter().map(|r| r.total_debit).sum();
        let total_credit: Money = rows.iter().map(|r| r.total_credit).sum();

        TrialBalanceReport {
            as_of,
            rows,
            totals: TrialBalanceTotals {
                total_debit,
                total_credit,
                is_balanced: total_debit == total_credit,
            },
        }
    }

    /// Lines of one account in the order given, with a running balance.
    ///
    /// `lines` must already be in posting order.
    #[must_use]
    pub fn account_ledger(account: &Account, lines: &[PostedLine]) -> AccountLedger {
        let mut rows: Vec<LedgerRow> = Vec::new();
        for posted in lines.iter().filter(|l| l.line.account_id == account.id) {
            let change = account
                .normal_balance
                .balance_change(posted.line.debit, posted.line.credit);
            let running = RunningBalance::advance(rows.last().map(|r| &r.running), change);
            rows.push(LedgerRow {
                entry_number: posted.entry_number.clone(),
                entry_date: posted.entry_date,
                posted_at: posted.posted_at,
                line_number: posted.line.line_number,
                memo: posted.line.memo.clone(),
                debit: posted.line.debit,
                credit: posted.line.credit,
                running,
            });
        }

        AccountLedger {
            account_id: account.id,
            code: account.code.clone(),
            normal_balance: account.normal_balance,
            closing_balance: rows.last().map_or(Money::ZERO, |r| r.running.current_balance),
            rows,
        }
    }
}
