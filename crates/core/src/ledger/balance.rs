//! Account balance calculations.
//!
//! Asset and expense accounts are debit-normal: `balance += debit - credit`.
//! Liability, equity and revenue accounts are credit-normal: `balance += credit - debit`.

use std::collections::HashMap;

use folio_shared::types::{AccountId, Money};
use serde::{Deserialize, Serialize};

/// Side of the ledger that increases an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense)
    Debit,
    /// Credit-normal accounts (Liability, Equity, Revenue)
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change for a line.
    #[must_use]
    pub fn balance_change(self, debit: Money, credit: Money) -> Money {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Parses a normal balance from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

/// Accumulates per-account balance changes for one posting.
///
/// Several lines against the same account collapse into one delta, so each
/// account is updated once.
#[derive(Debug, Default)]
pub struct BalanceDeltas {
    deltas: HashMap<AccountId, Money>,
}

impl BalanceDeltas {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one line's effect.
    pub fn add(&mut self, account_id: AccountId, normal: NormalBalance, debit: Money, credit: Money) {
        *self.deltas.entry(account_id).or_default() += normal.balance_change(debit, credit);
    }

    /// Net change for an account.
    #[must_use]
    pub fn get(&self, account_id: AccountId) -> Money {
        self.deltas.get(&account_id).copied().unwrap_or_default()
    }
}

/// Running balance information for a ledger line.
///
/// - sequence: monotonically increasing counter per account
/// - previous_balance: balance before this line
/// - current_balance: balance after this line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Position of the line in the account's history (starts at 1).
    pub sequence: u64,
    /// Balance before this line.
    pub previous_balance: Money,
    /// Balance after this line.
    pub current_balance: Money,
}

impl RunningBalance {
    /// Creates a new running balance for the first line on an account.
    #[must_use]
    pub fn first_entry(balance_change: Money) -> Self {
        Self {
            sequence: 1,
            previous_balance: Money::ZERO,
            current_balance: balance_change,
        }
    }

    /// Creates a new running balance based on the previous line.
    ///
    /// - current_balance[N] = previous_balance[N] + balance_change
    /// - previous_balance[N] = current_balance[N-1]
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Money) -> Self {
        Self {
            sequence: previous.sequence + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance + balance_change,
        }
    }

    /// Continues a chain that may not have started yet.
    #[must_use]
    pub fn advance(previous: Option<&Self>, balance_change: Money) -> Self {
        match previous {
            Some(previous) => Self::next_entry(previous, balance_change),
            None => Self::first_entry(balance_change),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn money(value: Decimal) -> Money {
        Money::from_decimal(value).unwrap()
    }

    // ========================================================================
    // Running Balance Consistency
    // ========================================================================

    /// Strategy for generating balance changes (can be positive or negative)
    fn balance_change_strategy() -> impl Strategy<Value = Money> {
        (-1_000_000i64..1_000_000i64).prop_map(Money::from_minor_units)
    }

    /// Strategy for generating a sequence of balance changes
    fn balance_changes_strategy(max_len: usize) -> impl Strategy<Value = Vec<Money>> {
        prop::collection::vec(balance_change_strategy(), 1..=max_len)
    }

    fn build_chain(changes: &[Money]) -> Vec<RunningBalance> {
        let mut chain: Vec<RunningBalance> = Vec::with_capacity(changes.len());
        for change in changes {
            let next = RunningBalance::advance(chain.last(), *change);
            chain.push(next);
        }
        chain
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property 1: Previous balance equals prior current balance**
        #[test]
        fn prop_previous_equals_prior_current(
            changes in balance_changes_strategy(20),
        ) {
            let chain = build_chain(&changes);
            for pair in chain.windows(2) {
                prop_assert_eq!(pair[1].previous_balance, pair[0].current_balance);
            }
        }

        /// **Property 2: Final balance equals the sum of all changes**
        #[test]
        fn prop_final_balance_equals_sum_of_changes(
            changes in balance_changes_strategy(20),
        ) {
            let chain = build_chain(&changes);
            let expected: Money = changes.iter().sum();
            prop_assert_eq!(chain.last().map(|rb| rb.current_balance), Some(expected));
        }

        /// **Property 3: Sequence numbers are contiguous from 1**
        #[test]
        fn prop_sequence_contiguous(
            changes in balance_changes_strategy(20),
        ) {
            let chain = build_chain(&changes);
            let sequences: Vec<u64> = chain.iter().map(|rb| rb.sequence).collect();
            let expected: Vec<u64> = (1..=changes.len() as u64).collect();
            prop_assert_eq!(sequences, expected);
        }

        /// **Property 4: A line and its swap cancel on either normal side**
        #[test]
        fn prop_swapped_line_cancels(
            amount in (1i64..1_000_000i64).prop_map(Money::from_minor_units),
            debit_normal in any::<bool>(),
        ) {
            let normal = if debit_normal { NormalBalance::Debit } else { NormalBalance::Credit };
            let forward = normal.balance_change(amount, Money::ZERO);
            let backward = normal.balance_change(Money::ZERO, amount);
            prop_assert!((forward + backward).is_zero());
        }
    }

    #[test]
    fn test_debit_normal_balance_change() {
        let normal = NormalBalance::Debit;
        assert_eq!(normal.balance_change(money(dec!(100)), Money::ZERO), money(dec!(100)));
        assert_eq!(normal.balance_change(Money::ZERO, money(dec!(50))), money(dec!(-50)));
        assert_eq!(normal.balance_change(money(dec!(100)), money(dec!(30))), money(dec!(70)));
    }

    #[test]
    fn test_credit_normal_balance_change() {
        let normal = NormalBalance::Credit;
        assert_eq!(normal.balance_change(Money::ZERO, money(dec!(100))), money(dec!(100)));
        assert_eq!(normal.balance_change(money(dec!(50)), Money::ZERO), money(dec!(-50)));
        assert_eq!(normal.balance_change(money(dec!(30)), money(dec!(100))), money(dec!(70)));
    }

    #[test]
    fn test_deltas_collapse_per_account() {
        let cash = AccountId::new();
        let revenue = AccountId::new();
        let mut deltas = BalanceDeltas::new();
        deltas.add(cash, NormalBalance::Debit, money(dec!(60)), Money::ZERO);
        deltas.add(cash, NormalBalance::Debit, money(dec!(40)), Money::ZERO);
        deltas.add(revenue, NormalBalance::Credit, Money::ZERO, money(dec!(100)));

        assert_eq!(deltas.get(cash), money(dec!(100)));
        assert_eq!(deltas.get(revenue), money(dec!(100)));
        assert_eq!(deltas.get(AccountId::new()), Money::ZERO);
    }

    #[test]
    fn test_running_balance_chain() {
        let rb1 = RunningBalance::first_entry(money(dec!(100)));
        assert_eq!(rb1.sequence, 1);
        assert_eq!(rb1.previous_balance, Money::ZERO);

        let rb2 = RunningBalance::next_entry(&rb1, money(dec!(50)));
        assert_eq!(rb2.sequence, 2);
        assert_eq!(rb2.previous_balance, money(dec!(100)));
        assert_eq!(rb2.current_balance, money(dec!(150)));

        let rb3 = RunningBalance::next_entry(&rb2, money(dec!(-30)));
        assert_eq!(rb3.previous_balance, money(dec!(150)));
        assert_eq!(rb3.current_balance, money(dec!(120)));
    }
}
