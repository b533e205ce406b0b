//! Tests for ledger queries.

use chrono::{NaiveDate, TimeZone, Utc};
use folio_shared::types::{
    AccountId, Currency, JournalEntryId, JournalLineId, Money, OrganizationId, TenantId,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use super::service::ReportService;
use crate::chart::{Account, AccountTree, AccountType, NewAccount};
use crate::ledger::{JournalLine, PostedLine};
use crate::scope::Scope;

fn scope() -> Scope {
    Scope::new(TenantId::new(), OrganizationId::new())
}

fn account(scope: &Scope, code: &str, account_type: AccountType, parent: Option<AccountId>) -> Account {
    let mut input = NewAccount::new(code, format!("Account {code}"), account_type, Currency::Usd);
    input.parent_id = parent;
    Account::create(scope, input, Utc::now())
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

fn posted(
    entry_number: &str,
    day: u32,
    account_id: AccountId,
    line_number: u32,
    debit: Money,
    credit: Money,
) -> PostedLine {
    PostedLine {
        entry_number: entry_number.to_string(),
        entry_date: date(day),
        posted_at: Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap(),
        line: JournalLine {
            id: JournalLineId::new(),
            journal_entry_id: JournalEntryId::new(),
            account_id,
            line_number,
            debit,
            credit,
            memo: None,
        },
    }
}

/// A balanced two-line entry: debit `debit_account`, credit `credit_account`.
fn entry(number: &str, day: u32, debit_account: AccountId, credit_account: AccountId, amount: Money) -> Vec<PostedLine> {
    vec![
        posted(number, day, debit_account, 1, amount, Money::ZERO),
        posted(number, day, credit_account, 2, Money::ZERO, amount),
    ]
}

fn money(value: rust_decimal::Decimal) -> Money {
    Money::from_decimal(value).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Trial balance of balanced entries is balanced**
    #[test]
    fn prop_trial_balance_balanced(amounts in prop::collection::vec((1i64..10_000_000i64, 0usize..4, 0usize..4), 1..30)) {
        let scope = scope();
        let accounts = vec![
            account(&scope, "1000", AccountType::Asset, None),
            account(&scope, "2000", AccountType::Liability, None),
            account(&scope, "4000", AccountType::Revenue, None),
            account(&scope, "5000", AccountType::Expense, None),
        ];

        let mut lines = Vec::new();
        for (i, (units, from, to)) in amounts.into_iter().enumerate() {
            let number = format!("JE-{:06}", i + 1);
            lines.extend(entry(
                &number,
                1,
                accounts[from].id,
                accounts[to].id,
                Money::from_minor_units(units),
            ));
        }

        let report = ReportService::generate_trial_balance(&accounts, &lines, None);
        prop_assert!(report.totals.is_balanced);
        prop_assert_eq!(report.totals.total_debit, report.totals.total_credit);
        prop_assert_eq!(report.rows.len(), 4);
    }

    /// **Property 2: Closing ledger balance equals the balance rebuilt from lines**
    #[test]
    fn prop_ledger_closing_matches_balance(amounts in prop::collection::vec((1i64..1_000_000i64, any::<bool>()), 1..20)) {
        let scope = scope();
        let cash = account(&scope, "1000", AccountType::Asset, None);
        let other = account(&scope, "3000", AccountType::Equity, None);

        let mut lines = Vec::new();
        for (i, (units, inflow)) in amounts.into_iter().enumerate() {
            let number = format!("JE-{:06}", i + 1);
            let amount = Money::from_minor_units(units);
            if inflow {
                lines.extend(entry(&number, 10, cash.id, other.id, amount));
            } else {
                lines.extend(entry(&number, 10, other.id, cash.id, amount));
            }
        }

        let ledger = ReportService::account_ledger(&cash, &lines);
        prop_assert_eq!(ledger.closing_balance, ReportService::balance_from_lines(&cash, &lines, date(31)));
        for pair in ledger.rows.windows(2) {
            prop_assert_eq!(pair[1].running.previous_balance, pair[0].running.current_balance);
        }
    }
}

mod unit_tests {
    use super::*;

    #[test]
    fn test_trial_balance_rows_and_totals() {
        let scope = scope();
        let cash = account(&scope, "1000", AccountType::Asset, None);
        let sales = account(&scope, "4000", AccountType::Revenue, None);
        let mut dormant = account(&scope, "9000", AccountType::Expense, None);
        dormant.is_active = false;

        let lines = entry("JE-000001", 5, cash.id, sales.id, money(dec!(100.00)));
        let report = ReportService::generate_trial_balance(
            &[sales.clone(), cash.clone(), dormant],
            &lines,
            None,
        );

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].code, "1000");
        assert_eq!(report.rows[0].total_debit, money(dec!(100.00)));
        assert_eq!(report.rows[0].balance, money(dec!(100.00)));
        assert_eq!(report.rows[1].total_credit, money(dec!(100.00)));
        assert_eq!(report.rows[1].balance, money(dec!(100.00)));
        assert!(report.totals.is_balanced);
    }

    #[test]
    fn test_trial_balance_as_of_excludes_later_entries() {
        let scope = scope();
        let cash = account(&scope, "1000", AccountType::Asset, None);
        let sales = account(&scope, "4000", AccountType::Revenue, None);

        let mut lines = entry("JE-000001", 5, cash.id, sales.id, money(dec!(100)));
        lines.extend(entry("JE-000002", 20, cash.id, sales.id, money(dec!(50))));

        let report = ReportService::generate_trial_balance(
            &[cash.clone(), sales],
            &lines,
            Some(date(10)),
        );
        assert_eq!(report.rows[0].total_debit, money(dec!(100)));
        assert_eq!(report.totals.total_debit, money(dec!(100)));
    }

    #[test]
    fn test_trial_balance_keeps_deactivated_account_with_history() {
        let scope = scope();
        let cash = account(&scope, "1000", AccountType::Asset, None);
        let mut bank = account(&scope, "1100", AccountType::Asset, None);
        let sales = account(&scope, "4000", AccountType::Revenue, None);
        bank.is_active = false;

        let mut lines = entry("JE-000001", 5, bank.id, sales.id, money(dec!(100)));
        lines.extend(entry("JE-000002", 20, cash.id, bank.id, money(dec!(100))));

        let report = ReportService::generate_trial_balance(
            &[cash.clone(), bank.clone(), sales],
            &lines,
            Some(date(10)),
        );
        let codes: Vec<&str> = report.rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["1000", "1100", "4000"]);
        assert_eq!(report.rows[1].total_debit, money(dec!(100)));
        assert_eq!(report.totals.total_debit, money(dec!(100)));
        assert!(report.totals.is_balanced);
    }

    #[test]
    fn test_compute_balance_rolls_up_subtree() {
        let scope = scope();
        let mut assets = account(&scope, "1000", AccountType::Asset, None);
        let mut cash = account(&scope, "1100", AccountType::Asset, Some(assets.id));
        let mut bank = account(&scope, "1200", AccountType::Asset, Some(assets.id));
        assets.balance = money(dec!(1));
        cash.balance = money(dec!(100));
        bank.balance = money(dec!(250.5));
        let (assets_id, cash_id) = (assets.id, cash.id);
        let tree = AccountTree::new(vec![assets, cash, bank]);

        let leaf = ReportService::compute_balance(&tree, cash_id, None, &[]).unwrap();
        assert_eq!(leaf.own, money(dec!(100)));
        assert_eq!(leaf.total, money(dec!(100)));

        let parent = ReportService::compute_balance(&tree, assets_id, None, &[]).unwrap();
        assert_eq!(parent.own, money(dec!(1)));
        assert_eq!(parent.total, money(dec!(351.5)));

        assert!(ReportService::compute_balance(&tree, AccountId::new(), None, &[]).is_none());
    }

    #[test]
    fn test_compute_balance_as_of_uses_lines() {
        let scope = scope();
        let assets = account(&scope, "1000", AccountType::Asset, None);
        let cash = account(&scope, "1100", AccountType::Asset, Some(assets.id));
        let equity = account(&scope, "3000", AccountType::Equity, None);

        let mut lines = entry("JE-000001", 2, cash.id, equity.id, money(dec!(500)));
        lines.extend(entry("JE-000002", 15, equity.id, cash.id, money(dec!(120))));

        let (assets_id, cash_id, equity_id) = (assets.id, cash.id, equity.id);
        let tree = AccountTree::new(vec![assets, cash, equity]);

        let early = ReportService::compute_balance(&tree, assets_id, Some(date(10)), &lines).unwrap();
        assert!(early.own.is_zero());
        assert_eq!(early.total, money(dec!(500)));

        let late = ReportService::compute_balance(&tree, cash_id, Some(date(31)), &lines).unwrap();
        assert_eq!(late.total, money(dec!(380)));

        let equity = ReportService::compute_balance(&tree, equity_id, Some(date(31)), &lines).unwrap();
        assert_eq!(equity.own, money(dec!(380)));
    }

    #[test]
    fn test_account_ledger_running_balance() {
        let scope = scope();
        let cash = account(&scope, "1000", AccountType::Asset, None);
        let sales = account(&scope, "4000", AccountType::Revenue, None);

        let mut lines = entry("JE-000001", 3, cash.id, sales.id, money(dec!(100)));
        lines.extend(entry("JE-000002", 4, sales.id, cash.id, money(dec!(30))));

        let ledger = ReportService::account_ledger(&cash, &lines);
        assert_eq!(ledger.rows.len(), 2);
        assert_eq!(ledger.rows[0].running.sequence, 1);
        assert_eq!(ledger.rows[0].running.current_balance, money(dec!(100)));
        assert_eq!(ledger.rows[1].running.previous_balance, money(dec!(100)));
        assert_eq!(ledger.rows[1].entry_number, "JE-000002");
        assert_eq!(ledger.closing_balance, money(dec!(70)));

        let revenue = ReportService::account_ledger(&sales, &lines);
        assert_eq!(revenue.closing_balance, money(dec!(70)));

        let empty = ReportService::account_ledger(&account(&scope, "5000", AccountType::Expense, None), &lines);
        assert!(empty.rows.is_empty());
        assert!(empty.closing_balance.is_zero());
    }
}
