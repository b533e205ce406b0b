//! Property-based tests for reversing entries.
//!
//! An entry and its reversal must net to zero on every account they touch.

use folio_shared::types::{AccountId, JournalEntryId, JournalLineId, Money};
use proptest::prelude::*;

use super::balance::{BalanceDeltas, NormalBalance};
use super::reversal::ReversalService;
use super::types::JournalLine;
use super::validation::{ensure_postable_lines, validate_balance};

/// Strategy for generating positive amounts.
fn arb_amount() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(Money::from_minor_units)
}

/// Strategy for generating a balanced entry: N debits against one credit.
fn arb_balanced_lines() -> impl Strategy<Value = Vec<JournalLine>> {
    prop::collection::vec(arb_amount(), 1..5).prop_map(|amounts| {
        let entry_id = JournalEntryId::new();
        let total: Money = amounts.iter().sum();
        let mut lines: Vec<JournalLine> = amounts
            .into_iter()
            .zip(1u32..)
            .map(|(amount, line_number)| JournalLine {
                id: JournalLineId::new(),
                journal_entry_id: entry_id,
                account_id: AccountId::new(),
                line_number,
                debit: amount,
                credit: Money::ZERO,
                memo: None,
            })
            .collect();
        let line_number = u32::try_from(lines.len()).unwrap_or(u32::MAX) + 1;
        lines.push(JournalLine {
            id: JournalLineId::new(),
            journal_entry_id: entry_id,
            account_id: AccountId::new(),
            line_number,
            debit: Money::ZERO,
            credit: total,
            memo: Some("Offset".to_string()),
        });
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Reversal of a balanced entry is balanced**
    #[test]
    fn prop_reversal_is_balanced(lines in arb_balanced_lines()) {
        let reversing = ReversalService::reversing_lines(&lines);
        prop_assert!(validate_balance(&reversing).is_zero());
        prop_assert!(ensure_postable_lines(&reversing).is_ok());
    }

    /// **Property 2: Entry plus reversal nets to zero on every account**
    #[test]
    fn prop_entry_and_reversal_net_to_zero(
        lines in arb_balanced_lines(),
        debit_normal in any::<bool>(),
    ) {
        let normal = if debit_normal { NormalBalance::Debit } else { NormalBalance::Credit };
        let reversing = ReversalService::reversing_lines(&lines);

        let mut deltas = BalanceDeltas::new();
        for line in &lines {
            deltas.add(line.account_id, normal, line.debit, line.credit);
        }
        for line in &reversing {
            deltas.add(line.account_id, normal, line.debit, line.credit);
        }

        for line in &lines {
            prop_assert!(deltas.get(line.account_id).is_zero());
        }
    }

    /// **Property 3: Reversing twice restores the original sides**
    #[test]
    fn prop_double_reversal_restores_sides(lines in arb_balanced_lines()) {
        let once = ReversalService::reversing_lines(&lines);
        let entry_id = JournalEntryId::new();
        let materialized: Vec<JournalLine> = once
            .into_iter()
            .zip(1u32..)
            .map(|(input, n)| input.into_line(entry_id, n))
            .collect();
        let twice = ReversalService::reversing_lines(&materialized);

        for (original, restored) in lines.iter().zip(&twice) {
            prop_assert_eq!(original.debit, restored.debit);
            prop_assert_eq!(original.credit, restored.credit);
            prop_assert_eq!(original.account_id, restored.account_id);
        }
    }
}
