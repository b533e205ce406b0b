//! Property-based tests for journal line validation rules.

use folio_shared::types::{AccountId, Money};
use proptest::prelude::*;

use super::error::LedgerError;
use super::types::LineInput;
use super::validation::{ensure_postable_lines, validate_balance, validate_lines};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Money> {
    // 0.0001 to 1,000,000.0000
    (1i64..10_000_000_000i64).prop_map(Money::from_minor_units)
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64).prop_map(|units| Money::from_minor_units(-units))
}

/// Strategy to generate a side: true for debit.
fn side_strategy() -> impl Strategy<Value = bool> {
    any::<bool>()
}

fn make_line(is_debit: bool, amount: Money) -> LineInput {
    if is_debit {
        LineInput::debit(AccountId::new(), amount)
    } else {
        LineInput::credit(AccountId::new(), amount)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Zero amount lines are rejected**
    #[test]
    fn prop_zero_amount_rejected(
        is_debit in side_strategy(),
        other_amount in positive_amount(),
    ) {
        let lines = vec![
            make_line(is_debit, Money::ZERO),
            make_line(!is_debit, other_amount),
        ];

        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::InvalidLine { line_number: 1, .. })),
            "Zero amount should be rejected, got: {:?}",
            result
        );
    }

    /// **Property 2: Negative amount lines are rejected**
    #[test]
    fn prop_negative_amount_rejected(
        is_debit in side_strategy(),
        neg_amount in negative_amount(),
        other_amount in positive_amount(),
    ) {
        let lines = vec![
            make_line(!is_debit, other_amount),
            make_line(is_debit, neg_amount),
        ];

        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::InvalidLine { line_number: 2, .. })),
            "Negative amount should be rejected, got: {:?}",
            result
        );
    }

    /// **Property 3: Single line entries are rejected**
    #[test]
    fn prop_single_line_rejected(
        is_debit in side_strategy(),
        amount in positive_amount(),
    ) {
        let lines = vec![make_line(is_debit, amount)];

        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::InsufficientLines { actual: 1, .. })),
            "Single line should be rejected, got: {:?}",
            result
        );
    }

    /// **Property 4: Balanced multi-line entries are accepted**
    #[test]
    fn prop_multi_line_balanced_accepted(
        amounts in prop::collection::vec(positive_amount(), 1..8),
    ) {
        let total: Money = amounts.iter().sum();
        let mut lines: Vec<LineInput> = amounts.iter().map(|a| make_line(true, *a)).collect();
        lines.push(make_line(false, total));

        prop_assert!(validate_balance(&lines).is_zero());
        let totals = ensure_postable_lines(&lines);
        prop_assert!(totals.is_ok(), "Balanced entry should be accepted, got: {:?}", totals);
    }

    /// **Property 5: Any non-zero difference is reported exactly**
    #[test]
    fn prop_difference_is_exact(
        debit in positive_amount(),
        credit in positive_amount(),
    ) {
        prop_assume!(debit != credit);
        let lines = vec![make_line(true, debit), make_line(false, credit)];

        prop_assert_eq!(validate_balance(&lines), debit - credit);
        let result = ensure_postable_lines(&lines);
        let is_unbalanced = matches!(
            result,
            Err(LedgerError::UnbalancedEntry { debit: d, credit: c }) if d == debit && c == credit
        );
        prop_assert!(is_unbalanced);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Specific example: the smallest representable imbalance is still rejected.
    #[test]
    fn test_one_minor_unit_imbalance() {
        let lines = vec![
            make_line(true, Money::from_minor_units(1_000_001)),
            make_line(false, Money::from_minor_units(1_000_000)),
        ];
        assert!(matches!(
            ensure_postable_lines(&lines),
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    /// Specific example: empty input.
    #[test]
    fn test_empty_lines() {
        let lines: Vec<LineInput> = vec![];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::InsufficientLines { actual: 0, .. })
        ));
    }
}
