//! Business rule validation for journal lines.

use folio_shared::types::Money;

use super::error::LedgerError;
use super::types::{EntryTotals, JournalLine, LineInput};

/// Minimum number of lines in a journal entry.
pub const MIN_LINES: usize = 2;

/// Read access to a line's debit and credit amounts.
pub trait LineAmounts {
    /// Debit amount.
    fn debit(&self) -> Money;
    /// Credit amount.
    fn credit(&self) -> Money;
}

impl LineAmounts for LineInput {
    fn debit(&self) -> Money {
        self.debit
    }

    fn credit(&self) -> Money {
        self.credit
    }
}

impl LineAmounts for JournalLine {
    fn debit(&self) -> Money {
        self.debit
    }

    fn credit(&self) -> Money {
        self.credit
    }
}

/// Returns `sum(debit) - sum(credit)`. The lines balance iff the result is exactly zero.
#[must_use]
pub fn validate_balance<L: LineAmounts>(lines: &[L]) -> Money {
    totals(lines).difference()
}

/// Debit and credit totals of the lines.
#[must_use]
pub fn totals<L: LineAmounts>(lines: &[L]) -> EntryTotals {
    EntryTotals::new(
        lines.iter().map(LineAmounts::debit).sum(),
        lines.iter().map(LineAmounts::credit).sum(),
    )
}

/// Validates the shape of every line, independent of balance.
///
/// Each line needs exactly one non-zero side, and neither side may be negative.
///
/// # Errors
///
/// `InsufficientLines` or `InvalidLine`.
pub fn validate_lines<L: LineAmounts>(lines: &[L]) -> Result<(), LedgerError> {
    if lines.len() < MIN_LINES {
        return Err(LedgerError::InsufficientLines {
            required: MIN_LINES,
            actual: lines.len(),
        });
    }

    for (index, line) in lines.iter().enumerate() {
        let line_number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let (debit, credit) = (line.debit(), line.credit());

        let reason = if debit.is_negative() || credit.is_negative() {
            Some("amounts cannot be negative")
        } else if debit.is_zero() && credit.is_zero() {
            Some("either debit or credit must be non-zero")
        } else if !debit.is_zero() && !credit.is_zero() {
            Some("a line cannot carry both a debit and a credit")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(LedgerError::InvalidLine {
                line_number,
                reason: reason.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates line shape and exact balance.
///
/// # Errors
///
/// Any error of [`validate_lines`], or `UnbalancedEntry`.
pub fn ensure_postable_lines<L: LineAmounts>(lines: &[L]) -> Result<EntryTotals, LedgerError> {
    validate_lines(lines)?;
    let totals = totals(lines);
    if !totals.is_balanced {
        return Err(LedgerError::UnbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_shared::types::AccountId;
    use rust_decimal_macros::dec;

    fn money(value: rust_decimal::Decimal) -> Money {
        Money::from_decimal(value).unwrap()
    }

    #[test]
    fn test_balanced_lines() {
        let lines = vec![
            LineInput::debit(AccountId::new(), money(dec!(100.00))),
            LineInput::credit(AccountId::new(), money(dec!(100.00))),
        ];
        assert!(validate_balance(&lines).is_zero());
        let totals = ensure_postable_lines(&lines).unwrap();
        assert_eq!(totals.debit, money(dec!(100)));
    }

    #[test]
    fn test_unbalanced_lines() {
        let lines = vec![
            LineInput::debit(AccountId::new(), money(dec!(100.00))),
            LineInput::credit(AccountId::new(), money(dec!(99.99))),
        ];
        assert_eq!(validate_balance(&lines), money(dec!(0.01)));
        assert!(matches!(
            ensure_postable_lines(&lines),
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    #[test]
    fn test_single_line_rejected() {
        let lines = vec![LineInput::debit(AccountId::new(), money(dec!(1)))];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::InsufficientLines {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_zero_line_rejected() {
        let lines = vec![
            LineInput::debit(AccountId::new(), Money::ZERO),
            LineInput::credit(AccountId::new(), money(dec!(1))),
        ];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::InvalidLine { line_number: 1, .. })
        ));
    }

    #[test]
    fn test_two_sided_line_rejected() {
        let mut both = LineInput::debit(AccountId::new(), money(dec!(5)));
        both.credit = money(dec!(5));
        let lines = vec![LineInput::debit(AccountId::new(), money(dec!(5))), both];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::InvalidLine { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_negative_line_rejected() {
        let lines = vec![
            LineInput::debit(AccountId::new(), money(dec!(-5))),
            LineInput::credit(AccountId::new(), money(dec!(-5))),
        ];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::InvalidLine { line_number: 1, .. })
        ));
    }
}
