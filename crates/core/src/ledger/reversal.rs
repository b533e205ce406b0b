//! Reversing entries for posted journal entries.
//!
//! A reversal never edits history: it is a new entry whose lines swap every
//! debit and credit of the original, so the pair nets to zero on every account.

use super::types::{JournalEntry, JournalLine, LineInput};

/// Source type recorded on reversing entries.
pub const REVERSAL_SOURCE: &str = "reversal";

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Create reversing lines by swapping debits and credits.
    ///
    /// For each original line:
    /// - Debits become credits
    /// - Credits become debits
    /// - Account and order are preserved
    /// - Memo is prefixed with "Reversal: "
    #[must_use]
    pub fn reversing_lines(original: &[JournalLine]) -> Vec<LineInput> {
        original
            .iter()
            .map(|line| LineInput {
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                memo: Some(format!(
                    "Reversal: {}",
                    line.memo.clone().unwrap_or_default()
                )),
            })
            .collect()
    }

    /// Description for the reversing entry.
    #[must_use]
    pub fn description(original: &JournalEntry) -> String {
        format!(
            "Reversal of {}: {}",
            original.entry_number, original.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_shared::types::{AccountId, JournalEntryId, JournalLineId, Money};

    fn line(line_number: u32, debit: i64, credit: i64, memo: Option<&str>) -> JournalLine {
        JournalLine {
            id: JournalLineId::new(),
            journal_entry_id: JournalEntryId::new(),
            account_id: AccountId::new(),
            line_number,
            debit: Money::from_minor_units(debit),
            credit: Money::from_minor_units(credit),
            memo: memo.map(str::to_string),
        }
    }

    #[test]
    fn test_reversing_lines_swap_sides() {
        let original = vec![
            line(1, 1_000_000, 0, Some("Office supplies")),
            line(2, 0, 1_000_000, Some("Cash payment")),
        ];

        let reversing = ReversalService::reversing_lines(&original);

        assert_eq!(reversing.len(), 2);
        assert_eq!(reversing[0].credit, original[0].debit);
        assert!(reversing[0].debit.is_zero());
        assert_eq!(reversing[1].debit, original[1].credit);
        assert_eq!(reversing[0].account_id, original[0].account_id);
        assert_eq!(
            reversing[0].memo.as_deref(),
            Some("Reversal: Office supplies")
        );
    }

    #[test]
    fn test_reversing_lines_without_memo() {
        let original = vec![line(1, 500, 0, None), line(2, 0, 500, None)];
        let reversing = ReversalService::reversing_lines(&original);
        assert_eq!(reversing[0].memo.as_deref(), Some("Reversal: "));
    }

    #[test]
    fn test_multi_line_reversal() {
        let original = vec![
            line(1, 5_000, 0, Some("Entry 1")),
            line(2, 3_000, 0, Some("Entry 2")),
            line(3, 0, 8_000, Some("Entry 3")),
        ];

        let reversing = ReversalService::reversing_lines(&original);
        assert_eq!(reversing.len(), 3);
        assert!(reversing[0].debit.is_zero() && !reversing[0].credit.is_zero());
        assert!(reversing[1].debit.is_zero() && !reversing[1].credit.is_zero());
        assert!(!reversing[2].debit.is_zero() && reversing[2].credit.is_zero());
    }
}
