//! Journal entry domain types.
//!
//! This module defines the journal entry aggregate (header plus ordered lines),
//! its status machine, and the inputs used to create drafts.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, Currency, FiscalPeriodId, JournalEntryId, JournalLineId, Money, OrganizationId,
    TenantId, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use crate::scope::{Scope, impl_scoped};

/// Journal entry status.
///
/// `Draft → Posted → Reversed`; `Reversed` is terminal and nothing returns to `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Editable, no effect on balances.
    Draft,
    /// Lines have taken effect on account balances (immutable).
    Posted,
    /// Cancelled by a linked reversing entry (immutable).
    Reversed,
}

impl EntryStatus {
    /// Returns true if the status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Draft, Self::Posted) | (Self::Posted, Self::Reversed) => true,
            (Self::Draft, Self::Draft | Self::Reversed)
            | (Self::Posted, Self::Draft | Self::Posted)
            | (Self::Reversed, _) => false,
        }
    }

    /// Returns true if the entry has taken effect on balances.
    ///
    /// A reversed original keeps its effect; the reversal cancels it.
    #[must_use]
    pub fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Journal entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Period the entry was posted into.
    pub fiscal_period_id: Option<FiscalPeriodId>,
    /// Sequential number, unique per tenant and organization.
    pub entry_number: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Currency tag.
    pub currency: Currency,
    /// Current status.
    pub status: EntryStatus,
    /// Originating document kind (e.g. `reversal`, `invoice`).
    pub source_type: Option<String>,
    /// Originating document id.
    pub source_id: Option<Uuid>,
    /// When the entry was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// Who posted it.
    pub posted_by: Option<UserId>,
    /// When the entry was reversed.
    pub reversed_at: Option<DateTime<Utc>>,
    /// Who reversed it.
    pub reversed_by: Option<UserId>,
    /// The entry that reverses this one.
    pub reversal_entry_id: Option<JournalEntryId>,
    /// The entry this one reverses.
    pub reverses_entry_id: Option<JournalEntryId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Who created it.
    pub created_by: UserId,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_scoped!(JournalEntry, "journal_entry");

impl JournalEntry {
    /// Builds a draft header from `input`. Lines are materialized separately.
    #[must_use]
    pub fn draft(
        scope: &Scope,
        entry_number: String,
        input: &NewJournalEntry,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JournalEntryId::new(),
            tenant_id: scope.tenant_id,
            organization_id: scope.organization_id,
            fiscal_period_id: None,
            entry_number,
            entry_date: input.entry_date,
            description: input.description.clone(),
            currency: input.currency,
            status: EntryStatus::Draft,
            source_type: input.source_type.clone(),
            source_id: input.source_id,
            posted_at: None,
            posted_by: None,
            reversed_at: None,
            reversed_by: None,
            reversal_entry_id: None,
            reverses_entry_id: None,
            created_at: now,
            created_by: actor,
            deleted_at: None,
        }
    }

    /// Checks that the entry can be posted.
    ///
    /// # Errors
    ///
    /// `AlreadyPosted` for posted entries, `InvalidState` for reversed ones.
    pub fn ensure_postable(&self) -> Result<(), LedgerError> {
        match self.status {
            EntryStatus::Draft => Ok(()),
            EntryStatus::Posted => Err(LedgerError::AlreadyPosted(self.id.into_inner())),
            EntryStatus::Reversed => Err(LedgerError::invalid_state(
                "journal_entry",
                self.status,
                "post",
            )),
        }
    }

    /// Checks that the entry is still an editable draft.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_postable`], with `action` naming the attempted edit.
    pub fn ensure_draft(&self, action: &'static str) -> Result<(), LedgerError> {
        match self.status {
            EntryStatus::Draft => Ok(()),
            EntryStatus::Posted => Err(LedgerError::AlreadyPosted(self.id.into_inner())),
            EntryStatus::Reversed => {
                Err(LedgerError::invalid_state("journal_entry", self.status, action))
            }
        }
    }

    /// Checks that the entry can be reversed.
    ///
    /// # Errors
    ///
    /// `AlreadyReversed` or `NotPosted`.
    pub fn ensure_reversible(&self) -> Result<(), LedgerError> {
        match self.status {
            EntryStatus::Posted => Ok(()),
            EntryStatus::Reversed => Err(LedgerError::AlreadyReversed(self.id.into_inner())),
            EntryStatus::Draft => Err(LedgerError::NotPosted(self.id.into_inner())),
        }
    }

    /// Moves a draft to `Posted`.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_postable`].
    pub fn mark_posted(
        &mut self,
        period_id: FiscalPeriodId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_postable()?;
        debug_assert!(self.status.can_transition_to(EntryStatus::Posted));
        self.status = EntryStatus::Posted;
        self.fiscal_period_id = Some(period_id);
        self.posted_at = Some(at);
        self.posted_by = Some(actor);
        Ok(())
    }

    /// Moves a posted entry to `Reversed`, linking the reversing entry.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_reversible`].
    pub fn mark_reversed(
        &mut self,
        reversal_id: JournalEntryId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_reversible()?;
        self.status = EntryStatus::Reversed;
        self.reversal_entry_id = Some(reversal_id);
        self.reversed_at = Some(at);
        self.reversed_by = Some(actor);
        Ok(())
    }
}

/// A single debit or credit line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// Owning entry.
    pub journal_entry_id: JournalEntryId,
    /// Account the line posts to.
    pub account_id: AccountId,
    /// 1-based position within the entry.
    pub line_number: u32,
    /// Debit amount (zero for credit lines).
    pub debit: Money,
    /// Credit amount (zero for debit lines).
    pub credit: Money,
    /// Optional memo.
    pub memo: Option<String>,
}

/// Caller-supplied line for a draft entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Money,
    /// Credit amount.
    pub credit: Money,
    /// Optional memo.
    pub memo: Option<String>,
}

impl LineInput {
    /// A debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Money::ZERO,
            memo: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: Money::ZERO,
            credit: amount,
            memo: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Materializes the input as a stored line.
    #[must_use]
    pub fn into_line(self, journal_entry_id: JournalEntryId, line_number: u32) -> JournalLine {
        JournalLine {
            id: JournalLineId::new(),
            journal_entry_id,
            account_id: self.account_id,
            line_number,
            debit: self.debit,
            credit: self.credit,
            memo: self.memo,
        }
    }
}

/// Input for creating a draft journal entry.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Currency tag.
    pub currency: Currency,
    /// Originating document kind.
    pub source_type: Option<String>,
    /// Originating document id.
    pub source_id: Option<Uuid>,
    /// Lines, in order.
    pub lines: Vec<LineInput>,
}

/// Entry header together with its ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryWithLines {
    /// Header.
    pub entry: JournalEntry,
    /// Lines ordered by `line_number`.
    pub lines: Vec<JournalLine>,
}

impl EntryWithLines {
    /// Debit and credit totals of the lines.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        EntryTotals::new(
            self.lines.iter().map(|l| l.debit).sum(),
            self.lines.iter().map(|l| l.credit).sum(),
        )
    }
}

/// A line of a balance-affecting entry, with the header fields queries need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedLine {
    /// Entry number.
    pub entry_number: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// When the entry was posted.
    pub posted_at: DateTime<Utc>,
    /// The line itself.
    pub line: JournalLine,
}

/// Debit and credit totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryTotals {
    /// Total debit.
    pub debit: Money,
    /// Total credit.
    pub credit: Money,
    /// Whether the entry is balanced (debits == credits).
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Money, credit: Money) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Money {
        self.debit - self.credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> JournalEntry {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let input = NewJournalEntry {
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            description: "Test".to_string(),
            currency: Currency::Usd,
            source_type: None,
            source_id: None,
            lines: Vec::new(),
        };
        JournalEntry::draft(&scope, "JE-000001".to_string(), &input, UserId::new(), Utc::now())
    }

    #[test]
    fn test_status_transitions() {
        assert!(EntryStatus::Draft.can_transition_to(EntryStatus::Posted));
        assert!(EntryStatus::Posted.can_transition_to(EntryStatus::Reversed));
        assert!(!EntryStatus::Posted.can_transition_to(EntryStatus::Draft));
        assert!(!EntryStatus::Draft.can_transition_to(EntryStatus::Reversed));
        assert!(!EntryStatus::Reversed.can_transition_to(EntryStatus::Posted));
        assert!(!EntryStatus::Reversed.can_transition_to(EntryStatus::Draft));
    }

    #[test]
    fn test_mark_posted_then_reversed() {
        let mut entry = draft();
        let period = FiscalPeriodId::new();
        let actor = UserId::new();
        entry.mark_posted(period, actor, Utc::now()).unwrap();
        assert_eq!(entry.status, EntryStatus::Posted);
        assert_eq!(entry.fiscal_period_id, Some(period));
        assert_eq!(entry.posted_by, Some(actor));

        assert!(matches!(
            entry.mark_posted(period, actor, Utc::now()),
            Err(LedgerError::AlreadyPosted(_))
        ));

        let reversal = JournalEntryId::new();
        entry.mark_reversed(reversal, actor, Utc::now()).unwrap();
        assert_eq!(entry.status, EntryStatus::Reversed);
        assert_eq!(entry.reversal_entry_id, Some(reversal));

        assert!(matches!(
            entry.mark_reversed(reversal, actor, Utc::now()),
            Err(LedgerError::AlreadyReversed(_))
        ));
        assert!(matches!(
            entry.ensure_postable(),
            Err(LedgerError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_draft_header() {
        let entry = draft();
        assert_eq!(entry.status, EntryStatus::Draft);
        assert_eq!(entry.entry_number, "JE-000001");
        assert!(entry.fiscal_period_id.is_none());
        assert!(entry.ensure_draft("update").is_ok());
    }

    #[test]
    fn test_reverse_draft_is_not_posted() {
        let mut entry = draft();
        assert!(matches!(
            entry.mark_reversed(JournalEntryId::new(), UserId::new(), Utc::now()),
            Err(LedgerError::NotPosted(_))
        ));
        assert_eq!(entry.status, EntryStatus::Draft);
    }

    #[test]
    fn test_affects_balances() {
        assert!(!EntryStatus::Draft.affects_balances());
        assert!(EntryStatus::Posted.affects_balances());
        assert!(EntryStatus::Reversed.affects_balances());
    }

    #[test]
    fn test_entry_totals() {
        let totals = EntryTotals::new(Money::from_minor_units(1_000_000), Money::from_minor_units(999_900));
        assert!(!totals.is_balanced);
        assert_eq!(totals.difference(), Money::from_minor_units(100));
    }
}
