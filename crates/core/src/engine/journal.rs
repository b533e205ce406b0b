//! Journal operations: drafts, posting and reversal.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{AccountId, JournalEntryId, UserId};
use tracing::{debug, info};

use super::{LedgerEngine, Outcome, document_number, in_scope};
use crate::chart::Account;
use crate::events::{DomainEvent, EventPayload};
use crate::ledger::{
    BalanceDeltas, EntryWithLines, JournalEntry, JournalLine, LedgerError, LineInput,
    NewJournalEntry, REVERSAL_SOURCE, ReversalService, ensure_postable_lines, validate_lines,
};
use crate::scope::Scope;
use crate::store::{LedgerStore, SequenceKind, UnitOfWork};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Stores a new draft entry.
    ///
    /// Line shape is validated and every account must exist in `scope`; balance
    /// is only required when posting.
    ///
    /// # Errors
    ///
    /// `InsufficientLines`, `InvalidLine`, `NotFound` or `CrossTenantReference`.
    pub async fn create_draft_entry(
        &self,
        scope: &Scope,
        input: NewJournalEntry,
        actor: UserId,
    ) -> Result<EntryWithLines, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = self.create_draft_in(&mut uow, scope, input, actor).await;
        self.finish("create_draft_entry", uow, result).await
    }

    async fn create_draft_in(
        &self,
        uow: &mut S::Uow,
        scope: &Scope,
        mut input: NewJournalEntry,
        actor: UserId,
    ) -> Result<Outcome<EntryWithLines>, LedgerError> {
        validate_lines(&input.lines)?;
        check_line_accounts(uow, scope, &input.lines).await?;

        let number = uow.next_number(scope, SequenceKind::JournalEntry).await?;
        let entry = JournalEntry::draft(
            scope,
            document_number(&self.settings.entry_prefix, number),
            &input,
            actor,
            Utc::now(),
        );
        let lines = number_lines(entry.id, std::mem::take(&mut input.lines));
        uow.insert_journal_entry(&entry, &lines).await?;

        debug!(entry_number = %entry.entry_number, lines = lines.len(), "Draft entry created");
        Ok(Outcome::quiet(EntryWithLines { entry, lines }))
    }

    /// Replaces every line of a draft entry.
    ///
    /// # Errors
    ///
    /// `AlreadyPosted`/`InvalidState` for non-drafts, plus the errors of
    /// [`Self::create_draft_entry`].
    pub async fn update_draft_lines(
        &self,
        scope: &Scope,
        entry_id: JournalEntryId,
        lines: Vec<LineInput>,
    ) -> Result<EntryWithLines, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = update_draft_in(&mut uow, scope, entry_id, lines).await;
        self.finish("update_draft_lines", uow, result).await
    }

    /// Soft-deletes a draft entry.
    ///
    /// # Errors
    ///
    /// `NotFound`, `CrossTenantReference`, `AlreadyPosted` or `InvalidState`.
    pub async fn delete_draft_entry(
        &self,
        scope: &Scope,
        entry_id: JournalEntryId,
    ) -> Result<(), LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = delete_draft_in(&mut uow, scope, entry_id).await;
        self.finish("delete_draft_entry", uow, result).await
    }

    /// Loads an entry with its ordered lines.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn get_entry(
        &self,
        scope: &Scope,
        entry_id: JournalEntryId,
    ) -> Result<EntryWithLines, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = get_entry_in(&mut uow, scope, entry_id).await;
        self.read(uow, result).await
    }

    /// Posts a draft entry into the open period containing its date.
    ///
    /// Moves the stored balance of every referenced account by its lines'
    /// normal-balance effect.
    ///
    /// # Errors
    ///
    /// `UnbalancedEntry`, `PeriodClosed`, `NoFiscalPeriod`, `InactiveAccount`,
    /// `AlreadyPosted`, `InvalidState`, `NotFound` or `CrossTenantReference`.
    pub async fn post(
        &self,
        scope: &Scope,
        entry_id: JournalEntryId,
        actor: UserId,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = post_in(&mut uow, scope, entry_id, actor, Utc::now()).await;
        self.finish("post", uow, result).await
    }

    /// Reverses a posted entry with a new, immediately posted entry dated
    /// `reversal_date` whose lines swap every debit and credit.
    ///
    /// Returns the reversing entry.
    ///
    /// # Errors
    ///
    /// `AlreadyReversed`, `NotPosted`, or any posting error of the reversal.
    pub async fn reverse(
        &self,
        scope: &Scope,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
        actor: UserId,
    ) -> Result<EntryWithLines, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = self
            .reverse_in(&mut uow, scope, entry_id, reversal_date, actor, Utc::now())
            .await;
        self.finish("reverse", uow, result).await
    }

    async fn reverse_in(
        &self,
        uow: &mut S::Uow,
        scope: &Scope,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Outcome<EntryWithLines>, LedgerError> {
        let mut original = in_scope(scope, uow.lock_journal_entry(entry_id).await?, entry_id)?;
        original.ensure_reversible()?;
        let original_lines = uow.journal_lines(original.id).await?;

        let mut input = NewJournalEntry {
            entry_date: reversal_date,
            description: ReversalService::description(&original),
            currency: original.currency,
            source_type: Some(REVERSAL_SOURCE.to_string()),
            source_id: Some(original.id.into_inner()),
            lines: ReversalService::reversing_lines(&original_lines),
        };
        let number = uow.next_number(scope, SequenceKind::JournalEntry).await?;
        let mut reversal = JournalEntry::draft(
            scope,
            document_number(&self.settings.entry_prefix, number),
            &input,
            actor,
            now,
        );
        reversal.reverses_entry_id = Some(original.id);
        let lines = number_lines(reversal.id, std::mem::take(&mut input.lines));
        uow.insert_journal_entry(&reversal, &lines).await?;

        apply_posting(uow, scope, &mut reversal, &lines, actor, now).await?;
        original.mark_reversed(reversal.id, actor, now)?;
        uow.update_journal_entry(&original).await?;

        info!(
            entry_number = %original.entry_number,
            reversal_number = %reversal.entry_number,
            reversal_date = %reversal_date,
            "Journal entry reversed"
        );
        let events = vec![
            DomainEvent::new(
                *scope,
                now,
                EventPayload::EntryPosted {
                    entry_id: reversal.id,
                    entry_number: reversal.entry_number.clone(),
                },
            ),
            DomainEvent::new(
                *scope,
                now,
                EventPayload::EntryReversed {
                    entry_id: original.id,
                    reversal_entry_id: reversal.id,
                },
            ),
        ];
        Ok(Outcome::with_events(
            EntryWithLines {
                entry: reversal,
                lines,
            },
            events,
        ))
    }
}

/// Numbers lines from 1 in input order.
fn number_lines(entry_id: JournalEntryId, lines: Vec<LineInput>) -> Vec<JournalLine> {
    lines
        .into_iter()
        .zip(1u32..)
        .map(|(line, n)| line.into_line(entry_id, n))
        .collect()
}

/// Every referenced account must exist in `scope`.
async fn check_line_accounts<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    lines: &[LineInput],
) -> Result<(), LedgerError> {
    let mut ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    for id in ids {
        in_scope(scope, uow.account(id).await?, id)?;
    }
    Ok(())
}

async fn update_draft_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    entry_id: JournalEntryId,
    lines: Vec<LineInput>,
) -> Result<Outcome<EntryWithLines>, LedgerError> {
    let entry = in_scope(scope, uow.lock_journal_entry(entry_id).await?, entry_id)?;
    entry.ensure_draft("update")?;
    validate_lines(&lines)?;
    check_line_accounts(uow, scope, &lines).await?;

    let lines = number_lines(entry.id, lines);
    uow.replace_journal_lines(entry.id, &lines).await?;
    debug!(entry_number = %entry.entry_number, lines = lines.len(), "Draft lines replaced");
    Ok(Outcome::quiet(EntryWithLines { entry, lines }))
}

async fn delete_draft_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    entry_id: JournalEntryId,
) -> Result<Outcome<()>, LedgerError> {
    let mut entry = in_scope(scope, uow.lock_journal_entry(entry_id).await?, entry_id)?;
    entry.ensure_draft("delete")?;
    entry.deleted_at = Some(Utc::now());
    uow.update_journal_entry(&entry).await?;
    debug!(entry_number = %entry.entry_number, "Draft entry deleted");
    Ok(Outcome::quiet(()))
}

async fn get_entry_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    entry_id: JournalEntryId,
) -> Result<EntryWithLines, LedgerError> {
    let entry = in_scope(scope, uow.journal_entry(entry_id).await?, entry_id)?;
    let lines = uow.journal_lines(entry.id).await?;
    Ok(EntryWithLines { entry, lines })
}

async fn post_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    entry_id: JournalEntryId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Outcome<JournalEntry>, LedgerError> {
    let mut entry = in_scope(scope, uow.lock_journal_entry(entry_id).await?, entry_id)?;
    entry.ensure_postable()?;
    let lines = uow.journal_lines(entry.id).await?;
    apply_posting(uow, scope, &mut entry, &lines, actor, now).await?;

    let event = DomainEvent::new(
        *scope,
        now,
        EventPayload::EntryPosted {
            entry_id: entry.id,
            entry_number: entry.entry_number.clone(),
        },
    );
    Ok(Outcome::with_events(entry, vec![event]))
}

/// Posts `entry`: validates lines and period, locks the accounts in id order,
/// moves their balances and marks the entry posted.
async fn apply_posting<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    entry: &mut JournalEntry,
    lines: &[JournalLine],
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let totals = ensure_postable_lines(lines)?;

    let period = uow
        .period_for_date(scope, entry.entry_date)
        .await?
        .ok_or(LedgerError::NoFiscalPeriod(entry.entry_date))?;
    let year = uow
        .fiscal_year(period.fiscal_year_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("fiscal_year", period.fiscal_year_id))?;
    if !period.is_open() || year.is_closed {
        return Err(LedgerError::PeriodClosed {
            date: entry.entry_date,
        });
    }

    let mut ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut accounts: Vec<Account> = Vec::with_capacity(ids.len());
    for id in ids {
        let account = in_scope(scope, uow.lock_account(id).await?, id)?;
        account.ensure_postable()?;
        accounts.push(account);
    }
    debug!(entry_number = %entry.entry_number, accounts = accounts.len(), "Account rows locked");

    let mut deltas = BalanceDeltas::new();
    for line in lines {
        if let Some(account) = accounts.iter().find(|a| a.id == line.account_id) {
            deltas.add(account.id, account.normal_balance, line.debit, line.credit);
        }
    }
    for account in &mut accounts {
        account.apply_delta(deltas.get(account.id), now);
        uow.update_account(account).await?;
    }

    entry.mark_posted(period.id, actor, now)?;
    uow.update_journal_entry(entry).await?;

    info!(
        entry_number = %entry.entry_number,
        period = %period.code,
        total = %totals.debit,
        "Journal entry posted"
    );
    Ok(())
}
