//! In-memory [`LedgerStore`].
//!
//! A unit of work holds the store-wide mutex for its whole lifetime and works on
//! a copy of the state, which is written back on commit. Units of work are
//! therefore fully serialized, which trivially satisfies every row lock the
//! trait asks for.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_shared::config::LedgerConfig;
use folio_shared::types::{
    AccountId, FiscalPeriodId, FiscalYearId, InvoiceId, JournalEntryId, PaymentId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{LedgerStore, SequenceKind, UnitOfWork};
use crate::chart::Account;
use crate::fiscal::{FiscalPeriod, FiscalYear};
use crate::ledger::{EntryStatus, JournalEntry, JournalLine, LedgerError, PostedLine};
use crate::reconciliation::{Invoice, InvoiceLine, InvoiceStatus, Payment, PaymentAllocation};
use crate::scope::{Scope, Scoped};

/// Default time to wait for the store mutex.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    fiscal_years: HashMap<FiscalYearId, FiscalYear>,
    fiscal_periods: HashMap<FiscalPeriodId, FiscalPeriod>,
    entries: HashMap<JournalEntryId, JournalEntry>,
    lines: HashMap<JournalEntryId, Vec<JournalLine>>,
    invoices: HashMap<InvoiceId, Invoice>,
    invoice_lines: HashMap<InvoiceId, Vec<InvoiceLine>>,
    payments: HashMap<PaymentId, Payment>,
    allocations: Vec<PaymentAllocation>,
    sequences: HashMap<(Scope, SequenceKind), i64>,
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store that gives up beginning a unit of work after `lock_timeout`.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            lock_timeout,
        }
    }

    /// Creates an empty store using the configured lock timeout.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::with_lock_timeout(Duration::from_millis(config.lock_timeout_ms))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Uow = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, LedgerError> {
        let guard = tokio::time::timeout(self.lock_timeout, Arc::clone(&self.state).lock_owned())
            .await
            .map_err(|_| LedgerError::Timeout)?;
        debug!("Memory unit of work started");
        let working = (*guard).clone();
        Ok(MemoryUnitOfWork { guard, working })
    }
}

/// Unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn live<T: Clone>(item: Option<&T>, deleted: impl Fn(&T) -> bool) -> Option<T> {
    item.filter(|i| !deleted(*i)).cloned()
}

fn in_scope<T: Scoped>(item: &T, scope: &Scope) -> bool {
    item.scope() == *scope
}

fn missing(entity: &'static str, id: impl Into<uuid::Uuid>) -> LedgerError {
    LedgerError::Storage(format!("{entity} {} does not exist", id.into()))
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(live(self.working.accounts.get(&id), |a| a.deleted_at.is_some()))
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.account(id).await
    }

    async fn accounts(&mut self, scope: &Scope) -> Result<Vec<Account>, LedgerError> {
        let mut accounts: Vec<Account> = self
            .working
            .accounts
            .values()
            .filter(|a| in_scope(*a, scope) && a.deleted_at.is_none())
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.working.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        let slot = self
            .working
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| missing("account", account.id))?;
        *slot = account.clone();
        Ok(())
    }

    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, LedgerError> {
        Ok(self
            .working
            .lines
            .values()
            .flatten()
            .any(|l| l.account_id == id))
    }

    async fn fiscal_year(&mut self, id: FiscalYearId) -> Result<Option<FiscalYear>, LedgerError> {
        Ok(live(self.working.fiscal_years.get(&id), |y| y.deleted_at.is_some()))
    }

    async fn lock_fiscal_year(
        &mut self,
        id: FiscalYearId,
    ) -> Result<Option<FiscalYear>, LedgerError> {
        self.fiscal_year(id).await
    }

    async fn fiscal_years(&mut self, scope: &Scope) -> Result<Vec<FiscalYear>, LedgerError> {
        let mut years: Vec<FiscalYear> = self
            .working
            .fiscal_years
            .values()
            .filter(|y| in_scope(*y, scope) && y.deleted_at.is_none())
            .cloned()
            .collect();
        years.sort_by_key(|y| y.start_date);
        Ok(years)
    }

    async fn insert_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError> {
        self.working.fiscal_years.insert(year.id, year.clone());
        Ok(())
    }

    async fn update_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError> {
        let slot = self
            .working
            .fiscal_years
            .get_mut(&year.id)
            .ok_or_else(|| missing("fiscal_year", year.id))?;
        *slot = year.clone();
        Ok(())
    }

    async fn fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        Ok(live(self.working.fiscal_periods.get(&id), |p| p.deleted_at.is_some()))
    }

    async fn lock_fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        self.fiscal_period(id).await
    }

    async fn periods_for_year(
        &mut self,
        year_id: FiscalYearId,
    ) -> Result<Vec<FiscalPeriod>, LedgerError> {
        let mut periods: Vec<FiscalPeriod> = self
            .working
            .fiscal_periods
            .values()
            .filter(|p| p.fiscal_year_id == year_id && p.deleted_at.is_none())
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.start_date);
        Ok(periods)
    }

    async fn period_for_date(
        &mut self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        Ok(self
            .working
            .fiscal_periods
            .values()
            .find(|p| in_scope(*p, scope) && p.deleted_at.is_none() && p.contains_date(date))
            .cloned())
    }

    async fn insert_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError> {
        self.working.fiscal_periods.insert(period.id, period.clone());
        Ok(())
    }

    async fn update_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError> {
        let slot = self
            .working
            .fiscal_periods
            .get_mut(&period.id)
            .ok_or_else(|| missing("fiscal_period", period.id))?;
        *slot = period.clone();
        Ok(())
    }

    async fn journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError> {
        Ok(live(self.working.entries.get(&id), |e| e.deleted_at.is_some()))
    }

    async fn lock_journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError> {
        self.journal_entry(id).await
    }

    async fn journal_lines(
        &mut self,
        entry_id: JournalEntryId,
    ) -> Result<Vec<JournalLine>, LedgerError> {
        let mut lines = self.working.lines.get(&entry_id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.line_number);
        Ok(lines)
    }

    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError> {
        self.working.entries.insert(entry.id, entry.clone());
        self.working.lines.insert(entry.id, lines.to_vec());
        Ok(())
    }

    async fn update_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), LedgerError> {
        let slot = self
            .working
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| missing("journal_entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    async fn replace_journal_lines(
        &mut self,
        entry_id: JournalEntryId,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError> {
        if !self.working.entries.contains_key(&entry_id) {
            return Err(missing("journal_entry", entry_id));
        }
        self.working.lines.insert(entry_id, lines.to_vec());
        Ok(())
    }

    async fn count_draft_entries(
        &mut self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, LedgerError> {
        let count = self
            .working
            .entries
            .values()
            .filter(|e| {
                in_scope(*e, scope)
                    && e.deleted_at.is_none()
                    && e.status == EntryStatus::Draft
                    && e.entry_date >= start
                    && e.entry_date <= end
            })
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn posted_lines(
        &mut self,
        scope: &Scope,
        account_ids: Option<&[AccountId]>,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<PostedLine>, LedgerError> {
        let mut out = Vec::new();
        for entry in self.working.entries.values() {
            if !in_scope(entry, scope)
                || entry.deleted_at.is_some()
                || !entry.status.affects_balances()
                || as_of.is_some_and(|date| entry.entry_date > date)
            {
                continue;
            }
            let Some(posted_at) = entry.posted_at else {
                continue;
            };
            let lines = self.working.lines.get(&entry.id).into_iter().flatten();
            for line in lines {
                if account_ids.is_some_and(|ids| !ids.contains(&line.account_id)) {
                    continue;
                }
                out.push(PostedLine {
                    entry_number: entry.entry_number.clone(),
                    entry_date: entry.entry_date,
                    posted_at,
                    line: line.clone(),
                });
            }
        }
        out.sort_by(|a, b| {
            (a.posted_at, &a.entry_number, a.line.line_number).cmp(&(
                b.posted_at,
                &b.entry_number,
                b.line.line_number,
            ))
        });
        Ok(out)
    }

    async fn next_number(&mut self, scope: &Scope, kind: SequenceKind) -> Result<i64, LedgerError> {
        let value = self.working.sequences.entry((*scope, kind)).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError> {
        Ok(self.working.invoices.get(&id).cloned())
    }

    async fn lock_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError> {
        self.invoice(id).await
    }

    async fn invoice_lines(&mut self, id: InvoiceId) -> Result<Vec<InvoiceLine>, LedgerError> {
        let mut lines = self.working.invoice_lines.get(&id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.line_number);
        Ok(lines)
    }

    async fn insert_invoice(
        &mut self,
        invoice: &Invoice,
        lines: &[InvoiceLine],
    ) -> Result<(), LedgerError> {
        self.working.invoices.insert(invoice.id, invoice.clone());
        self.working.invoice_lines.insert(invoice.id, lines.to_vec());
        Ok(())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), LedgerError> {
        let slot = self
            .working
            .invoices
            .get_mut(&invoice.id)
            .ok_or_else(|| missing("invoice", invoice.id))?;
        *slot = invoice.clone();
        Ok(())
    }

    async fn lock_overdue_candidates(
        &mut self,
        scope: &Scope,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, LedgerError> {
        let mut invoices: Vec<Invoice> = self
            .working
            .invoices
            .values()
            .filter(|i| {
                in_scope(*i, scope)
                    && matches!(i.status, InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid)
                    && i.due_date < as_of
            })
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.id);
        Ok(invoices)
    }

    async fn payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        self.payment(id).await
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        self.working.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        let slot = self
            .working
            .payments
            .get_mut(&payment.id)
            .ok_or_else(|| missing("payment", payment.id))?;
        *slot = payment.clone();
        Ok(())
    }

    async fn allocations_for_payment(
        &mut self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        Ok(self
            .working
            .allocations
            .iter()
            .filter(|a| a.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn allocations_for_invoice(
        &mut self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        Ok(self
            .working
            .allocations
            .iter()
            .filter(|a| a.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn insert_allocation(
        &mut self,
        allocation: &PaymentAllocation,
    ) -> Result<(), LedgerError> {
        self.working.allocations.push(allocation.clone());
        Ok(())
    }

    async fn update_allocation(
        &mut self,
        allocation: &PaymentAllocation,
    ) -> Result<(), LedgerError> {
        let slot = self
            .working
            .allocations
            .iter_mut()
            .find(|a| a.id == allocation.id)
            .ok_or_else(|| missing("payment_allocation", allocation.id))?;
        *slot = allocation.clone();
        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        let Self { mut guard, working } = self;
        *guard = working;
        debug!("Memory unit of work committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        debug!("Memory unit of work rolled back");
        Ok(())
    }
}
