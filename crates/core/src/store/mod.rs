//! Persistence seam of the ledger.
//!
//! A [`LedgerStore`] hands out [`UnitOfWork`]s. Everything done through one unit
//! of work commits or rolls back together; dropping it without calling
//! [`UnitOfWork::commit`] discards its changes.
//!
//! `lock_*` loaders take a row lock held until the unit of work ends. Loaders
//! never return soft-deleted rows, and loaders by id do not filter by scope: the
//! caller checks the scope so a foreign reference is reported, not hidden.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_shared::types::{
    AccountId, FiscalPeriodId, FiscalYearId, InvoiceId, JournalEntryId, PaymentId,
};

use crate::chart::Account;
use crate::fiscal::{FiscalPeriod, FiscalYear};
use crate::ledger::{JournalEntry, JournalLine, LedgerError, PostedLine};
use crate::reconciliation::{Invoice, InvoiceLine, Payment, PaymentAllocation};
use crate::scope::Scope;

pub use memory::MemoryStore;

/// Per-scope document number sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Journal entry numbers.
    JournalEntry,
    /// Invoice numbers.
    Invoice,
    /// Payment numbers.
    Payment,
}

impl SequenceKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JournalEntry => "journal_entry",
            Self::Invoice => "invoice",
            Self::Payment => "payment",
        }
    }
}

/// Source of units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit of work type.
    type Uow: UnitOfWork;

    /// Starts a unit of work.
    async fn begin(&self) -> Result<Self::Uow, LedgerError>;
}

/// One atomic unit of ledger work.
#[async_trait]
pub trait UnitOfWork: Send {
    // ========== Accounts ==========
    /// Loads an account.
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError>;
    /// Loads and locks an account.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError>;
    /// All accounts of a scope, ordered by code.
    async fn accounts(&mut self, scope: &Scope) -> Result<Vec<Account>, LedgerError>;
    /// Inserts an account.
    async fn insert_account(&mut self, account: &Account) -> Result<(), LedgerError>;
    /// Saves an account.
    async fn update_account(&mut self, account: &Account) -> Result<(), LedgerError>;
    /// Returns true if any journal line references the account.
    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, LedgerError>;

    // ========== Fiscal calendar ==========
    /// Loads a fiscal year.
    async fn fiscal_year(&mut self, id: FiscalYearId) -> Result<Option<FiscalYear>, LedgerError>;
    /// Loads and locks a fiscal year.
    async fn lock_fiscal_year(&mut self, id: FiscalYearId)
    -> Result<Option<FiscalYear>, LedgerError>;
    /// All fiscal years of a scope, ordered by start date.
    async fn fiscal_years(&mut self, scope: &Scope) -> Result<Vec<FiscalYear>, LedgerError>;
    /// Inserts a fiscal year.
    async fn insert_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError>;
    /// Saves a fiscal year.
    async fn update_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError>;
    /// Loads a fiscal period.
    async fn fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError>;
    /// Loads and locks a fiscal period.
    async fn lock_fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError>;
    /// Periods of a year, ordered by start date.
    async fn periods_for_year(
        &mut self,
        year_id: FiscalYearId,
    ) -> Result<Vec<FiscalPeriod>, LedgerError>;
    /// The period of a scope containing `date`, locked against concurrent closing.
    async fn period_for_date(
        &mut self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, LedgerError>;
    /// Inserts a fiscal period.
    async fn insert_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError>;
    /// Saves a fiscal period.
    async fn update_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError>;

    // ========== Journal ==========
    /// Loads a journal entry header.
    async fn journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError>;
    /// Loads and locks a journal entry header.
    async fn lock_journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError>;
    /// Lines of an entry, ordered by line number.
    async fn journal_lines(
        &mut self,
        entry_id: JournalEntryId,
    ) -> Result<Vec<JournalLine>, LedgerError>;
    /// Inserts an entry with its lines.
    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError>;
    /// Saves an entry header.
    async fn update_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), LedgerError>;
    /// Replaces all lines of an entry.
    async fn replace_journal_lines(
        &mut self,
        entry_id: JournalEntryId,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError>;
    /// Number of draft entries of a scope dated within `[start, end]`.
    async fn count_draft_entries(
        &mut self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, LedgerError>;
    /// Lines of posted and reversed entries, ordered by posting time, entry
    /// number and line number; optionally restricted to some accounts and to
    /// entries dated on or before `as_of`.
    async fn posted_lines(
        &mut self,
        scope: &Scope,
        account_ids: Option<&[AccountId]>,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<PostedLine>, LedgerError>;
    /// Next value of a per-scope sequence, starting at 1.
    async fn next_number(&mut self, scope: &Scope, kind: SequenceKind) -> Result<i64, LedgerError>;

    // ========== Invoices ==========
    /// Loads an invoice.
    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError>;
    /// Loads and locks an invoice.
    async fn lock_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError>;
    /// Lines of an invoice, ordered by line number.
    async fn invoice_lines(&mut self, id: InvoiceId) -> Result<Vec<InvoiceLine>, LedgerError>;
    /// Inserts an invoice with its lines.
    async fn insert_invoice(
        &mut self,
        invoice: &Invoice,
        lines: &[InvoiceLine],
    ) -> Result<(), LedgerError>;
    /// Saves an invoice header.
    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), LedgerError>;
    /// Locks sent and partially paid invoices of a scope due before `as_of`.
    async fn lock_overdue_candidates(
        &mut self,
        scope: &Scope,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, LedgerError>;

    // ========== Payments ==========
    /// Loads a payment.
    async fn payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError>;
    /// Loads and locks a payment.
    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError>;
    /// Inserts a payment.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), LedgerError>;
    /// Saves a payment.
    async fn update_payment(&mut self, payment: &Payment) -> Result<(), LedgerError>;
    /// Allocations of a payment, active and reversed, in allocation order.
    async fn allocations_for_payment(
        &mut self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError>;
    /// Allocations against an invoice, active and reversed, in allocation order.
    async fn allocations_for_invoice(
        &mut self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError>;
    /// Inserts an allocation.
    async fn insert_allocation(&mut self, allocation: &PaymentAllocation)
    -> Result<(), LedgerError>;
    /// Saves an allocation.
    async fn update_allocation(&mut self, allocation: &PaymentAllocation)
    -> Result<(), LedgerError>;

    // ========== Completion ==========
    /// Makes every change of this unit of work durable.
    async fn commit(self) -> Result<(), LedgerError>;
    /// Discards every change of this unit of work.
    async fn rollback(self) -> Result<(), LedgerError>;
}
