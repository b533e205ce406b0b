//! Postgres [`LedgerStore`] built on `SeaORM` transactions.
//!
//! Every unit of work is one `READ COMMITTED` transaction. `lock_*` loaders issue
//! `SELECT ... FOR UPDATE`, so concurrent postings against the same account wait
//! for each other and then see the committed row instead of losing an update.
//! The engine takes account locks in id order. Period lookups take `FOR SHARE`,
//! so postings into one period run side by side while a close waits for them.
//! Deadlocks surface as `ConcurrentModification`; a statement or lock wait that
//! runs past the configured timeout aborts the transaction with `Timeout`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::chart::Account;
use folio_core::fiscal::{FiscalPeriod, FiscalYear};
use folio_core::ledger::{EntryStatus, JournalEntry, JournalLine, LedgerError, PostedLine};
use folio_core::reconciliation::{
    Invoice, InvoiceLine, InvoiceStatus, Payment, PaymentAllocation,
};
use folio_core::scope::Scope;
use folio_core::store::{LedgerStore, SequenceKind, UnitOfWork};
use folio_shared::config::DatabaseConfig;
use folio_shared::types::{
    AccountId, FiscalPeriodId, FiscalYearId, InvoiceId, JournalEntryId, PaymentId,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, IntoActiveModel, IsolationLevel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RuntimeErr, Statement, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::convert;
use crate::entities::{
    accounts, fiscal_periods, fiscal_years, invoice_lines, invoices, journal_entries,
    journal_lines, payment_allocations, payments,
};

/// Default per-statement timeout.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

const NEXT_NUMBER_SQL: &str = r"
INSERT INTO number_sequences (tenant_id, organization_id, kind, last_value)
VALUES ($1, $2, $3, 1)
ON CONFLICT (tenant_id, organization_id, kind)
DO UPDATE SET last_value = number_sequences.last_value + 1
RETURNING last_value
";

/// Extracts the SQLSTATE code of a database error, if there is one.
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => {
            db_err.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

/// Maps a `SeaORM` error onto the ledger taxonomy.
///
/// `40001` (serialization failure) and `40P01` (deadlock) become
/// `ConcurrentModification`; `57014` (statement timeout) and `55P03` (lock
/// timeout) become `Timeout`; everything else is a `Storage` error.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    match sqlstate(&err).as_deref() {
        Some("40001" | "40P01") => LedgerError::ConcurrentModification,
        Some("57014" | "55P03") => LedgerError::Timeout,
        _ => LedgerError::Storage(err.to_string()),
    }
}

/// Postgres-backed ledger store.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    statement_timeout: Duration,
}

impl PgLedgerStore {
    /// Creates a store with the default statement timeout.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Creates a store using the configured statement timeout.
    #[must_use]
    pub fn from_config(db: DatabaseConnection, config: &DatabaseConfig) -> Self {
        Self::new(db).with_statement_timeout(Duration::from_millis(config.statement_timeout_ms))
    }

    /// Sets the statement and lock timeout applied to each unit of work.
    /// `Duration::ZERO` disables it.
    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
            .await
            .map_err(map_db_err)?;

        let millis = self.statement_timeout.as_millis();
        txn.execute_unprepared(&format!(
            "SET LOCAL statement_timeout = {millis}; SET LOCAL lock_timeout = {millis}"
        ))
        .await
        .map_err(map_db_err)?;

        Ok(PgUnitOfWork { txn })
    }
}

/// One read-committed Postgres transaction.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

fn scoped<E, C1, C2>(
    select: sea_orm::Select<E>,
    tenant: C1,
    org: C2,
    scope: &Scope,
) -> sea_orm::Select<E>
where
    E: EntityTrait,
    C1: ColumnTrait,
    C2: ColumnTrait,
{
    select
        .filter(tenant.eq(scope.tenant_id.into_inner()))
        .filter(org.eq(scope.organization_id.into_inner()))
}

impl PgUnitOfWork {
    async fn find_account(&self, id: AccountId, lock: bool) -> Result<Option<Account>, LedgerError> {
        let mut query = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::DeletedAt.is_null());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        if lock && model.is_some() {
            debug!(account_id = %id, "Account row locked");
        }
        model.map(convert::account).transpose()
    }

    async fn find_year(
        &self,
        id: FiscalYearId,
        lock: bool,
    ) -> Result<Option<FiscalYear>, LedgerError> {
        let mut query = fiscal_years::Entity::find_by_id(id.into_inner())
            .filter(fiscal_years::Column::DeletedAt.is_null());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        Ok(model.map(convert::fiscal_year))
    }

    async fn find_period(
        &self,
        id: FiscalPeriodId,
        lock: bool,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        let mut query = fiscal_periods::Entity::find_by_id(id.into_inner())
            .filter(fiscal_periods::Column::DeletedAt.is_null());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        model.map(convert::fiscal_period).transpose()
    }

    async fn find_entry(
        &self,
        id: JournalEntryId,
        lock: bool,
    ) -> Result<Option<JournalEntry>, LedgerError> {
        let mut query = journal_entries::Entity::find_by_id(id.into_inner())
            .filter(journal_entries::Column::DeletedAt.is_null());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        model.map(convert::journal_entry).transpose()
    }

    async fn find_invoice(&self, id: InvoiceId, lock: bool) -> Result<Option<Invoice>, LedgerError> {
        let mut query = invoices::Entity::find_by_id(id.into_inner());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        model.map(convert::invoice).transpose()
    }

    async fn find_payment(&self, id: PaymentId, lock: bool) -> Result<Option<Payment>, LedgerError> {
        let mut query = payments::Entity::find_by_id(id.into_inner());
        if lock {
            query = query.lock_exclusive();
        }
        let model = query.one(&self.txn).await.map_err(map_db_err)?;
        model.map(convert::payment).transpose()
    }

    async fn insert_journal_lines(&self, lines: &[JournalLine]) -> Result<(), LedgerError> {
        if lines.is_empty() {
            return Ok(());
        }
        let models = lines
            .iter()
            .map(|line| convert::journal_line_model(line).map(IntoActiveModel::into_active_model))
            .collect::<Result<Vec<_>, _>>()?;
        journal_lines::Entity::insert_many(models)
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn allocations_where(
        &self,
        column: payment_allocations::Column,
        id: Uuid,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        payment_allocations::Entity::find()
            .filter(column.eq(id))
            .order_by_asc(payment_allocations::Column::AllocatedAt)
            .order_by_asc(payment_allocations::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::allocation)
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    // ========== Accounts ==========

    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.find_account(id, false).await
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.find_account(id, true).await
    }

    async fn accounts(&mut self, scope: &Scope) -> Result<Vec<Account>, LedgerError> {
        scoped(
            accounts::Entity::find(),
            accounts::Column::TenantId,
            accounts::Column::OrganizationId,
            scope,
        )
        .filter(accounts::Column::DeletedAt.is_null())
        .order_by_asc(accounts::Column::Code)
        .all(&self.txn)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(convert::account)
        .collect()
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        convert::account_model(account)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        convert::account_model(account)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, LedgerError> {
        let count = journal_lines::Entity::find()
            .filter(journal_lines::Column::AccountId.eq(id.into_inner()))
            .count(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    // ========== Fiscal calendar ==========

    async fn fiscal_year(&mut self, id: FiscalYearId) -> Result<Option<FiscalYear>, LedgerError> {
        self.find_year(id, false).await
    }

    async fn lock_fiscal_year(
        &mut self,
        id: FiscalYearId,
    ) -> Result<Option<FiscalYear>, LedgerError> {
        self.find_year(id, true).await
    }

    async fn fiscal_years(&mut self, scope: &Scope) -> Result<Vec<FiscalYear>, LedgerError> {
        let models = scoped(
            fiscal_years::Entity::find(),
            fiscal_years::Column::TenantId,
            fiscal_years::Column::OrganizationId,
            scope,
        )
        .filter(fiscal_years::Column::DeletedAt.is_null())
        .order_by_asc(fiscal_years::Column::StartDate)
        .all(&self.txn)
        .await
        .map_err(map_db_err)?;
        Ok(models.into_iter().map(convert::fiscal_year).collect())
    }

    async fn insert_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError> {
        convert::fiscal_year_model(year)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_fiscal_year(&mut self, year: &FiscalYear) -> Result<(), LedgerError> {
        convert::fiscal_year_model(year)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        self.find_period(id, false).await
    }

    async fn lock_fiscal_period(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        self.find_period(id, true).await
    }

    async fn periods_for_year(
        &mut self,
        year_id: FiscalYearId,
    ) -> Result<Vec<FiscalPeriod>, LedgerError> {
        fiscal_periods::Entity::find()
            .filter(fiscal_periods::Column::FiscalYearId.eq(year_id.into_inner()))
            .filter(fiscal_periods::Column::DeletedAt.is_null())
            .order_by_asc(fiscal_periods::Column::StartDate)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::fiscal_period)
            .collect()
    }

    async fn period_for_date(
        &mut self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, LedgerError> {
        let model = scoped(
            fiscal_periods::Entity::find(),
            fiscal_periods::Column::TenantId,
            fiscal_periods::Column::OrganizationId,
            scope,
        )
        .filter(fiscal_periods::Column::DeletedAt.is_null())
        .filter(fiscal_periods::Column::StartDate.lte(date))
        .filter(fiscal_periods::Column::EndDate.gte(date))
        .lock_shared()
        .one(&self.txn)
        .await
        .map_err(map_db_err)?;
        model.map(convert::fiscal_period).transpose()
    }

    async fn insert_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError> {
        convert::fiscal_period_model(period)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_fiscal_period(&mut self, period: &FiscalPeriod) -> Result<(), LedgerError> {
        convert::fiscal_period_model(period)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // ========== Journal ==========

    async fn journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError> {
        self.find_entry(id, false).await
    }

    async fn lock_journal_entry(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, LedgerError> {
        self.find_entry(id, true).await
    }

    async fn journal_lines(
        &mut self,
        entry_id: JournalEntryId,
    ) -> Result<Vec<JournalLine>, LedgerError> {
        journal_lines::Entity::find()
            .filter(journal_lines::Column::JournalEntryId.eq(entry_id.into_inner()))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::journal_line)
            .collect()
    }

    async fn insert_journal_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError> {
        convert::journal_entry_model(entry)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        self.insert_journal_lines(lines).await
    }

    async fn update_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), LedgerError> {
        convert::journal_entry_model(entry)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn replace_journal_lines(
        &mut self,
        entry_id: JournalEntryId,
        lines: &[JournalLine],
    ) -> Result<(), LedgerError> {
        journal_lines::Entity::delete_many()
            .filter(journal_lines::Column::JournalEntryId.eq(entry_id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        self.insert_journal_lines(lines).await
    }

    async fn count_draft_entries(
        &mut self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, LedgerError> {
        scoped(
            journal_entries::Entity::find(),
            journal_entries::Column::TenantId,
            journal_entries::Column::OrganizationId,
            scope,
        )
        .filter(journal_entries::Column::DeletedAt.is_null())
        .filter(journal_entries::Column::Status.eq(EntryStatus::Draft.as_str()))
        .filter(journal_entries::Column::EntryDate.between(start, end))
        .count(&self.txn)
        .await
        .map_err(map_db_err)
    }

    async fn posted_lines(
        &mut self,
        scope: &Scope,
        account_ids: Option<&[AccountId]>,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<PostedLine>, LedgerError> {
        let mut query = journal_lines::Entity::find()
            .find_also_related(journal_entries::Entity)
            .filter(journal_entries::Column::TenantId.eq(scope.tenant_id.into_inner()))
            .filter(journal_entries::Column::OrganizationId.eq(scope.organization_id.into_inner()))
            .filter(journal_entries::Column::DeletedAt.is_null())
            .filter(journal_entries::Column::Status.is_in([
                EntryStatus::Posted.as_str(),
                EntryStatus::Reversed.as_str(),
            ]));
        if let Some(ids) = account_ids {
            query = query.filter(
                journal_lines::Column::AccountId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        if let Some(date) = as_of {
            query = query.filter(journal_entries::Column::EntryDate.lte(date));
        }

        query
            .order_by_asc(journal_entries::Column::PostedAt)
            .order_by_asc(journal_entries::Column::EntryNumber)
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|(line, entry)| {
                let entry = entry.ok_or_else(|| {
                    LedgerError::Storage(format!("journal line {} has no entry", line.id))
                })?;
                convert::posted_line(line, entry)
            })
            .collect()
    }

    async fn next_number(&mut self, scope: &Scope, kind: SequenceKind) -> Result<i64, LedgerError> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_NUMBER_SQL,
            [
                scope.tenant_id.into_inner().into(),
                scope.organization_id.into_inner().into(),
                kind.as_str().into(),
            ],
        );
        let row = self
            .txn
            .query_one(statement)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| LedgerError::Storage("number sequence returned no row".to_string()))?;
        row.try_get::<i64>("", "last_value").map_err(map_db_err)
    }

    // ========== Invoices ==========

    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError> {
        self.find_invoice(id, false).await
    }

    async fn lock_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, LedgerError> {
        self.find_invoice(id, true).await
    }

    async fn invoice_lines(&mut self, id: InvoiceId) -> Result<Vec<InvoiceLine>, LedgerError> {
        invoice_lines::Entity::find()
            .filter(invoice_lines::Column::InvoiceId.eq(id.into_inner()))
            .order_by_asc(invoice_lines::Column::LineNumber)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::invoice_line)
            .collect()
    }

    async fn insert_invoice(
        &mut self,
        invoice: &Invoice,
        lines: &[InvoiceLine],
    ) -> Result<(), LedgerError> {
        convert::invoice_model(invoice)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        if lines.is_empty() {
            return Ok(());
        }
        let models = lines
            .iter()
            .map(|line| convert::invoice_line_model(line).map(IntoActiveModel::into_active_model))
            .collect::<Result<Vec<_>, _>>()?;
        invoice_lines::Entity::insert_many(models)
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), LedgerError> {
        convert::invoice_model(invoice)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn lock_overdue_candidates(
        &mut self,
        scope: &Scope,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, LedgerError> {
        scoped(
            invoices::Entity::find(),
            invoices::Column::TenantId,
            invoices::Column::OrganizationId,
            scope,
        )
        .filter(invoices::Column::Status.is_in([
            InvoiceStatus::Sent.as_str(),
            InvoiceStatus::PartiallyPaid.as_str(),
        ]))
        .filter(invoices::Column::DueDate.lt(as_of))
        .order_by_asc(invoices::Column::Id)
        .lock_exclusive()
        .all(&self.txn)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(convert::invoice)
        .collect()
    }

    // ========== Payments ==========

    async fn payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        self.find_payment(id, false).await
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        self.find_payment(id, true).await
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        convert::payment_model(payment)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        convert::payment_model(payment)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn allocations_for_payment(
        &mut self,
        payment_id: PaymentId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        self.allocations_where(payment_allocations::Column::PaymentId, payment_id.into_inner())
            .await
    }

    async fn allocations_for_invoice(
        &mut self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        self.allocations_where(payment_allocations::Column::InvoiceId, invoice_id.into_inner())
            .await
    }

    async fn insert_allocation(
        &mut self,
        allocation: &PaymentAllocation,
    ) -> Result<(), LedgerError> {
        convert::allocation_model(allocation)
            .into_active_model()
            .insert(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_allocation(
        &mut self,
        allocation: &PaymentAllocation,
    ) -> Result<(), LedgerError> {
        convert::allocation_model(allocation)
            .into_active_model()
            .reset_all()
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // ========== Completion ==========

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_storage() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, LedgerError::Storage(msg) if msg.contains("boom")));
        assert!(!map_db_err(DbErr::RecordNotFound("x".to_string())).is_retryable());
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_STATEMENT_TIMEOUT, Duration::from_secs(5));
    }
}
