//! Read-only ledger queries.

use chrono::NaiveDate;
use folio_shared::types::{AccountId, FiscalYearId};

use super::{LedgerEngine, in_scope};
use crate::chart::{Account, AccountTree};
use crate::fiscal::{FiscalPeriod, FiscalYear};
use crate::ledger::LedgerError;
use crate::reports::{AccountBalance, AccountLedger, ReportService, TrialBalanceReport};
use crate::scope::Scope;
use crate::store::{LedgerStore, UnitOfWork};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Own and rolled-up balance of an account.
    ///
    /// Without `as_of` the stored balances are used; with it, balances are
    /// rebuilt from posted lines dated on or before `as_of`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn compute_balance(
        &self,
        scope: &Scope,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<AccountBalance, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = compute_balance_in(&mut uow, scope, account_id, as_of).await;
        self.read(uow, result).await
    }

    /// Trial balance over every active account of `scope`.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn trial_balance(
        &self,
        scope: &Scope,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalanceReport, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = trial_balance_in(&mut uow, scope, as_of).await;
        self.read(uow, result).await
    }

    /// Posted lines of an account in posting order with a running balance.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn account_ledger(
        &self,
        scope: &Scope,
        account_id: AccountId,
    ) -> Result<AccountLedger, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = account_ledger_in(&mut uow, scope, account_id).await;
        self.read(uow, result).await
    }

    /// Loads an account.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn get_account(
        &self,
        scope: &Scope,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .account(account_id)
            .await
            .and_then(|loaded| in_scope(scope, loaded, account_id));
        self.read(uow, result).await
    }

    /// Every account of `scope`, ordered by code.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn list_accounts(&self, scope: &Scope) -> Result<Vec<Account>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow.accounts(scope).await;
        self.read(uow, result).await
    }

    /// Every fiscal year of `scope`, ordered by start date.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn list_fiscal_years(&self, scope: &Scope) -> Result<Vec<FiscalYear>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow.fiscal_years(scope).await;
        self.read(uow, result).await
    }

    /// Periods of a year, ordered by start date.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn list_periods(
        &self,
        scope: &Scope,
        year_id: FiscalYearId,
    ) -> Result<Vec<FiscalPeriod>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = list_periods_in(&mut uow, scope, year_id).await;
        self.read(uow, result).await
    }
}

async fn compute_balance_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
    as_of: Option<NaiveDate>,
) -> Result<AccountBalance, LedgerError> {
    in_scope(scope, uow.account(account_id).await?, account_id)?;
    let tree = AccountTree::new(uow.accounts(scope).await?);
    let lines = match as_of {
        Some(date) => {
            let subtree = tree.subtree(account_id);
            uow.posted_lines(scope, Some(subtree.as_slice()), Some(date)).await?
        }
        None => Vec::new(),
    };
    ReportService::compute_balance(&tree, account_id, as_of, &lines)
        .ok_or_else(|| LedgerError::not_found("account", account_id))
}

async fn trial_balance_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    as_of: Option<NaiveDate>,
) -> Result<TrialBalanceReport, LedgerError> {
    let accounts = uow.accounts(scope).await?;
    let lines = uow.posted_lines(scope, None, as_of).await?;
    Ok(ReportService::generate_trial_balance(&accounts, &lines, as_of))
}

async fn account_ledger_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
) -> Result<AccountLedger, LedgerError> {
    let account = in_scope(scope, uow.account(account_id).await?, account_id)?;
    let lines = uow
        .posted_lines(scope, Some(std::slice::from_ref(&account.id)), None)
        .await?;
    Ok(ReportService::account_ledger(&account, &lines))
}

async fn list_periods_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    year_id: FiscalYearId,
) -> Result<Vec<FiscalPeriod>, LedgerError> {
    let year = in_scope(scope, uow.fiscal_year(year_id).await?, year_id)?;
    uow.periods_for_year(year.id).await
}
