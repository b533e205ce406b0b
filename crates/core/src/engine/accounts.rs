//! Chart of accounts maintenance.

use chrono::Utc;
use folio_shared::types::AccountId;
use tracing::info;

use super::{LedgerEngine, Outcome, in_scope};
use crate::chart::{Account, AccountTree, NewAccount};
use crate::ledger::LedgerError;
use crate::scope::Scope;
use crate::store::{LedgerStore, UnitOfWork};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an active, zero-balance account.
    ///
    /// # Errors
    ///
    /// `DuplicateCode`, `NotFound` for a missing parent, `CrossTenantReference`
    /// or `InvalidHierarchy`.
    pub async fn create_account(
        &self,
        scope: &Scope,
        input: NewAccount,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = create_account_in(&mut uow, scope, input).await;
        self.finish("create_account", uow, result).await
    }

    /// Moves an account under a new parent, or to the top level.
    ///
    /// # Errors
    ///
    /// `InvalidHierarchy` for cycles and foreign organizations,
    /// `CrossTenantReference` for foreign tenants.
    pub async fn reparent_account(
        &self,
        scope: &Scope,
        account_id: AccountId,
        new_parent: Option<AccountId>,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = reparent_in(&mut uow, scope, account_id, new_parent).await;
        self.finish("reparent_account", uow, result).await
    }

    /// Deactivates an account whose whole subtree has a zero balance.
    ///
    /// # Errors
    ///
    /// `SystemAccountProtected`, `AccountHasBalance`, or `InvalidState` if
    /// already inactive.
    pub async fn deactivate_account(
        &self,
        scope: &Scope,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = deactivate_in(&mut uow, scope, account_id).await;
        self.finish("deactivate_account", uow, result).await
    }

    /// Reactivates an inactive account.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the account is already active.
    pub async fn reactivate_account(
        &self,
        scope: &Scope,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = reactivate_in(&mut uow, scope, account_id).await;
        self.finish("reactivate_account", uow, result).await
    }

    /// Soft-deletes an unused account.
    ///
    /// # Errors
    ///
    /// `SystemAccountProtected`, `AccountHasBalance`, or `AccountInUse` when it
    /// has children or journal lines.
    pub async fn delete_account(
        &self,
        scope: &Scope,
        account_id: AccountId,
    ) -> Result<(), LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = delete_account_in(&mut uow, scope, account_id).await;
        self.finish("delete_account", uow, result).await
    }
}

async fn create_account_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    input: NewAccount,
) -> Result<Outcome<Account>, LedgerError> {
    let accounts = uow.accounts(scope).await?;
    if accounts.iter().any(|a| a.code == input.code) {
        return Err(LedgerError::DuplicateCode(input.code));
    }
    let parent = match input.parent_id {
        Some(parent_id) => Some(
            uow.account(parent_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("account", parent_id))?,
        ),
        None => None,
    };

    let account = Account::create(scope, input, Utc::now());
    AccountTree::new(accounts).validate_parent(&account, parent.as_ref())?;
    uow.insert_account(&account).await?;

    info!(code = %account.code, account_type = %account.account_type, "Account created");
    Ok(Outcome::quiet(account))
}

async fn reparent_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
    new_parent: Option<AccountId>,
) -> Result<Outcome<Account>, LedgerError> {
    let mut account = in_scope(scope, uow.lock_account(account_id).await?, account_id)?;
    let parent = match new_parent {
        Some(parent_id) => Some(
            uow.account(parent_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("account", parent_id))?,
        ),
        None => None,
    };

    let tree = AccountTree::new(uow.accounts(scope).await?);
    tree.validate_parent(&account, parent.as_ref())?;

    account.parent_id = new_parent;
    account.updated_at = Utc::now();
    uow.update_account(&account).await?;
    info!(code = %account.code, "Account re-parented");
    Ok(Outcome::quiet(account))
}

/// Locks the subtree of `account_id` in id order and fails on the first
/// account carrying a balance.
async fn ensure_zero_subtree<U: UnitOfWork>(
    uow: &mut U,
    tree: &AccountTree,
    account_id: AccountId,
) -> Result<(), LedgerError> {
    let mut ids = tree.subtree(account_id);
    ids.sort_unstable();
    for id in ids {
        if let Some(account) = uow.lock_account(id).await?
            && !account.balance.is_zero()
        {
            return Err(LedgerError::AccountHasBalance {
                account_id: id.into_inner(),
                balance: account.balance,
            });
        }
    }
    Ok(())
}

async fn deactivate_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
) -> Result<Outcome<Account>, LedgerError> {
    let account = in_scope(scope, uow.account(account_id).await?, account_id)?;
    account.ensure_not_system()?;
    if !account.is_active {
        return Err(LedgerError::invalid_state("account", "inactive", "deactivate"));
    }

    let tree = AccountTree::new(uow.accounts(scope).await?);
    ensure_zero_subtree(uow, &tree, account_id).await?;

    let mut account = in_scope(scope, uow.lock_account(account_id).await?, account_id)?;
    account.is_active = false;
    account.updated_at = Utc::now();
    uow.update_account(&account).await?;
    info!(code = %account.code, "Account deactivated");
    Ok(Outcome::quiet(account))
}

async fn reactivate_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
) -> Result<Outcome<Account>, LedgerError> {
    let mut account = in_scope(scope, uow.lock_account(account_id).await?, account_id)?;
    if account.is_active {
        return Err(LedgerError::invalid_state("account", "active", "reactivate"));
    }
    account.is_active = true;
    account.updated_at = Utc::now();
    uow.update_account(&account).await?;
    info!(code = %account.code, "Account reactivated");
    Ok(Outcome::quiet(account))
}

async fn delete_account_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    account_id: AccountId,
) -> Result<Outcome<()>, LedgerError> {
    let mut account = in_scope(scope, uow.lock_account(account_id).await?, account_id)?;
    account.ensure_not_system()?;
    if !account.balance.is_zero() {
        return Err(LedgerError::AccountHasBalance {
            account_id: account.id.into_inner(),
            balance: account.balance,
        });
    }

    let tree = AccountTree::new(uow.accounts(scope).await?);
    if !tree.is_leaf(account.id) || uow.account_has_lines(account.id).await? {
        return Err(LedgerError::AccountInUse(account.id.into_inner()));
    }

    let now = Utc::now();
    account.deleted_at = Some(now);
    account.updated_at = now;
    uow.update_account(&account).await?;
    info!(code = %account.code, "Account deleted");
    Ok(Outcome::quiet(()))
}
