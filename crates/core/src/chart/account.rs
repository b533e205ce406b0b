//! Chart of accounts entries.

use std::fmt;

use chrono::{DateTime, Utc};
use folio_shared::types::{AccountId, Currency, Money, OrganizationId, TenantId};
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerError, NormalBalance};
use crate::scope::{Scope, impl_scoped};

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset account (debit-normal).
    Asset,
    /// Liability account (credit-normal).
    Liability,
    /// Equity account (credit-normal).
    Equity,
    /// Revenue account (credit-normal).
    Revenue,
    /// Expense account (debit-normal).
    Expense,
}

impl AccountType {
    /// The side that increases accounts of this type.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    /// Parses an account type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account in the chart.
///
/// `balance` only reflects lines posted directly against this account; parent
/// totals are rolled up on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Parent account, if any.
    pub parent_id: Option<AccountId>,
    /// Code, unique per tenant and organization.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Derived from `account_type`.
    pub normal_balance: NormalBalance,
    /// System accounts cannot be deactivated or deleted.
    pub is_system: bool,
    /// Inactive accounts reject postings.
    pub is_active: bool,
    /// Currency tag.
    pub currency: Currency,
    /// Running balance of directly posted lines.
    pub balance: Money,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_scoped!(Account, "account");

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Code, unique per scope.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Optional parent.
    pub parent_id: Option<AccountId>,
    /// Currency tag.
    pub currency: Currency,
    /// Protect against deactivation and deletion.
    pub is_system: bool,
}

impl NewAccount {
    /// A non-system account without a parent.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            currency,
            is_system: false,
        }
    }

    /// Sets the parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Marks the account as a system account.
    #[must_use]
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

impl Account {
    /// Builds an active, zero-balance account in `scope`.
    #[must_use]
    pub fn create(scope: &Scope, input: NewAccount, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            tenant_id: scope.tenant_id,
            organization_id: scope.organization_id,
            parent_id: input.parent_id,
            code: input.code,
            name: input.name,
            account_type: input.account_type,
            normal_balance: input.account_type.normal_balance(),
            is_system: input.is_system,
            is_active: true,
            currency: input.currency,
            balance: Money::ZERO,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Checks that lines may be posted against this account.
    ///
    /// # Errors
    ///
    /// `InactiveAccount`.
    pub fn ensure_postable(&self) -> Result<(), LedgerError> {
        if self.is_active {
            Ok(())
        } else {
            Err(LedgerError::InactiveAccount(self.id.into_inner()))
        }
    }

    /// Checks that the account is not a system account.
    ///
    /// # Errors
    ///
    /// `SystemAccountProtected`.
    pub fn ensure_not_system(&self) -> Result<(), LedgerError> {
        if self.is_system {
            Err(LedgerError::SystemAccountProtected(self.id.into_inner()))
        } else {
            Ok(())
        }
    }

    /// Moves the stored balance by a precomputed normal-balance delta.
    pub fn apply_delta(&mut self, delta: Money, now: DateTime<Utc>) {
        self.balance += delta;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_balance_follows_type() {
        assert_eq!(AccountType::Asset.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountType::Equity.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountType::Revenue.normal_balance(), NormalBalance::Credit);
    }

    #[test]
    fn test_create_account() {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let account = Account::create(
            &scope,
            NewAccount::new("1000", "Cash", AccountType::Asset, Currency::Usd).system(),
            Utc::now(),
        );
        assert!(account.is_active);
        assert!(account.is_system);
        assert!(account.balance.is_zero());
        assert_eq!(account.normal_balance, NormalBalance::Debit);
        assert!(scope.check(&account).is_ok());
        assert!(matches!(
            account.ensure_not_system(),
            Err(LedgerError::SystemAccountProtected(_))
        ));
    }

    #[test]
    fn test_inactive_account_rejects_postings() {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let mut account = Account::create(
            &scope,
            NewAccount::new("4000", "Sales", AccountType::Revenue, Currency::Usd),
            Utc::now(),
        );
        assert!(account.ensure_postable().is_ok());
        account.is_active = false;
        assert!(matches!(
            account.ensure_postable(),
            Err(LedgerError::InactiveAccount(_))
        ));
    }
}
