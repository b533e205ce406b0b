//! Account hierarchy as an arena keyed by id.
//!
//! Accounts reference their parent by id only. Children lists are derived when
//! the tree is built, and every traversal guards against revisiting a node so a
//! corrupted parent chain cannot loop forever.

use std::collections::{HashMap, HashSet};

use folio_shared::types::{AccountId, Money};

use super::account::Account;
use crate::ledger::LedgerError;

/// Read-only view over the accounts of one scope.
#[derive(Debug, Default)]
pub struct AccountTree {
    nodes: HashMap<AccountId, Account>,
    children: HashMap<AccountId, Vec<AccountId>>,
}

impl AccountTree {
    /// Builds the arena from a flat list of accounts.
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut tree = Self::default();
        for account in accounts {
            if let Some(parent_id) = account.parent_id {
                tree.children.entry(parent_id).or_default().push(account.id);
            }
            tree.nodes.insert(account.id, account);
        }
        for children in tree.children.values_mut() {
            children.sort();
        }
        tree
    }

    /// Looks up an account.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.nodes.get(&id)
    }

    /// Direct children of an account.
    #[must_use]
    pub fn children(&self, id: AccountId) -> &[AccountId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Returns true if the account has no children.
    #[must_use]
    pub fn is_leaf(&self, id: AccountId) -> bool {
        self.children(id).is_empty()
    }

    /// All descendants of an account, excluding the account itself.
    #[must_use]
    pub fn descendants(&self, id: AccountId) -> Vec<AccountId> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut stack: Vec<AccountId> = self.children(id).to_vec();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                out.push(next);
                stack.extend_from_slice(self.children(next));
            }
        }
        out
    }

    /// The account followed by all its descendants.
    #[must_use]
    pub fn subtree(&self, id: AccountId) -> Vec<AccountId> {
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        ids
    }

    /// Parent chain from the direct parent up to the root.
    #[must_use]
    pub fn ancestors(&self, id: AccountId) -> Vec<AccountId> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|a| a.parent_id);
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            out.push(parent_id);
            current = self.get(parent_id).and_then(|a| a.parent_id);
        }
        out
    }

    /// Sum of `own` over the account and all its descendants.
    #[must_use]
    pub fn rollup(&self, id: AccountId, own: impl Fn(&Account) -> Money) -> Money {
        self.subtree(id)
            .into_iter()
            .filter_map(|account_id| self.get(account_id))
            .map(own)
            .sum()
    }

    /// Validates a (re-)parenting of `account` under `new_parent`.
    ///
    /// # Errors
    ///
    /// - `CrossTenantReference` if the parent is in another tenant
    /// - `InvalidHierarchy` if the parent is in another organization, is the
    ///   account itself, or is one of its descendants
    pub fn validate_parent(
        &self,
        account: &Account,
        new_parent: Option<&Account>,
    ) -> Result<(), LedgerError> {
        let Some(parent) = new_parent else {
            return Ok(());
        };

        if parent.tenant_id != account.tenant_id {
            return Err(LedgerError::CrossTenantReference {
                entity: "account",
                id: parent.id.into_inner(),
            });
        }
        if parent.organization_id != account.organization_id {
            return Err(LedgerError::InvalidHierarchy(format!(
                "parent {} belongs to another organization",
                parent.code
            )));
        }
        if parent.id == account.id {
            return Err(LedgerError::InvalidHierarchy(format!(
                "account {} cannot be its own parent",
                account.code
            )));
        }
        if self.ancestors(parent.id).contains(&account.id) {
            return Err(LedgerError::InvalidHierarchy(format!(
                "moving {} under {} would create a cycle",
                account.code, parent.code
            )));
        }
        Ok(())
    }
}
