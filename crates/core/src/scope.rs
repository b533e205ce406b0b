//! Tenant and organization scoping.
//!
//! Every ledger operation receives an explicit [`Scope`]. Entities loaded by id are
//! checked against it and rejected, never silently filtered, when they belong elsewhere.

use std::fmt;

use folio_shared::types::{OrganizationId, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerError;

/// The tenant and organization an operation runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Organization within the tenant.
    pub organization_id: OrganizationId,
}

impl Scope {
    /// Creates a scope.
    #[must_use]
    pub const fn new(tenant_id: TenantId, organization_id: OrganizationId) -> Self {
        Self {
            tenant_id,
            organization_id,
        }
    }

    /// Verifies that an entity belongs to this scope.
    ///
    /// # Errors
    ///
    /// Returns `CrossTenantReference` if the tenant or organization differs.
    pub fn check<T: Scoped>(&self, entity: &T) -> Result<(), LedgerError> {
        if entity.scope() == *self {
            Ok(())
        } else {
            Err(LedgerError::CrossTenantReference {
                entity: T::ENTITY,
                id: entity.entity_id(),
            })
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.organization_id)
    }
}

/// An entity owned by a tenant and organization.
pub trait Scoped {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// The scope that owns this entity.
    fn scope(&self) -> Scope;

    /// The entity's identifier.
    fn entity_id(&self) -> Uuid;
}

/// Implements [`Scoped`] for a struct with `id`, `tenant_id` and `organization_id` fields.
macro_rules! impl_scoped {
    ($ty:ty, $name:literal) => {
        impl $crate::scope::Scoped for $ty {
            const ENTITY: &'static str = $name;

            fn scope(&self) -> $crate::scope::Scope {
                $crate::scope::Scope::new(self.tenant_id, self.organization_id)
            }

            fn entity_id(&self) -> uuid::Uuid {
                self.id.into_inner()
            }
        }
    };
}

pub(crate) use impl_scoped;
