//! Ledger engine.
//!
//! [`LedgerEngine`] runs every ledger operation inside one unit of work of its
//! [`LedgerStore`]: preconditions, the transition and derived balance updates
//! commit together or not at all. Domain events are published after commit.
//!
//! Operations are grouped by area:
//! - `journal`: drafts, posting and reversal
//! - `calendar`: fiscal years and periods
//! - `accounts`: chart of accounts maintenance
//! - `reconciliation`: invoices, payments and allocations
//! - `queries`: balances, trial balance and account ledgers

mod accounts;
mod calendar;
mod journal;
mod queries;
mod reconciliation;


use std::sync::Arc;

use folio_shared::config::LedgerConfig;
use tracing::{error, warn};
use uuid::Uuid;

use crate::events::{DomainEvent, EventPublisher, NoopPublisher};
use crate::ledger::{ErrorKind, LedgerError};
use crate::scope::{Scope, Scoped};
use crate::store::{LedgerStore, UnitOfWork};

/// Document numbering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Prefix of journal entry numbers.
    pub entry_prefix: String,
    /// Prefix of invoice numbers.
    pub invoice_prefix: String,
    /// Prefix of payment numbers.
    pub payment_prefix: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for EngineSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            entry_prefix: config.entry_number_prefix.clone(),
            invoice_prefix: config.invoice_number_prefix.clone(),
            payment_prefix: config.payment_number_prefix.clone(),
        }
    }
}

/// Formats a sequence value as a document number, e.g. `JE-000001`.
#[must_use]
pub fn document_number(prefix: &str, value: i64) -> String {
    format!("{prefix}-{value:06}")
}

/// Unwraps a loaded entity and checks it belongs to `scope`.
fn in_scope<T: Scoped>(
    scope: &Scope,
    loaded: Option<T>,
    id: impl Into<Uuid>,
) -> Result<T, LedgerError> {
    let entity = loaded.ok_or_else(|| LedgerError::not_found(T::ENTITY, id))?;
    scope.check(&entity)?;
    Ok(entity)
}

/// Result of an operation together with the events to publish once it commits.
struct Outcome<T> {
    value: T,
    events: Vec<DomainEvent>,
}

impl<T> Outcome<T> {
    fn quiet(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    fn with_events(value: T, events: Vec<DomainEvent>) -> Self {
        Self { value, events }
    }
}

/// Double-entry ledger engine over a [`LedgerStore`].
pub struct LedgerEngine<S> {
    store: S,
    events: Arc<dyn EventPublisher>,
    settings: EngineSettings,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an engine with default numbering that discards events.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            events: Arc::new(NoopPublisher),
            settings: EngineSettings::default(),
        }
    }

    /// Publishes committed events to `publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.events = publisher;
        self
    }

    /// Replaces the numbering settings.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Commits and publishes on success, rolls back on failure.
    async fn finish<T>(
        &self,
        operation: &'static str,
        uow: S::Uow,
        result: Result<Outcome<T>, LedgerError>,
    ) -> Result<T, LedgerError> {
        match result {
            Ok(outcome) => {
                uow.commit().await?;
                for event in outcome.events {
                    self.events.publish(event);
                }
                Ok(outcome.value)
            }
            Err(err) => {
                if err.kind() == ErrorKind::Infrastructure {
                    error!(operation, code = err.error_code(), error = %err, "Ledger operation failed");
                } else {
                    warn!(operation, code = err.error_code(), error = %err, "Ledger operation rejected");
                }
                if let Err(rollback) = uow.rollback().await {
                    error!(operation, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Ends a read-only unit of work.
    async fn read<T>(
        &self,
        uow: S::Uow,
        result: Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let released = uow.rollback().await;
        let value = result?;
        released?;
        Ok(value)
    }
}
