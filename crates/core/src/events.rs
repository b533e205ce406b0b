//! Outbound domain events.
//!
//! Events are published after the unit of work that produced them commits.
//! Publishing never blocks: a full channel drops the event with a warning.

use chrono::{DateTime, Utc};
use folio_shared::types::{
    FiscalPeriodId, FiscalYearId, InvoiceId, JournalEntryId, Money, PaymentAllocationId, PaymentId,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::scope::Scope;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A journal entry was posted.
    EntryPosted {
        /// Posted entry.
        entry_id: JournalEntryId,
        /// Its number.
        entry_number: String,
    },
    /// A journal entry was reversed.
    EntryReversed {
        /// Original entry.
        entry_id: JournalEntryId,
        /// Reversing entry.
        reversal_entry_id: JournalEntryId,
    },
    /// Part of a payment was applied to an invoice.
    PaymentAllocated {
        /// New allocation.
        allocation_id: PaymentAllocationId,
        /// Source payment.
        payment_id: PaymentId,
        /// Settled invoice.
        invoice_id: InvoiceId,
        /// Allocated amount.
        amount: Money,
    },
    /// A payment was voided and its allocations reversed.
    PaymentVoided {
        /// Voided payment.
        payment_id: PaymentId,
        /// Invoices whose allocations were reversed.
        invoice_ids: Vec<InvoiceId>,
    },
    /// A fiscal period was closed.
    PeriodClosed {
        /// Closed period.
        period_id: FiscalPeriodId,
    },
    /// A fiscal year was closed.
    FiscalYearClosed {
        /// Closed year.
        fiscal_year_id: FiscalYearId,
    },
}

impl EventPayload {
    /// Snake-case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EntryPosted { .. } => "entry_posted",
            Self::EntryReversed { .. } => "entry_reversed",
            Self::PaymentAllocated { .. } => "payment_allocated",
            Self::PaymentVoided { .. } => "payment_voided",
            Self::PeriodClosed { .. } => "period_closed",
            Self::FiscalYearClosed { .. } => "fiscal_year_closed",
        }
    }
}

/// An event together with the scope it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainEvent {
    /// Tenant and organization.
    pub scope: Scope,
    /// When the transition happened.
    pub occurred_at: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(scope: Scope, occurred_at: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            scope,
            occurred_at,
            payload,
        }
    }
}

/// Fire-and-forget event sink.
pub trait EventPublisher: Send + Sync {
    /// Hands the event over without waiting.
    fn publish(&self, event: DomainEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: DomainEvent) {}
}

/// Publishes into a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<DomainEvent>,
}

impl ChannelPublisher {
    /// Creates the publisher and the receiving half.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.sender.try_send(event) {
            let (reason, event) = match err {
                mpsc::error::TrySendError::Full(event) => ("full", event),
                mpsc::error::TrySendError::Closed(event) => ("closed", event),
            };
            warn!(
                event = event.payload.name(),
                scope = %event.scope,
                reason,
                "Dropping domain event"
            );
        }
    }
}
