//! Payments and their allocations against invoices.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    Currency, CustomerId, InvoiceId, Money, OrganizationId, PaymentAllocationId, PaymentId,
    TenantId, UserId,
};
use serde::{Deserialize, Serialize};

use super::invoice::Invoice;
use crate::ledger::LedgerError;
use crate::scope::{Scope, impl_scoped};

/// Payment status.
///
/// - Pending → Completed (complete)
/// - Completed → Voided (void)
/// - Completed → Refunded (refund, nothing allocated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Received but not cleared.
    Pending,
    /// Cleared and allocatable.
    Completed,
    /// Cancelled; its allocations have been reversed.
    Voided,
    /// Returned to the customer.
    Refunded,
}

impl PaymentStatus {
    /// Returns true if the status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Completed) | (Self::Completed, Self::Voided | Self::Refunded) => {
                true
            }
            (Self::Pending, Self::Pending | Self::Voided | Self::Refunded)
            | (Self::Completed, Self::Pending | Self::Completed)
            | (Self::Voided | Self::Refunded, _) => false,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Voided => "voided",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "voided" => Some(Self::Voided),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Card.
    Card,
    /// Cheque.
    Cheque,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Cheque => "cheque",
            Self::Other => "other",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "card" => Some(Self::Card),
            "cheque" => Some(Self::Cheque),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A customer payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier.
    pub id: PaymentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Paying customer.
    pub customer_id: CustomerId,
    /// Human-readable number, unique per scope.
    pub payment_number: String,
    /// Date received.
    pub payment_date: NaiveDate,
    /// Amount received (positive).
    pub amount: Money,
    /// Currency tag.
    pub currency: Currency,
    /// Payment method.
    pub method: PaymentMethod,
    /// External reference (bank reference, cheque number).
    pub reference: Option<String>,
    /// Current status.
    pub status: PaymentStatus,
    /// When the payment was voided.
    pub voided_at: Option<DateTime<Utc>>,
    /// Who voided it.
    pub voided_by: Option<UserId>,
    /// Creator.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl_scoped!(Payment, "payment");

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Paying customer.
    pub customer_id: CustomerId,
    /// Date received.
    pub payment_date: NaiveDate,
    /// Amount received.
    pub amount: Money,
    /// Currency tag.
    pub currency: Currency,
    /// Payment method.
    pub method: PaymentMethod,
    /// External reference.
    pub reference: Option<String>,
    /// Record as `pending` instead of `completed`.
    pub pending: bool,
}

impl Payment {
    /// Builds a payment record.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` unless the amount is positive.
    pub fn create(
        scope: &Scope,
        payment_number: String,
        input: NewPayment,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if !input.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(input.amount));
        }
        Ok(Self {
            id: PaymentId::new(),
            tenant_id: scope.tenant_id,
            organization_id: scope.organization_id,
            customer_id: input.customer_id,
            payment_number,
            payment_date: input.payment_date,
            amount: input.amount,
            currency: input.currency,
            method: input.method,
            reference: input.reference,
            status: if input.pending {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Completed
            },
            voided_at: None,
            voided_by: None,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    /// Checks that the payment can be allocated.
    ///
    /// # Errors
    ///
    /// `PaymentVoided` for voided or refunded payments, `PaymentNotCompleted` for pending ones.
    pub fn ensure_allocatable(&self) -> Result<(), LedgerError> {
        match self.status {
            PaymentStatus::Completed => Ok(()),
            PaymentStatus::Pending => Err(LedgerError::PaymentNotCompleted(self.id.into_inner())),
            PaymentStatus::Voided | PaymentStatus::Refunded => {
                Err(LedgerError::PaymentVoided(self.id.into_inner()))
            }
        }
    }

    /// Checks that the payment can settle `invoice`.
    ///
    /// # Errors
    ///
    /// `CustomerMismatch` or `CurrencyMismatch`.
    pub fn ensure_matches(&self, invoice: &Invoice) -> Result<(), LedgerError> {
        if self.customer_id != invoice.customer_id {
            return Err(LedgerError::CustomerMismatch);
        }
        if self.currency != invoice.currency {
            return Err(LedgerError::CurrencyMismatch {
                payment: self.currency.code().to_string(),
                invoice: invoice.currency.code().to_string(),
            });
        }
        Ok(())
    }

    /// `Pending → Completed`.
    ///
    /// # Errors
    ///
    /// `InvalidState`.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(PaymentStatus::Completed) {
            return Err(LedgerError::invalid_state("payment", self.status, "complete"));
        }
        self.status = PaymentStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    /// `Completed → Voided`. The caller reverses the allocations first.
    ///
    /// # Errors
    ///
    /// `PaymentVoided` or `PaymentNotCompleted`.
    pub fn void(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_allocatable()?;
        self.status = PaymentStatus::Voided;
        self.voided_at = Some(now);
        self.voided_by = Some(actor);
        self.updated_at = now;
        Ok(())
    }

    /// `Completed → Refunded` when nothing is allocated.
    ///
    /// # Errors
    ///
    /// `PaymentVoided`, `PaymentNotCompleted`, or `InvalidState` while
    /// allocations are active.
    pub fn refund(
        &mut self,
        allocations: &[PaymentAllocation],
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_allocatable()?;
        if allocations.iter().any(PaymentAllocation::is_active) {
            return Err(LedgerError::invalid_state("payment", "allocated", "refund"));
        }
        self.status = PaymentStatus::Refunded;
        self.updated_at = now;
        Ok(())
    }
}

/// Part of a payment applied to one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Unique identifier.
    pub id: PaymentAllocationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Source payment.
    pub payment_id: PaymentId,
    /// Settled invoice.
    pub invoice_id: InvoiceId,
    /// Allocated amount.
    pub amount: Money,
    /// When it was allocated.
    pub allocated_at: DateTime<Utc>,
    /// Who allocated it.
    pub allocated_by: UserId,
    /// Set when a void takes the allocation back.
    pub reversed_at: Option<DateTime<Utc>>,
}

impl_scoped!(PaymentAllocation, "payment_allocation");

impl PaymentAllocation {
    /// Builds an active allocation.
    #[must_use]
    pub fn new(
        payment: &Payment,
        invoice_id: InvoiceId,
        amount: Money,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentAllocationId::new(),
            tenant_id: payment.tenant_id,
            organization_id: payment.organization_id,
            payment_id: payment.id,
            invoice_id,
            amount,
            allocated_at: now,
            allocated_by: actor,
            reversed_at: None,
        }
    }

    /// Returns true until the allocation is reversed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.reversed_at.is_none()
    }
}

/// Amount of `payment` not yet allocated to any invoice.
#[must_use]
pub fn unallocated_amount(payment: &Payment, allocations: &[PaymentAllocation]) -> Money {
    let allocated: Money = allocations
        .iter()
        .filter(|a| a.payment_id == payment.id && a.is_active())
        .map(|a| a.amount)
        .sum();
    payment.amount - allocated
}
