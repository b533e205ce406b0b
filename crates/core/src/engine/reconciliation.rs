//! Invoice and payment reconciliation.
//!
//! Allocations move amounts between payments and invoices only; they post no
//! journal entries.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{InvoiceId, Money, PaymentId, UserId};
use tracing::{debug, info};

use super::{LedgerEngine, Outcome, document_number, in_scope};
use crate::events::{DomainEvent, EventPayload};
use crate::ledger::LedgerError;
use crate::reconciliation::{
    Invoice, InvoiceLine, NewInvoice, NewPayment, Payment, PaymentAllocation, unallocated_amount,
};
use crate::scope::Scope;
use crate::store::{LedgerStore, SequenceKind, UnitOfWork};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Prices and stores a draft invoice.
    ///
    /// # Errors
    ///
    /// `InsufficientLines`, `InvalidDateRange`, `InvalidLine`, or `NotFound` /
    /// `CrossTenantReference` for a revenue account outside `scope`.
    pub async fn create_invoice(
        &self,
        scope: &Scope,
        input: NewInvoice,
        actor: UserId,
    ) -> Result<(Invoice, Vec<InvoiceLine>), LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = self.create_invoice_in(&mut uow, scope, input, actor).await;
        self.finish("create_invoice", uow, result).await
    }

    async fn create_invoice_in(
        &self,
        uow: &mut S::Uow,
        scope: &Scope,
        input: NewInvoice,
        actor: UserId,
    ) -> Result<Outcome<(Invoice, Vec<InvoiceLine>)>, LedgerError> {
        for account_id in input.lines.iter().filter_map(|l| l.account_id) {
            in_scope(scope, uow.account(account_id).await?, account_id)?;
        }
        let number = uow.next_number(scope, SequenceKind::Invoice).await?;
        let (invoice, lines) = Invoice::create(
            scope,
            document_number(&self.settings.invoice_prefix, number),
            input,
            actor,
            Utc::now(),
        )?;
        uow.insert_invoice(&invoice, &lines).await?;
        info!(
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Invoice created"
        );
        Ok(Outcome::quiet((invoice, lines)))
    }

    /// `Draft → Sent`.
    ///
    /// # Errors
    ///
    /// `InvoiceCancelled` or `InvalidState`.
    pub async fn send_invoice(
        &self,
        scope: &Scope,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = update_invoice_in(&mut uow, scope, invoice_id, "send", Invoice::send).await;
        self.finish("send_invoice", uow, result).await
    }

    /// Cancels an invoice nothing has been paid against.
    ///
    /// # Errors
    ///
    /// `InvoiceCancelled` or `InvalidState`.
    pub async fn cancel_invoice(
        &self,
        scope: &Scope,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result =
            update_invoice_in(&mut uow, scope, invoice_id, "cancel", Invoice::cancel).await;
        self.finish("cancel_invoice", uow, result).await
    }

    /// Marks sent and partially paid invoices due before `as_of` as overdue.
    ///
    /// Returns the invoices that changed.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn mark_overdue(
        &self,
        scope: &Scope,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = mark_overdue_in(&mut uow, scope, as_of).await;
        self.finish("mark_overdue", uow, result).await
    }

    /// Loads an invoice with its lines.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn get_invoice(
        &self,
        scope: &Scope,
        invoice_id: InvoiceId,
    ) -> Result<(Invoice, Vec<InvoiceLine>), LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = get_invoice_in(&mut uow, scope, invoice_id).await;
        self.read(uow, result).await
    }

    /// Allocations against an invoice, active and reversed, in allocation order.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn invoice_allocations(
        &self,
        scope: &Scope,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentAllocation>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = invoice_allocations_in(&mut uow, scope, invoice_id).await;
        self.read(uow, result).await
    }

    /// Records a completed, or pending, payment.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` unless the amount is positive.
    pub async fn record_payment(
        &self,
        scope: &Scope,
        input: NewPayment,
        actor: UserId,
    ) -> Result<Payment, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = self.record_payment_in(&mut uow, scope, input, actor).await;
        self.finish("record_payment", uow, result).await
    }

    async fn record_payment_in(
        &self,
        uow: &mut S::Uow,
        scope: &Scope,
        input: NewPayment,
        actor: UserId,
    ) -> Result<Outcome<Payment>, LedgerError> {
        if !input.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(input.amount));
        }
        let number = uow.next_number(scope, SequenceKind::Payment).await?;
        let payment = Payment::create(
            scope,
            document_number(&self.settings.payment_prefix, number),
            input,
            actor,
            Utc::now(),
        )?;
        uow.insert_payment(&payment).await?;
        info!(
            payment_number = %payment.payment_number,
            amount = %payment.amount,
            status = %payment.status,
            "Payment recorded"
        );
        Ok(Outcome::quiet(payment))
    }

    /// `Pending → Completed`.
    ///
    /// # Errors
    ///
    /// `InvalidState`.
    pub async fn complete_payment(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
    ) -> Result<Payment, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = complete_payment_in(&mut uow, scope, payment_id).await;
        self.finish("complete_payment", uow, result).await
    }

    /// Refunds a completed payment with no active allocations.
    ///
    /// # Errors
    ///
    /// `PaymentVoided`, `PaymentNotCompleted`, or `InvalidState` while allocated.
    pub async fn refund_payment(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
    ) -> Result<Payment, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = refund_payment_in(&mut uow, scope, payment_id).await;
        self.finish("refund_payment", uow, result).await
    }

    /// Loads a payment.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn get_payment(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
    ) -> Result<Payment, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .payment(payment_id)
            .await
            .and_then(|loaded| in_scope(scope, loaded, payment_id));
        self.read(uow, result).await
    }

    /// Amount of a payment not yet allocated.
    ///
    /// # Errors
    ///
    /// `NotFound` or `CrossTenantReference`.
    pub async fn unallocated_amount(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
    ) -> Result<Money, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = unallocated_in(&mut uow, scope, payment_id).await;
        self.read(uow, result).await
    }

    /// Applies `amount` of a payment to an invoice.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `OverAllocation`, `InvoiceCancelled`,
    /// `InvoiceNotPayable`, `PaymentVoided`, `PaymentNotCompleted`,
    /// `CustomerMismatch` or `CurrencyMismatch`.
    pub async fn allocate(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Money,
        actor: UserId,
    ) -> Result<PaymentAllocation, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = allocate_in(
            &mut uow,
            scope,
            payment_id,
            invoice_id,
            amount,
            actor,
            Utc::now(),
        )
        .await;
        self.finish("allocate", uow, result).await
    }

    /// Voids a completed payment, reversing every active allocation.
    ///
    /// Invoices left with nothing paid return to `sent`, or `overdue` when
    /// past due on the void date.
    ///
    /// # Errors
    ///
    /// `PaymentVoided` or `PaymentNotCompleted`.
    pub async fn void_payment(
        &self,
        scope: &Scope,
        payment_id: PaymentId,
        actor: UserId,
    ) -> Result<Payment, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = void_payment_in(&mut uow, scope, payment_id, actor, Utc::now()).await;
        self.finish("void_payment", uow, result).await
    }
}

async fn update_invoice_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    invoice_id: InvoiceId,
    action: &'static str,
    transition: fn(&mut Invoice, DateTime<Utc>) -> Result<(), LedgerError>,
) -> Result<Outcome<Invoice>, LedgerError> {
    let mut invoice = in_scope(scope, uow.lock_invoice(invoice_id).await?, invoice_id)?;
    transition(&mut invoice, Utc::now())?;
    uow.update_invoice(&invoice).await?;
    info!(invoice_number = %invoice.invoice_number, action, status = %invoice.status, "Invoice updated");
    Ok(Outcome::quiet(invoice))
}

async fn mark_overdue_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    as_of: NaiveDate,
) -> Result<Outcome<Vec<Invoice>>, LedgerError> {
    let now = Utc::now();
    let mut changed = Vec::new();
    for mut invoice in uow.lock_overdue_candidates(scope, as_of).await? {
        if invoice.mark_overdue(as_of, now) {
            uow.update_invoice(&invoice).await?;
            changed.push(invoice);
        }
    }
    if !changed.is_empty() {
        info!(count = changed.len(), as_of = %as_of, "Invoices marked overdue");
    }
    Ok(Outcome::quiet(changed))
}

async fn get_invoice_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    invoice_id: InvoiceId,
) -> Result<(Invoice, Vec<InvoiceLine>), LedgerError> {
    let invoice = in_scope(scope, uow.invoice(invoice_id).await?, invoice_id)?;
    let lines = uow.invoice_lines(invoice.id).await?;
    Ok((invoice, lines))
}

async fn invoice_allocations_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    invoice_id: InvoiceId,
) -> Result<Vec<PaymentAllocation>, LedgerError> {
    let invoice = in_scope(scope, uow.invoice(invoice_id).await?, invoice_id)?;
    uow.allocations_for_invoice(invoice.id).await
}

async fn complete_payment_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    payment_id: PaymentId,
) -> Result<Outcome<Payment>, LedgerError> {
    let mut payment = in_scope(scope, uow.lock_payment(payment_id).await?, payment_id)?;
    payment.complete(Utc::now())?;
    uow.update_payment(&payment).await?;
    info!(payment_number = %payment.payment_number, "Payment completed");
    Ok(Outcome::quiet(payment))
}

async fn refund_payment_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    payment_id: PaymentId,
) -> Result<Outcome<Payment>, LedgerError> {
    let mut payment = in_scope(scope, uow.lock_payment(payment_id).await?, payment_id)?;
    let allocations = uow.allocations_for_payment(payment.id).await?;
    payment.refund(&allocations, Utc::now())?;
    uow.update_payment(&payment).await?;
    info!(payment_number = %payment.payment_number, "Payment refunded");
    Ok(Outcome::quiet(payment))
}

async fn unallocated_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    payment_id: PaymentId,
) -> Result<Money, LedgerError> {
    let payment = in_scope(scope, uow.payment(payment_id).await?, payment_id)?;
    let allocations = uow.allocations_for_payment(payment.id).await?;
    Ok(unallocated_amount(&payment, &allocations))
}

async fn allocate_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    payment_id: PaymentId,
    invoice_id: InvoiceId,
    amount: Money,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Outcome<PaymentAllocation>, LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(amount));
    }

    // Payment before invoice, in every operation.
    let payment = in_scope(scope, uow.lock_payment(payment_id).await?, payment_id)?;
    payment.ensure_allocatable()?;
    let mut invoice = in_scope(scope, uow.lock_invoice(invoice_id).await?, invoice_id)?;
    payment.ensure_matches(&invoice)?;
    debug!(payment = %payment.payment_number, invoice = %invoice.invoice_number, "Allocation rows locked");

    let allocations = uow.allocations_for_payment(payment.id).await?;
    let available = unallocated_amount(&payment, &allocations);
    if amount > available {
        return Err(LedgerError::OverAllocation {
            requested: amount,
            available,
        });
    }

    invoice.apply_payment(amount, now)?;
    uow.update_invoice(&invoice).await?;
    let allocation = PaymentAllocation::new(&payment, invoice.id, amount, actor, now);
    uow.insert_allocation(&allocation).await?;

    info!(
        payment = %payment.payment_number,
        invoice = %invoice.invoice_number,
        amount = %amount,
        balance_due = %invoice.balance_due,
        status = %invoice.status,
        "Payment allocated"
    );
    let event = DomainEvent::new(
        *scope,
        now,
        EventPayload::PaymentAllocated {
            allocation_id: allocation.id,
            payment_id: payment.id,
            invoice_id: invoice.id,
            amount,
        },
    );
    Ok(Outcome::with_events(allocation, vec![event]))
}

async fn void_payment_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    payment_id: PaymentId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Outcome<Payment>, LedgerError> {
    let mut payment = in_scope(scope, uow.lock_payment(payment_id).await?, payment_id)?;
    payment.ensure_allocatable()?;

    let mut active: Vec<PaymentAllocation> = uow
        .allocations_for_payment(payment.id)
        .await?
        .into_iter()
        .filter(PaymentAllocation::is_active)
        .collect();
    active.sort_by_key(|a| (a.invoice_id, a.id));

    let as_of = now.date_naive();
    let mut invoice_ids = Vec::new();
    for allocation in &mut active {
        let invoice_id = allocation.invoice_id;
        let mut invoice = in_scope(scope, uow.lock_invoice(invoice_id).await?, invoice_id)?;
        invoice.remove_payment(allocation.amount, as_of, now)?;
        uow.update_invoice(&invoice).await?;

        allocation.reversed_at = Some(now);
        uow.update_allocation(allocation).await?;
        if !invoice_ids.contains(&invoice_id) {
            invoice_ids.push(invoice_id);
        }
    }

    payment.void(actor, now)?;
    uow.update_payment(&payment).await?;

    info!(
        payment_number = %payment.payment_number,
        allocations = active.len(),
        invoices = invoice_ids.len(),
        "Payment voided"
    );
    let event = DomainEvent::new(
        *scope,
        now,
        EventPayload::PaymentVoided {
            payment_id: payment.id,
            invoice_ids,
        },
    );
    Ok(Outcome::with_events(payment, vec![event]))
}
