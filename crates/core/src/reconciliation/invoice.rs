//! Invoices and their payment-driven status machine.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, Currency, CustomerId, InvoiceId, InvoiceLineId, Money, OrganizationId, TenantId,
    UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;
use crate::scope::{Scope, impl_scoped};

/// Invoice status.
///
/// - Draft → Sent (send)
/// - Sent / PartiallyPaid / Overdue → PartiallyPaid / Paid (allocate)
/// - Sent / PartiallyPaid → Overdue (past due)
/// - Paid / PartiallyPaid / Overdue → Sent / Overdue / PartiallyPaid (void of a payment)
/// - Draft / Sent / Overdue → Cancelled (nothing paid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared, not yet payable.
    Draft,
    /// Issued to the customer.
    Sent,
    /// Some but not all of the total has been allocated.
    PartiallyPaid,
    /// Fully settled.
    Paid,
    /// Past its due date with a balance remaining.
    Overdue,
    /// Withdrawn (terminal).
    Cancelled,
}

impl InvoiceStatus {
    /// Returns true if the status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use InvoiceStatus::{Cancelled, Draft, Overdue, Paid, PartiallyPaid, Sent};
        match (self, next) {
            (Draft, Sent | Cancelled)
            | (Sent, PartiallyPaid | Paid | Overdue | Cancelled)
            | (PartiallyPaid, PartiallyPaid | Paid | Overdue | Sent)
            | (Overdue, PartiallyPaid | Paid | Sent | Cancelled)
            | (Paid, PartiallyPaid | Sent | Overdue) => true,
            (Draft, Draft | PartiallyPaid | Paid | Overdue)
            | (Sent, Draft | Sent)
            | (PartiallyPaid, Draft | Cancelled)
            | (Overdue, Draft | Overdue)
            | (Paid, Draft | Paid | Cancelled)
            | (Cancelled, _) => false,
        }
    }

    /// Returns true if payments may be allocated to an invoice in this status.
    #[must_use]
    pub fn is_payable(self) -> bool {
        matches!(self, Self::Sent | Self::PartiallyPaid | Self::Overdue)
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "partially_paid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier.
    pub id: InvoiceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Billed customer.
    pub customer_id: CustomerId,
    /// Human-readable number, unique per scope.
    pub invoice_number: String,
    /// Issue date.
    pub invoice_date: NaiveDate,
    /// Payment due date.
    pub due_date: NaiveDate,
    /// Currency tag.
    pub currency: Currency,
    /// Current status.
    pub status: InvoiceStatus,
    /// Sum of line subtotals.
    pub subtotal: Money,
    /// Sum of line taxes.
    pub tax_amount: Money,
    /// Sum of line discounts.
    pub discount_amount: Money,
    /// `subtotal + tax_amount - discount_amount`.
    pub total_amount: Money,
    /// Sum of active allocations.
    pub paid_amount: Money,
    /// `total_amount - paid_amount`.
    pub balance_due: Money,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the invoice was sent.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the invoice was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Creator.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl_scoped!(Invoice, "invoice");

/// A priced invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Unique identifier.
    pub id: InvoiceLineId,
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// 1-based position.
    pub line_number: u32,
    /// What was sold.
    pub description: String,
    /// Quantity sold.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Money,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    /// Discount rate in percent.
    pub discount_rate: Decimal,
    /// `quantity × unit_price`.
    pub line_subtotal: Money,
    /// `tax_rate` percent of the subtotal.
    pub line_tax: Money,
    /// `discount_rate` percent of the subtotal.
    pub line_discount: Money,
    /// `line_subtotal + line_tax - line_discount`.
    pub line_total: Money,
    /// Revenue account the line is booked against, if known.
    pub account_id: Option<AccountId>,
}

/// Input for one invoice line.
#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    /// What was sold.
    pub description: String,
    /// Quantity (must be positive).
    pub quantity: Decimal,
    /// Price per unit (must not be negative).
    pub unit_price: Money,
    /// Tax rate in percent, `0..=100`.
    pub tax_rate: Decimal,
    /// Discount rate in percent, `0..=100`.
    pub discount_rate: Decimal,
    /// Optional revenue account.
    pub account_id: Option<AccountId>,
}

impl NewInvoiceLine {
    /// A line without tax or discount.
    #[must_use]
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            tax_rate: Decimal::ZERO,
            discount_rate: Decimal::ZERO,
            account_id: None,
        }
    }

    /// Sets the tax rate.
    #[must_use]
    pub fn with_tax(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Sets the discount rate.
    #[must_use]
    pub fn with_discount(mut self, rate: Decimal) -> Self {
        self.discount_rate = rate;
        self
    }

    fn invalid(line_number: u32, reason: &str) -> LedgerError {
        LedgerError::InvalidLine {
            line_number,
            reason: reason.to_string(),
        }
    }

    /// Validates and prices the line.
    ///
    /// # Errors
    ///
    /// `InvalidLine` for a non-positive quantity, negative price or a rate
    /// outside `0..=100`; `Money` if a product does not fit.
    pub fn price(self, invoice_id: InvoiceId, line_number: u32) -> Result<InvoiceLine, LedgerError> {
        if self.quantity <= Decimal::ZERO {
            return Err(Self::invalid(line_number, "quantity must be positive"));
        }
        if self.unit_price.is_negative() {
            return Err(Self::invalid(line_number, "unit price cannot be negative"));
        }
        let valid_rate = |rate: Decimal| rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED;
        if !valid_rate(self.tax_rate) {
            return Err(Self::invalid(line_number, "tax rate must be between 0 and 100"));
        }
        if !valid_rate(self.discount_rate) {
            return Err(Self::invalid(
                line_number,
                "discount rate must be between 0 and 100",
            ));
        }

        let line_subtotal = self.unit_price.mul_quantity(self.quantity)?;
        let line_tax = line_subtotal.percentage(self.tax_rate)?;
        let line_discount = line_subtotal.percentage(self.discount_rate)?;

        Ok(InvoiceLine {
            id: InvoiceLineId::new(),
            invoice_id,
            line_number,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
            discount_rate: self.discount_rate,
            line_subtotal,
            line_tax,
            line_discount,
            line_total: line_subtotal + line_tax - line_discount,
            account_id: self.account_id,
        })
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Billed customer.
    pub customer_id: CustomerId,
    /// Issue date.
    pub invoice_date: NaiveDate,
    /// Due date, not before the issue date.
    pub due_date: NaiveDate,
    /// Currency tag.
    pub currency: Currency,
    /// Free-form notes.
    pub notes: Option<String>,
    /// At least one line.
    pub lines: Vec<NewInvoiceLine>,
}

impl Invoice {
    /// Prices the lines and builds a draft invoice with header totals.
    ///
    /// # Errors
    ///
    /// `InsufficientLines`, `InvalidDateRange`, or any line pricing error.
    pub fn create(
        scope: &Scope,
        invoice_number: String,
        input: NewInvoice,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Self, Vec<InvoiceLine>), LedgerError> {
        if input.lines.is_empty() {
            return Err(LedgerError::InsufficientLines {
                required: 1,
                actual: 0,
            });
        }
        if input.due_date < input.invoice_date {
            return Err(LedgerError::InvalidDateRange {
                start: input.invoice_date,
                end: input.due_date,
            });
        }

        let id = InvoiceId::new();
        let lines = input
            .lines
            .into_iter()
            .zip(1u32..)
            .map(|(line, n)| line.price(id, n))
            .collect::<Result<Vec<_>, _>>()?;

        let subtotal: Money = lines.iter().map(|l| l.line_subtotal).sum();
        let tax_amount: Money = lines.iter().map(|l| l.line_tax).sum();
        let discount_amount: Money = lines.iter().map(|l| l.line_discount).sum();
        let total_amount = subtotal + tax_amount - discount_amount;

        let invoice = Self {
            id,
            tenant_id: scope.tenant_id,
            organization_id: scope.organization_id,
            customer_id: input.customer_id,
            invoice_number,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            currency: input.currency,
            status: InvoiceStatus::Draft,
            subtotal,
            tax_amount,
            discount_amount,
            total_amount,
            paid_amount: Money::ZERO,
            balance_due: total_amount,
            notes: input.notes,
            sent_at: None,
            cancelled_at: None,
            created_by: actor,
            created_at: now,
            updated_at: now,
        };
        Ok((invoice, lines))
    }

    /// Returns true if the due date is before `as_of`.
    #[must_use]
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.due_date < as_of
    }

    /// Checks that payments may be allocated to this invoice.
    ///
    /// # Errors
    ///
    /// `InvoiceCancelled` or `InvoiceNotPayable`.
    pub fn ensure_payable(&self) -> Result<(), LedgerError> {
        match self.status {
            InvoiceStatus::Cancelled => Err(LedgerError::InvoiceCancelled(self.id.into_inner())),
            InvoiceStatus::Draft => Err(LedgerError::InvoiceNotPayable(self.id.into_inner())),
            InvoiceStatus::Sent
            | InvoiceStatus::PartiallyPaid
            | InvoiceStatus::Overdue
            | InvoiceStatus::Paid => Ok(()),
        }
    }

    /// Adds an allocated amount to `paid_amount` and settles the status.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `InvoiceCancelled`, `InvoiceNotPayable` or `OverAllocation`.
    pub fn apply_payment(&mut self, amount: Money, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.ensure_payable()?;
        if amount > self.balance_due {
            return Err(LedgerError::OverAllocation {
                requested: amount,
                available: self.balance_due,
            });
        }
        self.paid_amount += amount;
        self.balance_due = self.total_amount - self.paid_amount;
        self.status = if self.balance_due.is_zero() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.updated_at = now;
        Ok(())
    }

    /// Takes back a previously allocated amount.
    ///
    /// With nothing left paid the invoice returns to `sent`, or `overdue` if
    /// its due date is before `as_of`.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount` exceeds what was paid.
    pub fn remove_payment(
        &mut self,
        amount: Money,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if amount.is_negative() || amount > self.paid_amount {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.paid_amount -= amount;
        self.balance_due = self.total_amount - self.paid_amount;
        self.status = if !self.paid_amount.is_zero() {
            InvoiceStatus::PartiallyPaid
        } else if self.is_past_due(as_of) {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Sent
        };
        self.updated_at = now;
        Ok(())
    }

    /// `Draft → Sent`.
    ///
    /// # Errors
    ///
    /// `InvoiceCancelled` or `InvalidState`.
    pub fn send(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        match self.status {
            InvoiceStatus::Draft => {
                self.status = InvoiceStatus::Sent;
                self.sent_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            InvoiceStatus::Cancelled => Err(LedgerError::InvoiceCancelled(self.id.into_inner())),
            status => Err(LedgerError::invalid_state("invoice", status, "send")),
        }
    }

    /// Cancels an invoice nothing has been paid against.
    ///
    /// # Errors
    ///
    /// `InvoiceCancelled` if already cancelled, `InvalidState` once paid.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(LedgerError::InvoiceCancelled(self.id.into_inner()));
        }
        if !self.paid_amount.is_zero() || !self.status.can_transition_to(InvoiceStatus::Cancelled) {
            return Err(LedgerError::invalid_state("invoice", self.status, "cancel"));
        }
        self.status = InvoiceStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves a sent or partially paid invoice to `overdue` once past due.
    ///
    /// Returns true if the status changed.
    pub fn mark_overdue(&mut self, as_of: NaiveDate, now: DateTime<Utc>) -> bool {
        let eligible = matches!(
            self.status,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid
        );
        if eligible && self.is_past_due(as_of) {
            self.status = InvoiceStatus::Overdue;
            self.updated_at = now;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(value: Decimal) -> Money {
        Money::from_decimal(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(lines: Vec<NewInvoiceLine>) -> Result<(Invoice, Vec<InvoiceLine>), LedgerError> {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        Invoice::create(
            &scope,
            "INV-000001".into(),
            NewInvoice {
                customer_id: CustomerId::new(),
                invoice_date: date(2026, 3, 1),
                due_date: date(2026, 3, 31),
                currency: Currency::Usd,
                notes: None,
                lines,
            },
            UserId::new(),
            Utc::now(),
        )
    }

    fn sent(total: Decimal) -> Invoice {
        let (mut inv, _) = invoice(vec![NewInvoiceLine::new("Service", dec!(1), money(total))]).unwrap();
        inv.send(Utc::now()).unwrap();
        inv
    }

    #[test]
    fn test_line_pricing() {
        let (inv, lines) = invoice(vec![
            NewInvoiceLine::new("Widget", dec!(3), money(dec!(19.99)))
                .with_tax(dec!(11))
                .with_discount(dec!(5)),
            NewInvoiceLine::new("Setup", dec!(1), money(dec!(50))),
        ])
        .unwrap();

        assert_eq!(lines[0].line_subtotal, money(dec!(59.97)));
        // 11% of 59.97 = 6.5967, 5% = 2.9985
        assert_eq!(lines[0].line_tax, money(dec!(6.5967)));
        assert_eq!(lines[0].line_discount, money(dec!(2.9985)));
        assert_eq!(lines[0].line_total, money(dec!(63.5682)));
        assert_eq!(lines[1].line_number, 2);

        assert_eq!(inv.subtotal, money(dec!(109.97)));
        assert_eq!(inv.total_amount, inv.subtotal + inv.tax_amount - inv.discount_amount);
        assert_eq!(inv.balance_due, inv.total_amount);
        assert_eq!(inv.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_fractional_quantity_rounds_once() {
        let (_, lines) = invoice(vec![NewInvoiceLine::new(
            "Hours",
            dec!(1.333),
            money(dec!(0.0125)),
        )])
        .unwrap();
        // 1.333 × 0.0125 = 0.0166625 → 0.0167
        assert_eq!(lines[0].line_subtotal, money(dec!(0.0167)));
    }

    #[test]
    fn test_invalid_lines() {
        assert!(matches!(
            invoice(vec![]),
            Err(LedgerError::InsufficientLines { required: 1, actual: 0 })
        ));
        assert!(matches!(
            invoice(vec![NewInvoiceLine::new("x", dec!(0), money(dec!(1)))]),
            Err(LedgerError::InvalidLine { line_number: 1, .. })
        ));
        assert!(matches!(
            invoice(vec![
                NewInvoiceLine::new("ok", dec!(1), money(dec!(1))),
                NewInvoiceLine::new("x", dec!(1), money(dec!(1))).with_tax(dec!(101)),
            ]),
            Err(LedgerError::InvalidLine { line_number: 2, .. })
        ));
        assert!(matches!(
            invoice(vec![NewInvoiceLine::new("x", dec!(1), money(dec!(-1)))]),
            Err(LedgerError::InvalidLine { .. })
        ));
    }

    #[test]
    fn test_due_date_before_invoice_date() {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let result = Invoice::create(
            &scope,
            "INV-000002".into(),
            NewInvoice {
                customer_id: CustomerId::new(),
                invoice_date: date(2026, 3, 10),
                due_date: date(2026, 3, 1),
                currency: Currency::Usd,
                notes: None,
                lines: vec![NewInvoiceLine::new("x", dec!(1), money(dec!(1)))],
            },
            UserId::new(),
            Utc::now(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut inv = sent(dec!(150.00));

        inv.apply_payment(money(dec!(100.00)), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(inv.balance_due, money(dec!(50.00)));

        let err = inv.apply_payment(money(dec!(60.00)), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::OverAllocation { .. }));

        inv.apply_payment(money(dec!(50.00)), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(inv.balance_due.is_zero());
    }

    #[test]
    fn test_unpayable_states() {
        let (mut draft, _) = invoice(vec![NewInvoiceLine::new("x", dec!(1), money(dec!(10)))]).unwrap();
        assert!(matches!(
            draft.apply_payment(money(dec!(1)), Utc::now()),
            Err(LedgerError::InvoiceNotPayable(_))
        ));
        draft.cancel(Utc::now()).unwrap();
        assert!(matches!(
            draft.apply_payment(money(dec!(1)), Utc::now()),
            Err(LedgerError::InvoiceCancelled(_))
        ));
        assert!(matches!(
            draft.cancel(Utc::now()),
            Err(LedgerError::InvoiceCancelled(_))
        ));
    }

    #[test]
    fn test_remove_payment_restores_status() {
        let mut inv = sent(dec!(150.00));
        inv.apply_payment(money(dec!(150.00)), Utc::now()).unwrap();

        inv.remove_payment(money(dec!(50.00)), date(2026, 3, 15), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(inv.balance_due, money(dec!(50.00)));

        inv.remove_payment(money(dec!(100.00)), date(2026, 3, 15), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Sent);
        assert_eq!(inv.balance_due, inv.total_amount);

        inv.apply_payment(money(dec!(10.00)), Utc::now()).unwrap();
        inv.remove_payment(money(dec!(10.00)), date(2026, 4, 1), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Overdue);

        assert!(matches!(
            inv.remove_payment(money(dec!(1)), date(2026, 4, 1), Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_cancel_requires_nothing_paid() {
        let mut inv = sent(dec!(20));
        inv.apply_payment(money(dec!(5)), Utc::now()).unwrap();
        assert!(matches!(
            inv.cancel(Utc::now()),
            Err(LedgerError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_mark_overdue() {
        let mut inv = sent(dec!(20));
        assert!(!inv.mark_overdue(date(2026, 3, 31), Utc::now()));
        assert!(inv.mark_overdue(date(2026, 4, 1), Utc::now()));
        assert_eq!(inv.status, InvoiceStatus::Overdue);
        assert!(!inv.mark_overdue(date(2026, 4, 2), Utc::now()));

        inv.apply_payment(money(dec!(20)), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_send_only_from_draft() {
        let mut inv = sent(dec!(20));
        assert!(matches!(
            inv.send(Utc::now()),
            Err(LedgerError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Sent));
        assert!(InvoiceStatus::Paid.can_transition_to(InvoiceStatus::PartiallyPaid));
    }
}
