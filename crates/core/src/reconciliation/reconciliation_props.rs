//! Property-based tests for invoice totals and payment allocation.

use chrono::{NaiveDate, Utc};
use folio_shared::types::{Currency, CustomerId, Money, OrganizationId, TenantId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::invoice::{Invoice, NewInvoice, NewInvoiceLine};
use super::payment::{NewPayment, Payment, PaymentAllocation, PaymentMethod, unallocated_amount};
use crate::ledger::LedgerError;
use crate::scope::Scope;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap_or_default()
}

/// Strategy for invoice lines: quantity with up to 3 decimals, price up to 1000.0000.
fn arb_line(max_tax: i64, max_discount: i64) -> impl Strategy<Value = NewInvoiceLine> {
    (
        1i64..1_000_000i64,
        0i64..10_000_000i64,
        0i64..=max_tax,
        0i64..=max_discount,
    )
        .prop_map(|(qty, price, tax, discount)| {
            NewInvoiceLine::new("Item", Decimal::new(qty, 3), Money::from_minor_units(price))
                .with_tax(Decimal::from(tax))
                .with_discount(Decimal::from(discount))
        })
}

fn build_invoice(customer_id: CustomerId, lines: Vec<NewInvoiceLine>) -> Invoice {
    let scope = Scope::new(TenantId::new(), OrganizationId::new());
    let (invoice, _) = Invoice::create(
        &scope,
        "INV-000001".into(),
        NewInvoice {
            customer_id,
            invoice_date: date(1),
            due_date: date(31),
            currency: Currency::Usd,
            notes: None,
            lines,
        },
        UserId::new(),
        Utc::now(),
    )
    .expect("generated lines are valid");
    invoice
}

/// An allocate (`true`) or take-back (`false`) of an amount in minor units.
fn arb_ops() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 1i64..5_000_000i64), 1..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Header totals are the sums of priced lines**
    #[test]
    fn prop_invoice_totals_identity(lines in prop::collection::vec(arb_line(100, 100), 1..6)) {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let (invoice, priced) = Invoice::create(
            &scope,
            "INV-000001".into(),
            NewInvoice {
                customer_id: CustomerId::new(),
                invoice_date: date(1),
                due_date: date(31),
                currency: Currency::Usd,
                notes: None,
                lines,
            },
            UserId::new(),
            Utc::now(),
        ).expect("generated lines are valid");

        prop_assert_eq!(
            invoice.total_amount,
            invoice.subtotal + invoice.tax_amount - invoice.discount_amount
        );
        prop_assert_eq!(invoice.balance_due, invoice.total_amount);
        let line_totals: Money = priced.iter().map(|l| l.line_total).sum();
        prop_assert_eq!(line_totals, invoice.total_amount);
        for line in &priced {
            prop_assert_eq!(line.line_total, line.line_subtotal + line.line_tax - line.line_discount);
        }
    }

    /// **Property 2: balance_due == total_amount - paid_amount after every allocate or void**
    #[test]
    fn prop_balance_due_identity(
        lines in prop::collection::vec(arb_line(30, 50), 1..4),
        ops in arb_ops(),
    ) {
        let mut invoice = build_invoice(CustomerId::new(), lines);
        invoice.send(Utc::now()).expect("draft can be sent");

        for (allocate, units) in ops {
            let amount = Money::from_minor_units(units);
            let before = invoice.clone();
            let result = if allocate {
                invoice.apply_payment(amount, Utc::now())
            } else {
                invoice.remove_payment(amount, date(15), Utc::now())
            };
            match result {
                Ok(()) => {}
                Err(LedgerError::OverAllocation { .. } | LedgerError::InvalidAmount(_)) => {
                    prop_assert_eq!(&invoice, &before);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert_eq!(invoice.balance_due, invoice.total_amount - invoice.paid_amount);
            prop_assert!(!invoice.paid_amount.is_negative());
            prop_assert!(invoice.paid_amount <= invoice.total_amount);
        }
    }

    /// **Property 3: Allocations never exceed the payment amount**
    #[test]
    fn prop_allocations_within_payment(
        payment_units in 1i64..10_000_000i64,
        requests in prop::collection::vec(1i64..5_000_000i64, 1..10),
    ) {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let customer_id = CustomerId::new();
        let payment = Payment::create(
            &scope,
            "PAY-000001".into(),
            NewPayment {
                customer_id,
                payment_date: date(5),
                amount: Money::from_minor_units(payment_units),
                currency: Currency::Usd,
                method: PaymentMethod::Cash,
                reference: None,
                pending: false,
            },
            UserId::new(),
            Utc::now(),
        ).expect("positive amount");

        let mut allocations: Vec<PaymentAllocation> = Vec::new();
        for units in requests {
            let amount = Money::from_minor_units(units);
            let remaining = unallocated_amount(&payment, &allocations);
            if amount <= remaining {
                allocations.push(PaymentAllocation::new(
                    &payment,
                    folio_shared::types::InvoiceId::new(),
                    amount,
                    UserId::new(),
                    Utc::now(),
                ));
            }
            prop_assert!(!unallocated_amount(&payment, &allocations).is_negative());
        }
        let allocated: Money = allocations.iter().map(|a| a.amount).sum();
        prop_assert!(allocated <= payment.amount);
    }
}

mod unit_tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_discount_yields_zero_total() {
        let invoice = build_invoice(
            CustomerId::new(),
            vec![
                NewInvoiceLine::new("Gift", dec!(2), Money::from_minor_units(50_000))
                    .with_discount(dec!(100)),
            ],
        );
        assert!(invoice.total_amount.is_zero());
        assert_eq!(invoice.discount_amount, invoice.subtotal);
    }
}
