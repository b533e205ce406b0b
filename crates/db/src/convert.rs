//! Conversions between `SeaORM` models and ledger domain types.
//!
//! Text columns holding statuses are parsed with the domain `parse` functions;
//! an unknown value is reported as a storage error rather than guessed.

use chrono::{DateTime, Utc};
use folio_core::chart::{Account, AccountType};
use folio_core::fiscal::{FiscalPeriod, FiscalYear, PeriodStatus};
use folio_core::ledger::{EntryStatus, JournalEntry, JournalLine, LedgerError, NormalBalance, PostedLine};
use folio_core::reconciliation::{
    Invoice, InvoiceLine, InvoiceStatus, Payment, PaymentAllocation, PaymentMethod, PaymentStatus,
};
use folio_shared::types::{Currency, Money};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{
    accounts, fiscal_periods, fiscal_years, invoice_lines, invoices, journal_entries,
    journal_lines, payment_allocations, payments,
};

fn money(value: Decimal) -> Result<Money, LedgerError> {
    Ok(Money::from_decimal(value)?)
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn utc_opt(value: Option<DateTimeWithTimeZone>) -> Option<DateTime<Utc>> {
    value.map(utc)
}

fn offset(value: DateTime<Utc>) -> DateTimeWithTimeZone {
    value.fixed_offset()
}

fn offset_opt(value: Option<DateTime<Utc>>) -> Option<DateTimeWithTimeZone> {
    value.map(offset)
}

fn currency(value: &str) -> Result<Currency, LedgerError> {
    value.parse().map_err(LedgerError::Storage)
}

fn parse_column<T>(
    column: &'static str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, LedgerError> {
    parse(value).ok_or_else(|| LedgerError::Storage(format!("unknown {column} value: {value}")))
}

fn line_number(value: i32) -> Result<u32, LedgerError> {
    u32::try_from(value).map_err(|_| LedgerError::Storage(format!("invalid line number: {value}")))
}

fn line_number_column(value: u32) -> Result<i32, LedgerError> {
    i32::try_from(value).map_err(|_| LedgerError::Storage(format!("line number too large: {value}")))
}

// ========== Accounts ==========

pub fn account(model: accounts::Model) -> Result<Account, LedgerError> {
    Ok(Account {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        parent_id: model.parent_id.map(Into::into),
        account_type: parse_column("account_type", &model.account_type, AccountType::parse)?,
        normal_balance: parse_column(
            "normal_balance",
            &model.normal_balance,
            NormalBalance::parse,
        )?,
        code: model.code,
        name: model.name,
        is_system: model.is_system,
        is_active: model.is_active,
        currency: currency(&model.currency)?,
        balance: money(model.balance)?,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
        deleted_at: utc_opt(model.deleted_at),
    })
}

pub fn account_model(account: &Account) -> accounts::Model {
    accounts::Model {
        id: account.id.into_inner(),
        tenant_id: account.tenant_id.into_inner(),
        organization_id: account.organization_id.into_inner(),
        parent_id: account.parent_id.map(Into::into),
        code: account.code.clone(),
        name: account.name.clone(),
        account_type: account.account_type.as_str().to_string(),
        normal_balance: account.normal_balance.as_str().to_string(),
        is_system: account.is_system,
        is_active: account.is_active,
        currency: account.currency.code().to_string(),
        balance: account.balance.as_decimal(),
        created_at: offset(account.created_at),
        updated_at: offset(account.updated_at),
        deleted_at: offset_opt(account.deleted_at),
    }
}

// ========== Fiscal calendar ==========

pub fn fiscal_year(model: fiscal_years::Model) -> FiscalYear {
    FiscalYear {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        code: model.code,
        start_date: model.start_date,
        end_date: model.end_date,
        is_closed: model.is_closed,
        closed_at: utc_opt(model.closed_at),
        closed_by: model.closed_by.map(Into::into),
        created_at: utc(model.created_at),
        deleted_at: utc_opt(model.deleted_at),
    }
}

pub fn fiscal_year_model(year: &FiscalYear) -> fiscal_years::Model {
    fiscal_years::Model {
        id: year.id.into_inner(),
        tenant_id: year.tenant_id.into_inner(),
        organization_id: year.organization_id.into_inner(),
        code: year.code.clone(),
        start_date: year.start_date,
        end_date: year.end_date,
        is_closed: year.is_closed,
        closed_at: offset_opt(year.closed_at),
        closed_by: year.closed_by.map(Into::into),
        created_at: offset(year.created_at),
        deleted_at: offset_opt(year.deleted_at),
    }
}

pub fn fiscal_period(model: fiscal_periods::Model) -> Result<FiscalPeriod, LedgerError> {
    Ok(FiscalPeriod {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        fiscal_year_id: model.fiscal_year_id.into(),
        status: parse_column("fiscal_period.status", &model.status, PeriodStatus::parse)?,
        code: model.code,
        start_date: model.start_date,
        end_date: model.end_date,
        closed_at: utc_opt(model.closed_at),
        closed_by: model.closed_by.map(Into::into),
        locked_at: utc_opt(model.locked_at),
        locked_by: model.locked_by.map(Into::into),
        deleted_at: utc_opt(model.deleted_at),
    })
}

pub fn fiscal_period_model(period: &FiscalPeriod) -> fiscal_periods::Model {
    fiscal_periods::Model {
        id: period.id.into_inner(),
        tenant_id: period.tenant_id.into_inner(),
        organization_id: period.organization_id.into_inner(),
        fiscal_year_id: period.fiscal_year_id.into_inner(),
        code: period.code.clone(),
        start_date: period.start_date,
        end_date: period.end_date,
        status: period.status.as_str().to_string(),
        closed_at: offset_opt(period.closed_at),
        closed_by: period.closed_by.map(Into::into),
        locked_at: offset_opt(period.locked_at),
        locked_by: period.locked_by.map(Into::into),
        deleted_at: offset_opt(period.deleted_at),
    }
}

// ========== Journal ==========

pub fn journal_entry(model: journal_entries::Model) -> Result<JournalEntry, LedgerError> {
    Ok(JournalEntry {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        fiscal_period_id: model.fiscal_period_id.map(Into::into),
        status: parse_column("journal_entry.status", &model.status, EntryStatus::parse)?,
        currency: currency(&model.currency)?,
        entry_number: model.entry_number,
        entry_date: model.entry_date,
        description: model.description,
        source_type: model.source_type,
        source_id: model.source_id,
        posted_at: utc_opt(model.posted_at),
        posted_by: model.posted_by.map(Into::into),
        reversed_at: utc_opt(model.reversed_at),
        reversed_by: model.reversed_by.map(Into::into),
        reversal_entry_id: model.reversal_entry_id.map(Into::into),
        reverses_entry_id: model.reverses_entry_id.map(Into::into),
        created_at: utc(model.created_at),
        created_by: model.created_by.into(),
        deleted_at: utc_opt(model.deleted_at),
    })
}

pub fn journal_entry_model(entry: &JournalEntry) -> journal_entries::Model {
    journal_entries::Model {
        id: entry.id.into_inner(),
        tenant_id: entry.tenant_id.into_inner(),
        organization_id: entry.organization_id.into_inner(),
        fiscal_period_id: entry.fiscal_period_id.map(Into::into),
        entry_number: entry.entry_number.clone(),
        entry_date: entry.entry_date,
        description: entry.description.clone(),
        currency: entry.currency.code().to_string(),
        status: entry.status.as_str().to_string(),
        source_type: entry.source_type.clone(),
        source_id: entry.source_id,
        posted_at: offset_opt(entry.posted_at),
        posted_by: entry.posted_by.map(Into::into),
        reversed_at: offset_opt(entry.reversed_at),
        reversed_by: entry.reversed_by.map(Into::into),
        reversal_entry_id: entry.reversal_entry_id.map(Into::into),
        reverses_entry_id: entry.reverses_entry_id.map(Into::into),
        created_at: offset(entry.created_at),
        created_by: entry.created_by.into_inner(),
        deleted_at: offset_opt(entry.deleted_at),
    }
}

pub fn journal_line(model: journal_lines::Model) -> Result<JournalLine, LedgerError> {
    Ok(JournalLine {
        id: model.id.into(),
        journal_entry_id: model.journal_entry_id.into(),
        account_id: model.account_id.into(),
        line_number: line_number(model.line_number)?,
        debit: money(model.debit)?,
        credit: money(model.credit)?,
        memo: model.memo,
    })
}

pub fn journal_line_model(line: &JournalLine) -> Result<journal_lines::Model, LedgerError> {
    Ok(journal_lines::Model {
        id: line.id.into_inner(),
        journal_entry_id: line.journal_entry_id.into_inner(),
        account_id: line.account_id.into_inner(),
        line_number: line_number_column(line.line_number)?,
        debit: line.debit.as_decimal(),
        credit: line.credit.as_decimal(),
        memo: line.memo.clone(),
    })
}

pub fn posted_line(
    line: journal_lines::Model,
    entry: journal_entries::Model,
) -> Result<PostedLine, LedgerError> {
    let posted_at = entry.posted_at.ok_or_else(|| {
        LedgerError::Storage(format!("entry {} has no posting time", entry.entry_number))
    })?;
    Ok(PostedLine {
        entry_number: entry.entry_number,
        entry_date: entry.entry_date,
        posted_at: utc(posted_at),
        line: journal_line(line)?,
    })
}

// ========== Invoices ==========

pub fn invoice(model: invoices::Model) -> Result<Invoice, LedgerError> {
    Ok(Invoice {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        customer_id: model.customer_id.into(),
        status: parse_column("invoice.status", &model.status, InvoiceStatus::parse)?,
        currency: currency(&model.currency)?,
        invoice_number: model.invoice_number,
        invoice_date: model.invoice_date,
        due_date: model.due_date,
        subtotal: money(model.subtotal)?,
        tax_amount: money(model.tax_amount)?,
        discount_amount: money(model.discount_amount)?,
        total_amount: money(model.total_amount)?,
        paid_amount: money(model.paid_amount)?,
        balance_due: money(model.balance_due)?,
        notes: model.notes,
        sent_at: utc_opt(model.sent_at),
        cancelled_at: utc_opt(model.cancelled_at),
        created_by: model.created_by.into(),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub fn invoice_model(invoice: &Invoice) -> invoices::Model {
    invoices::Model {
        id: invoice.id.into_inner(),
        tenant_id: invoice.tenant_id.into_inner(),
        organization_id: invoice.organization_id.into_inner(),
        customer_id: invoice.customer_id.into_inner(),
        invoice_number: invoice.invoice_number.clone(),
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        currency: invoice.currency.code().to_string(),
        status: invoice.status.as_str().to_string(),
        subtotal: invoice.subtotal.as_decimal(),
        tax_amount: invoice.tax_amount.as_decimal(),
        discount_amount: invoice.discount_amount.as_decimal(),
        total_amount: invoice.total_amount.as_decimal(),
        paid_amount: invoice.paid_amount.as_decimal(),
        balance_due: invoice.balance_due.as_decimal(),
        notes: invoice.notes.clone(),
        sent_at: offset_opt(invoice.sent_at),
        cancelled_at: offset_opt(invoice.cancelled_at),
        created_by: invoice.created_by.into_inner(),
        created_at: offset(invoice.created_at),
        updated_at: offset(invoice.updated_at),
    }
}

pub fn invoice_line(model: invoice_lines::Model) -> Result<InvoiceLine, LedgerError> {
    Ok(InvoiceLine {
        id: model.id.into(),
        invoice_id: model.invoice_id.into(),
        line_number: line_number(model.line_number)?,
        description: model.description,
        quantity: model.quantity,
        unit_price: money(model.unit_price)?,
        tax_rate: model.tax_rate,
        discount_rate: model.discount_rate,
        line_subtotal: money(model.line_subtotal)?,
        line_tax: money(model.line_tax)?,
        line_discount: money(model.line_discount)?,
        line_total: money(model.line_total)?,
        account_id: model.account_id.map(Into::into),
    })
}

pub fn invoice_line_model(line: &InvoiceLine) -> Result<invoice_lines::Model, LedgerError> {
    Ok(invoice_lines::Model {
        id: line.id.into_inner(),
        invoice_id: line.invoice_id.into_inner(),
        line_number: line_number_column(line.line_number)?,
        description: line.description.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price.as_decimal(),
        tax_rate: line.tax_rate,
        discount_rate: line.discount_rate,
        line_subtotal: line.line_subtotal.as_decimal(),
        line_tax: line.line_tax.as_decimal(),
        line_discount: line.line_discount.as_decimal(),
        line_total: line.line_total.as_decimal(),
        account_id: line.account_id.map(Into::into),
    })
}

// ========== Payments ==========

pub fn payment(model: payments::Model) -> Result<Payment, LedgerError> {
    Ok(Payment {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        customer_id: model.customer_id.into(),
        status: parse_column("payment.status", &model.status, PaymentStatus::parse)?,
        method: parse_column("payment.method", &model.method, PaymentMethod::parse)?,
        currency: currency(&model.currency)?,
        amount: money(model.amount)?,
        payment_number: model.payment_number,
        payment_date: model.payment_date,
        reference: model.reference,
        voided_at: utc_opt(model.voided_at),
        voided_by: model.voided_by.map(Into::into),
        created_by: model.created_by.into(),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub fn payment_model(payment: &Payment) -> payments::Model {
    payments::Model {
        id: payment.id.into_inner(),
        tenant_id: payment.tenant_id.into_inner(),
        organization_id: payment.organization_id.into_inner(),
        customer_id: payment.customer_id.into_inner(),
        payment_number: payment.payment_number.clone(),
        payment_date: payment.payment_date,
        amount: payment.amount.as_decimal(),
        currency: payment.currency.code().to_string(),
        method: payment.method.as_str().to_string(),
        reference: payment.reference.clone(),
        status: payment.status.as_str().to_string(),
        voided_at: offset_opt(payment.voided_at),
        voided_by: payment.voided_by.map(Into::into),
        created_by: payment.created_by.into_inner(),
        created_at: offset(payment.created_at),
        updated_at: offset(payment.updated_at),
    }
}

pub fn allocation(model: payment_allocations::Model) -> Result<PaymentAllocation, LedgerError> {
    Ok(PaymentAllocation {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        organization_id: model.organization_id.into(),
        payment_id: model.payment_id.into(),
        invoice_id: model.invoice_id.into(),
        amount: money(model.amount)?,
        allocated_at: utc(model.allocated_at),
        allocated_by: model.allocated_by.into(),
        reversed_at: utc_opt(model.reversed_at),
    })
}

pub fn allocation_model(allocation: &PaymentAllocation) -> payment_allocations::Model {
    payment_allocations::Model {
        id: allocation.id.into_inner(),
        tenant_id: allocation.tenant_id.into_inner(),
        organization_id: allocation.organization_id.into_inner(),
        payment_id: allocation.payment_id.into_inner(),
        invoice_id: allocation.invoice_id.into_inner(),
        amount: allocation.amount.as_decimal(),
        allocated_at: offset(allocation.allocated_at),
        allocated_by: allocation.allocated_by.into_inner(),
        reversed_at: offset_opt(allocation.reversed_at),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use folio_core::Scope;
    use folio_core::chart::NewAccount;
    use folio_shared::types::{OrganizationId, TenantId};
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_account_survives_model_conversion() {
        let scope = Scope::new(TenantId::new(), OrganizationId::new());
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let mut original = Account::create(
            &scope,
            NewAccount::new("1000", "Cash", AccountType::Asset, Currency::Eur),
            now,
        );
        original.balance = Money::from_decimal(dec!(1234.5678)).unwrap();

        let restored = account(account_model(&original)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_unknown_status_is_a_storage_error() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap().fixed_offset();
        let model = fiscal_periods::Model {
            id: uuid::Uuid::now_v7(),
            tenant_id: uuid::Uuid::now_v7(),
            organization_id: uuid::Uuid::now_v7(),
            fiscal_year_id: uuid::Uuid::now_v7(),
            code: "P01".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            status: "SOFT_CLOSE".to_string(),
            closed_at: Some(now),
            closed_by: None,
            locked_at: None,
            locked_by: None,
            deleted_at: None,
        };

        let err = fiscal_period(model).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(msg) if msg.contains("SOFT_CLOSE")));
    }

    #[test]
    fn test_excess_precision_is_rejected() {
        assert!(money(dec!(1.23456)).is_err());
        assert_eq!(money(dec!(1.5)).unwrap(), Money::from_minor_units(15_000));
    }
}
