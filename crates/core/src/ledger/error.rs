//! Ledger error types.
//!
//! Every failure of a ledger operation is one of these variants. Each variant belongs
//! to exactly one [`ErrorKind`], which tells the caller whether to fix the input,
//! re-fetch and retry, or give up.

use chrono::NaiveDate;
use folio_shared::AppError;
use folio_shared::types::{Money, MoneyError};
use thiserror::Error;
use uuid::Uuid;

/// Broad category of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is malformed; surfaced, never retried.
    Validation,
    /// The target is in the wrong state; re-fetch before retrying.
    StateConflict,
    /// A structural or tenancy rule would break; fatal for the request.
    Integrity,
    /// The referenced entity does not exist (or is soft-deleted).
    NotFound,
    /// Storage, timeout or serialization failure.
    Infrastructure,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry debits and credits differ.
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit.
        debit: Money,
        /// Total credit.
        credit: Money,
    },

    /// Too few lines for the document.
    #[error("At least {required} lines are required, got {actual}")]
    InsufficientLines {
        /// Minimum line count.
        required: usize,
        /// Supplied line count.
        actual: usize,
    },

    /// A line is malformed.
    #[error("Line {line_number} is invalid: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line_number: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// Amount must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Money),

    /// Allocation exceeds what is available.
    #[error("Cannot allocate {requested}: only {available} is available")]
    OverAllocation {
        /// Requested amount.
        requested: Money,
        /// Remaining amount on the payment or invoice.
        available: Money,
    },

    /// Account parent is not allowed.
    #[error("Invalid account hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Start date is not before end date.
    #[error("Invalid date range: {start} to {end}")]
    InvalidDateRange {
        /// Range start.
        start: NaiveDate,
        /// Range end.
        end: NaiveDate,
    },

    /// Period range lies outside its fiscal year.
    #[error("Period {start} to {end} lies outside its fiscal year")]
    PeriodOutsideYear {
        /// Period start.
        start: NaiveDate,
        /// Period end.
        end: NaiveDate,
    },

    /// Period does not start where the previous one ended.
    #[error("Period must start on {expected}, got {actual}")]
    PeriodNotContiguous {
        /// Required start date.
        expected: NaiveDate,
        /// Supplied start date.
        actual: NaiveDate,
    },

    /// Fiscal year overlaps another year.
    #[error("Fiscal year overlaps with existing year: {0}")]
    OverlappingFiscalYear(String),

    /// Code is already used in this scope.
    #[error("Code already exists: {0}")]
    DuplicateCode(String),

    /// Payment and invoice belong to different customers.
    #[error("Payment and invoice belong to different customers")]
    CustomerMismatch,

    /// Payment and invoice use different currencies.
    #[error("Payment currency {payment} does not match invoice currency {invoice}")]
    CurrencyMismatch {
        /// Payment currency code.
        payment: String,
        /// Invoice currency code.
        invoice: String,
    },

    /// Amount cannot be represented as money.
    #[error(transparent)]
    Money(#[from] MoneyError),

    // ========== State Conflict Errors ==========
    /// Entry is already posted.
    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(Uuid),

    /// Entry is already reversed.
    #[error("Journal entry {0} is already reversed")]
    AlreadyReversed(Uuid),

    /// Entry has not been posted.
    #[error("Journal entry {0} is not posted")]
    NotPosted(Uuid),

    /// Generic forbidden transition.
    #[error("Cannot {action} {entity} in status {status}")]
    InvalidState {
        /// Entity name.
        entity: &'static str,
        /// Current status.
        status: String,
        /// Attempted action.
        action: &'static str,
    },

    /// No open period accepts postings on this date.
    #[error("Fiscal period for {date} is closed")]
    PeriodClosed {
        /// Entry date.
        date: NaiveDate,
    },

    /// Period is locked.
    #[error("Fiscal period {0} is locked")]
    PeriodLocked(Uuid),

    /// No period covers the date.
    #[error("No fiscal period found for date {0}")]
    NoFiscalPeriod(NaiveDate),

    /// Target is already closed.
    #[error("{entity} {id} is already closed")]
    AlreadyClosed {
        /// Entity name.
        entity: &'static str,
        /// Entity id.
        id: Uuid,
    },

    /// The fiscal year is closed.
    #[error("Fiscal year {0} is closed")]
    FiscalYearClosed(Uuid),

    /// Fiscal year still has open periods.
    #[error("{count} fiscal periods are still open")]
    OpenPeriodsRemain {
        /// Open period count.
        count: usize,
    },

    /// Period still has draft entries.
    #[error("{count} draft entries are dated inside the period")]
    DraftEntriesInPeriod {
        /// Draft entry count.
        count: u64,
    },

    /// Invoice is cancelled.
    #[error("Invoice {0} is cancelled")]
    InvoiceCancelled(Uuid),

    /// Invoice has not been sent.
    #[error("Invoice {0} is not payable")]
    InvoiceNotPayable(Uuid),

    /// Payment is voided or refunded.
    #[error("Payment {0} is voided")]
    PaymentVoided(Uuid),

    /// Payment is still pending.
    #[error("Payment {0} is not completed")]
    PaymentNotCompleted(Uuid),

    /// Account is inactive.
    #[error("Account {0} is inactive")]
    InactiveAccount(Uuid),

    // ========== Integrity Errors ==========
    /// Account subtree still carries a balance.
    #[error("Account {account_id} has balance {balance}")]
    AccountHasBalance {
        /// Account carrying the balance.
        account_id: Uuid,
        /// Its balance.
        balance: Money,
    },

    /// Entity belongs to another tenant or organization.
    #[error("{entity} {id} belongs to another tenant or organization")]
    CrossTenantReference {
        /// Entity name.
        entity: &'static str,
        /// Entity id.
        id: Uuid,
    },

    /// System accounts cannot be changed this way.
    #[error("Account {0} is a system account")]
    SystemAccountProtected(Uuid),

    /// Account is still referenced.
    #[error("Account {0} is still in use")]
    AccountInUse(Uuid),

    // ========== Not Found ==========
    /// Entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Entity id.
        id: Uuid,
    },

    // ========== Infrastructure Errors ==========
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The unit of work did not finish in time.
    #[error("Operation timed out")]
    Timeout,

    /// Concurrent transaction conflict detected by the store.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,
}

impl LedgerError {
    /// Shorthand for `NotFound`.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for `InvalidState`.
    #[must_use]
    pub fn invalid_state(entity: &'static str, status: impl ToString, action: &'static str) -> Self {
        Self::InvalidState {
            entity,
            status: status.to_string(),
            action,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnbalancedEntry { .. }
            | Self::InsufficientLines { .. }
            | Self::InvalidLine { .. }
            | Self::InvalidAmount(_)
            | Self::OverAllocation { .. }
            | Self::InvalidHierarchy(_)
            | Self::InvalidDateRange { .. }
            | Self::PeriodOutsideYear { .. }
            | Self::PeriodNotContiguous { .. }
            | Self::OverlappingFiscalYear(_)
            | Self::DuplicateCode(_)
            | Self::CustomerMismatch
            | Self::CurrencyMismatch { .. }
            | Self::Money(_) => ErrorKind::Validation,

            Self::AlreadyPosted(_)
            | Self::AlreadyReversed(_)
            | Self::NotPosted(_)
            | Self::InvalidState { .. }
            | Self::PeriodClosed { .. }
            | Self::PeriodLocked(_)
            | Self::NoFiscalPeriod(_)
            | Self::AlreadyClosed { .. }
            | Self::FiscalYearClosed(_)
            | Self::OpenPeriodsRemain { .. }
            | Self::DraftEntriesInPeriod { .. }
            | Self::InvoiceCancelled(_)
            | Self::InvoiceNotPayable(_)
            | Self::PaymentVoided(_)
            | Self::PaymentNotCompleted(_)
            | Self::InactiveAccount(_) => ErrorKind::StateConflict,

            Self::AccountHasBalance { .. }
            | Self::CrossTenantReference { .. }
            | Self::SystemAccountProtected(_)
            | Self::AccountInUse(_) => ErrorKind::Integrity,

            Self::NotFound { .. } => ErrorKind::NotFound,

            Self::Storage(_) | Self::Timeout | Self::ConcurrentModification => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::InsufficientLines { .. } => "INSUFFICIENT_LINES",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::OverAllocation { .. } => "OVER_ALLOCATION",
            Self::InvalidHierarchy(_) => "INVALID_HIERARCHY",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::PeriodOutsideYear { .. } => "PERIOD_OUTSIDE_YEAR",
            Self::PeriodNotContiguous { .. } => "PERIOD_NOT_CONTIGUOUS",
            Self::OverlappingFiscalYear(_) => "OVERLAPPING_FISCAL_YEAR",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::CustomerMismatch => "CUSTOMER_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::Money(_) => "INVALID_MONEY",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::PeriodLocked(_) => "PERIOD_LOCKED",
            Self::NoFiscalPeriod(_) => "NO_FISCAL_PERIOD",
            Self::AlreadyClosed { .. } => "ALREADY_CLOSED",
            Self::FiscalYearClosed(_) => "FISCAL_YEAR_CLOSED",
            Self::OpenPeriodsRemain { .. } => "OPEN_PERIODS_REMAIN",
            Self::DraftEntriesInPeriod { .. } => "DRAFT_ENTRIES_IN_PERIOD",
            Self::InvoiceCancelled(_) => "INVOICE_CANCELLED",
            Self::InvoiceNotPayable(_) => "INVOICE_NOT_PAYABLE",
            Self::PaymentVoided(_) => "PAYMENT_VOIDED",
            Self::PaymentNotCompleted(_) => "PAYMENT_NOT_COMPLETED",
            Self::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            Self::AccountHasBalance { .. } => "ACCOUNT_HAS_BALANCE",
            Self::CrossTenantReference { .. } => "CROSS_TENANT_REFERENCE",
            Self::SystemAccountProtected(_) => "SYSTEM_ACCOUNT_PROTECTED",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::StateConflict => 409,
            ErrorKind::Integrity => 422,
            ErrorKind::Infrastructure => match self {
                Self::Timeout => 503,
                Self::ConcurrentModification => 409,
                _ => 500,
            },
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Domain errors never are; only a serialization conflict reported by the store is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::StateConflict => Self::Conflict(message),
            ErrorKind::Integrity => Self::Integrity(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Infrastructure => match err {
                LedgerError::Timeout => Self::Timeout(message),
                LedgerError::ConcurrentModification => Self::Conflict(message),
                _ => Self::Database(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(value: rust_decimal::Decimal) -> Money {
        Money::from_decimal(value).unwrap()
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::UnbalancedEntry {
                debit: money(dec!(100)),
                credit: money(dec!(99.99)),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::PeriodClosed {
                date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
            }
            .error_code(),
            "PERIOD_CLOSED"
        );
        assert_eq!(LedgerError::Timeout.error_code(), "TIMEOUT");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(LedgerError::CustomerMismatch.kind(), ErrorKind::Validation);
        assert_eq!(
            LedgerError::AlreadyPosted(Uuid::nil()).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            LedgerError::SystemAccountProtected(Uuid::nil()).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            LedgerError::not_found("account", Uuid::nil()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::Storage("boom".into()).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::CustomerMismatch.http_status_code(), 400);
        assert_eq!(
            LedgerError::not_found("invoice", Uuid::nil()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::NoFiscalPeriod(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
                .http_status_code(),
            409
        );
        assert_eq!(LedgerError::AccountInUse(Uuid::nil()).http_status_code(), 422);
        assert_eq!(LedgerError::Timeout.http_status_code(), 503);
        assert_eq!(LedgerError::Storage("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::Timeout.is_retryable());
        assert!(!LedgerError::AlreadyPosted(Uuid::nil()).is_retryable());
        assert!(!LedgerError::CustomerMismatch.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::UnbalancedEntry {
            debit: money(dec!(100.00)),
            credit: money(dec!(99.99)),
        };
        assert_eq!(
            err.to_string(),
            "Entry is not balanced. Debit: 100.0000, Credit: 99.9900"
        );

        let err = LedgerError::invalid_state("invoice", "paid", "cancel");
        assert_eq!(err.to_string(), "Cannot cancel invoice in status paid");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::AlreadyPosted(Uuid::nil()).into();
        assert_eq!(app.error_code(), "CONFLICT");

        let app: AppError = LedgerError::Timeout.into();
        assert_eq!(app.status_code(), 503);

        let app: AppError = LedgerError::not_found("payment", Uuid::nil()).into();
        assert_eq!(app.status_code(), 404);
    }
}
