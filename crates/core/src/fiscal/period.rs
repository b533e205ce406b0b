//! Fiscal year and period types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{FiscalPeriodId, FiscalYearId, OrganizationId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;
use crate::scope::{Scope, impl_scoped};

/// Fiscal year definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// Unique identifier.
    pub id: FiscalYearId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Year code (e.g., "FY2026"), unique per scope.
    pub code: String,
    /// Start date of the fiscal year.
    pub start_date: NaiveDate,
    /// End date of the fiscal year (inclusive).
    pub end_date: NaiveDate,
    /// Closed years are terminal.
    pub is_closed: bool,
    /// When the year was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who closed it.
    pub closed_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_scoped!(FiscalYear, "fiscal_year");

impl FiscalYear {
    /// Builds an open fiscal year in `scope`.
    #[must_use]
    pub fn create(
        scope: &Scope,
        code: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: FiscalYearId::new(),
            tenant_id: scope.tenant_id,
            organization_id: scope.organization_id,
            code,
            start_date,
            end_date,
            is_closed: false,
            closed_at: None,
            closed_by: None,
            created_at: now,
            deleted_at: None,
        }
    }

    /// Returns true if the given date falls within this year.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Checks that the year still accepts changes to its periods.
    ///
    /// # Errors
    ///
    /// `FiscalYearClosed`.
    pub fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.is_closed {
            Err(LedgerError::FiscalYearClosed(self.id.into_inner()))
        } else {
            Ok(())
        }
    }

    /// Closes the year once every period is closed or locked.
    ///
    /// # Errors
    ///
    /// `AlreadyClosed` or `OpenPeriodsRemain`.
    pub fn close(
        &mut self,
        periods: &[FiscalPeriod],
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.is_closed {
            return Err(LedgerError::AlreadyClosed {
                entity: "fiscal_year",
                id: self.id.into_inner(),
            });
        }
        let open = periods
            .iter()
            .filter(|p| p.status == PeriodStatus::Open)
            .count();
        if open > 0 {
            return Err(LedgerError::OpenPeriodsRemain { count: open });
        }
        self.is_closed = true;
        self.closed_at = Some(at);
        self.closed_by = Some(actor);
        Ok(())
    }
}

/// Status of a fiscal period.
///
/// `Open ⇄ Closed → Locked`; `Locked` is terminal for normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Period is open for postings.
    Open,
    /// Period is closed, no new postings; may be reopened.
    Closed,
    /// Period is locked, no changes allowed.
    Locked,
}

impl PeriodStatus {
    /// Returns true if the status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Open, Self::Closed) | (Self::Closed, Self::Open | Self::Locked) => true,
            (Self::Open, Self::Open | Self::Locked)
            | (Self::Closed, Self::Closed)
            | (Self::Locked, _) => false,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Locked => "locked",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fiscal period within a fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Unique identifier.
    pub id: FiscalPeriodId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Fiscal year this period belongs to.
    pub fiscal_year_id: FiscalYearId,
    /// Period code (e.g., "P01"), unique within the year.
    pub code: String,
    /// Start date of the period.
    pub start_date: NaiveDate,
    /// End date of the period (inclusive).
    pub end_date: NaiveDate,
    /// Current status.
    pub status: PeriodStatus,
    /// When the period was last closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who closed it.
    pub closed_by: Option<UserId>,
    /// When the period was locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// Who locked it.
    pub locked_by: Option<UserId>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_scoped!(FiscalPeriod, "fiscal_period");

impl FiscalPeriod {
    /// Builds an open period of `year`.
    #[must_use]
    pub fn create(year: &FiscalYear, code: String, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: FiscalPeriodId::new(),
            tenant_id: year.tenant_id,
            organization_id: year.organization_id,
            fiscal_year_id: year.id,
            code,
            start_date,
            end_date,
            status: PeriodStatus::Open,
            closed_at: None,
            closed_by: None,
            locked_at: None,
            locked_by: None,
            deleted_at: None,
        }
    }

    /// Returns true if transactions can be posted to this period.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// `Open → Closed`.
    ///
    /// # Errors
    ///
    /// `AlreadyClosed` unless the period is open.
    pub fn close(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(PeriodStatus::Closed) {
            return Err(LedgerError::AlreadyClosed {
                entity: "fiscal_period",
                id: self.id.into_inner(),
            });
        }
        self.status = PeriodStatus::Closed;
        self.closed_at = Some(at);
        self.closed_by = Some(actor);
        Ok(())
    }

    /// `Closed → Open`. The caller checks that the year is not closed.
    ///
    /// # Errors
    ///
    /// `InvalidState` if already open, `PeriodLocked` if locked.
    pub fn reopen(&mut self) -> Result<(), LedgerError> {
        match self.status {
            PeriodStatus::Closed => {
                self.status = PeriodStatus::Open;
                self.closed_at = None;
                self.closed_by = None;
                Ok(())
            }
            PeriodStatus::Open => Err(LedgerError::invalid_state(
                "fiscal_period",
                self.status,
                "reopen",
            )),
            PeriodStatus::Locked => Err(LedgerError::PeriodLocked(self.id.into_inner())),
        }
    }

    /// `Closed → Locked`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if open, `PeriodLocked` if already locked.
    pub fn lock(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), LedgerError> {
        match self.status {
            PeriodStatus::Closed => {
                self.status = PeriodStatus::Locked;
                self.locked_at = Some(at);
                self.locked_by = Some(actor);
                Ok(())
            }
            PeriodStatus::Open => Err(LedgerError::invalid_state(
                "fiscal_period",
                self.status,
                "lock",
            )),
            PeriodStatus::Locked => Err(LedgerError::PeriodLocked(self.id.into_inner())),
        }
    }
}
