//! Fiscal calendar operations.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{FiscalPeriodId, FiscalYearId, UserId};
use tracing::{debug, info};

use super::{LedgerEngine, Outcome, in_scope};
use crate::events::{DomainEvent, EventPayload};
use crate::fiscal::{
    FiscalPeriod, FiscalYear, PeriodStatus, date_ranges_overlap, monthly_ranges,
    validate_date_range, validate_new_period,
};
use crate::ledger::LedgerError;
use crate::scope::Scope;
use crate::store::{LedgerStore, UnitOfWork};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an open fiscal year.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange`, `DuplicateCode` or `OverlappingFiscalYear`.
    pub async fn create_fiscal_year(
        &self,
        scope: &Scope,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalYear, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = create_year_in(&mut uow, scope, code, start_date, end_date).await;
        self.finish("create_fiscal_year", uow, result).await
    }

    /// Appends a period to a year.
    ///
    /// # Errors
    ///
    /// `FiscalYearClosed`, `InvalidDateRange`, `PeriodOutsideYear`,
    /// `DuplicateCode` or `PeriodNotContiguous`.
    pub async fn add_period(
        &self,
        scope: &Scope,
        year_id: FiscalYearId,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = add_period_in(&mut uow, scope, year_id, code, start_date, end_date).await;
        self.finish("add_period", uow, result).await
    }

    /// Splits a year without periods into calendar months `P01`..`Pnn`.
    ///
    /// # Errors
    ///
    /// `FiscalYearClosed`, or `InvalidState` if the year already has periods.
    pub async fn generate_monthly_periods(
        &self,
        scope: &Scope,
        year_id: FiscalYearId,
    ) -> Result<Vec<FiscalPeriod>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = generate_periods_in(&mut uow, scope, year_id).await;
        self.finish("generate_monthly_periods", uow, result).await
    }

    /// The period of `scope` containing `date`.
    ///
    /// # Errors
    ///
    /// `NoFiscalPeriod`.
    pub async fn find_period_for_date(
        &self,
        scope: &Scope,
        date: NaiveDate,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .period_for_date(scope, date)
            .await
            .and_then(|period| period.ok_or(LedgerError::NoFiscalPeriod(date)));
        self.read(uow, result).await
    }

    /// Closes an open period with no draft entries dated inside it.
    ///
    /// # Errors
    ///
    /// `DraftEntriesInPeriod` or `AlreadyClosed`.
    pub async fn close_period(
        &self,
        scope: &Scope,
        period_id: FiscalPeriodId,
        actor: UserId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = close_period_in(&mut uow, scope, period_id, actor, Utc::now()).await;
        self.finish("close_period", uow, result).await
    }

    /// Reopens a closed period of an open year.
    ///
    /// # Errors
    ///
    /// `FiscalYearClosed`, `PeriodLocked`, or `InvalidState` for an open period.
    pub async fn open_period(
        &self,
        scope: &Scope,
        period_id: FiscalPeriodId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = open_period_in(&mut uow, scope, period_id).await;
        self.finish("open_period", uow, result).await
    }

    /// Locks a closed period for good.
    ///
    /// # Errors
    ///
    /// `InvalidState` for an open period, `PeriodLocked` if already locked.
    pub async fn lock_period(
        &self,
        scope: &Scope,
        period_id: FiscalPeriodId,
        actor: UserId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = lock_period_in(&mut uow, scope, period_id, actor).await;
        self.finish("lock_period", uow, result).await
    }

    /// Closes a year whose periods are all closed or locked.
    ///
    /// # Errors
    ///
    /// `AlreadyClosed` or `OpenPeriodsRemain`.
    pub async fn close_fiscal_year(
        &self,
        scope: &Scope,
        year_id: FiscalYearId,
        actor: UserId,
    ) -> Result<FiscalYear, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = close_year_in(&mut uow, scope, year_id, actor, Utc::now()).await;
        self.finish("close_fiscal_year", uow, result).await
    }
}

async fn create_year_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    code: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Outcome<FiscalYear>, LedgerError> {
    validate_date_range(start_date, end_date)?;
    let years = uow.fiscal_years(scope).await?;
    if years.iter().any(|y| y.code == code) {
        return Err(LedgerError::DuplicateCode(code.to_string()));
    }
    if let Some(existing) = years
        .iter()
        .find(|y| date_ranges_overlap(y.start_date, y.end_date, start_date, end_date))
    {
        return Err(LedgerError::OverlappingFiscalYear(existing.code.clone()));
    }

    let year = FiscalYear::create(scope, code.to_string(), start_date, end_date, Utc::now());
    uow.insert_fiscal_year(&year).await?;
    info!(code = %year.code, start = %start_date, end = %end_date, "Fiscal year created");
    Ok(Outcome::quiet(year))
}

async fn add_period_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    year_id: FiscalYearId,
    code: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Outcome<FiscalPeriod>, LedgerError> {
    let year = in_scope(scope, uow.lock_fiscal_year(year_id).await?, year_id)?;
    year.ensure_open()?;
    let existing = uow.periods_for_year(year.id).await?;
    validate_new_period(&year, &existing, code, start_date, end_date)?;

    let period = FiscalPeriod::create(&year, code.to_string(), start_date, end_date);
    uow.insert_fiscal_period(&period).await?;
    debug!(year = %year.code, period = %period.code, "Fiscal period added");
    Ok(Outcome::quiet(period))
}

async fn generate_periods_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    year_id: FiscalYearId,
) -> Result<Outcome<Vec<FiscalPeriod>>, LedgerError> {
    let year = in_scope(scope, uow.lock_fiscal_year(year_id).await?, year_id)?;
    year.ensure_open()?;
    if !uow.periods_for_year(year.id).await?.is_empty() {
        return Err(LedgerError::invalid_state(
            "fiscal_year",
            "has periods",
            "generate periods",
        ));
    }

    let mut periods = Vec::new();
    for range in monthly_ranges(year.start_date, year.end_date) {
        validate_new_period(&year, &periods, &range.code, range.start_date, range.end_date)?;
        let period = FiscalPeriod::create(&year, range.code, range.start_date, range.end_date);
        uow.insert_fiscal_period(&period).await?;
        periods.push(period);
    }
    info!(year = %year.code, periods = periods.len(), "Monthly periods generated");
    Ok(Outcome::quiet(periods))
}

async fn close_period_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    period_id: FiscalPeriodId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Outcome<FiscalPeriod>, LedgerError> {
    let mut period = in_scope(scope, uow.lock_fiscal_period(period_id).await?, period_id)?;
    if period.status == PeriodStatus::Open {
        let count = uow
            .count_draft_entries(scope, period.start_date, period.end_date)
            .await?;
        if count > 0 {
            return Err(LedgerError::DraftEntriesInPeriod { count });
        }
    }
    period.close(actor, now)?;
    uow.update_fiscal_period(&period).await?;

    info!(period = %period.code, "Fiscal period closed");
    let event = DomainEvent::new(
        *scope,
        now,
        EventPayload::PeriodClosed {
            period_id: period.id,
        },
    );
    Ok(Outcome::with_events(period, vec![event]))
}

async fn open_period_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    period_id: FiscalPeriodId,
) -> Result<Outcome<FiscalPeriod>, LedgerError> {
    let mut period = in_scope(scope, uow.lock_fiscal_period(period_id).await?, period_id)?;
    if period.status == PeriodStatus::Closed {
        let year_id = period.fiscal_year_id;
        let year = in_scope(scope, uow.lock_fiscal_year(year_id).await?, year_id)?;
        year.ensure_open()?;
    }
    period.reopen()?;
    uow.update_fiscal_period(&period).await?;
    info!(period = %period.code, "Fiscal period reopened");
    Ok(Outcome::quiet(period))
}

async fn lock_period_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    period_id: FiscalPeriodId,
    actor: UserId,
) -> Result<Outcome<FiscalPeriod>, LedgerError> {
    let mut period = in_scope(scope, uow.lock_fiscal_period(period_id).await?, period_id)?;
    period.lock(actor, Utc::now())?;
    uow.update_fiscal_period(&period).await?;
    info!(period = %period.code, "Fiscal period locked");
    Ok(Outcome::quiet(period))
}

async fn close_year_in<U: UnitOfWork>(
    uow: &mut U,
    scope: &Scope,
    year_id: FiscalYearId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Outcome<FiscalYear>, LedgerError> {
    let mut year = in_scope(scope, uow.lock_fiscal_year(year_id).await?, year_id)?;
    let periods = uow.periods_for_year(year.id).await?;
    year.close(&periods, actor, now)?;
    uow.update_fiscal_year(&year).await?;

    info!(year = %year.code, "Fiscal year closed");
    let event = DomainEvent::new(
        *scope,
        now,
        EventPayload::FiscalYearClosed {
            fiscal_year_id: year.id,
        },
    );
    Ok(Outcome::with_events(year, vec![event]))
}
