//! Fiscal calendar rules: date ranges, contiguity and monthly period generation.

use chrono::{Datelike, NaiveDate};

use super::period::{FiscalPeriod, FiscalYear};
use crate::ledger::LedgerError;

/// Validates that start_date is strictly before end_date.
///
/// # Errors
///
/// `InvalidDateRange`.
pub fn validate_date_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), LedgerError> {
    if start_date >= end_date {
        return Err(LedgerError::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }
    Ok(())
}

/// Checks if two date ranges overlap.
///
/// Two ranges [a_start, a_end] and [b_start, b_end] overlap if:
/// a_start <= b_end AND a_end >= b_start
#[must_use]
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Validates a new period against its year and the year's existing periods.
///
/// The first period must start on the year's start date and each following
/// period the day after the previous one ends. Periods may not extend past the
/// year's end date.
///
/// # Errors
///
/// `InvalidDateRange`, `PeriodOutsideYear`, `PeriodNotContiguous` or `DuplicateCode`.
pub fn validate_new_period(
    year: &FiscalYear,
    existing: &[FiscalPeriod],
    code: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), LedgerError> {
    if start_date > end_date {
        return Err(LedgerError::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }
    if !year.contains_date(start_date) || !year.contains_date(end_date) {
        return Err(LedgerError::PeriodOutsideYear {
            start: start_date,
            end: end_date,
        });
    }
    if existing.iter().any(|p| p.code == code) {
        return Err(LedgerError::DuplicateCode(code.to_string()));
    }

    let expected = match existing.iter().map(|p| p.end_date).max() {
        Some(last_end) => last_end.succ_opt().unwrap_or(last_end),
        None => year.start_date,
    };
    if start_date != expected {
        return Err(LedgerError::PeriodNotContiguous {
            expected,
            actual: start_date,
        });
    }
    Ok(())
}

/// Finds the period containing `date`.
#[must_use]
pub fn period_for_date(periods: &[FiscalPeriod], date: NaiveDate) -> Option<&FiscalPeriod> {
    periods.iter().find(|p| p.contains_date(date))
}

/// A generated period range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRange {
    /// Period code (`P01`, `P02`, ...).
    pub code: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
}

/// Generates calendar-month periods covering `[start_date, end_date]`.
///
/// The first and last ranges are clipped to the year boundaries, so a year
/// starting mid-month still produces contiguous periods.
#[must_use]
pub fn monthly_ranges(start_date: NaiveDate, end_date: NaiveDate) -> Vec<PeriodRange> {
    let mut ranges = Vec::new();
    let mut current = start_date;
    let mut period_number: u32 = 1;

    while current <= end_date {
        let month_end = last_day_of_month(current.year(), current.month());
        let period_end = if month_end > end_date {
            end_date
        } else {
            month_end
        };

        ranges.push(PeriodRange {
            code: format!("P{period_number:02}"),
            start_date: current,
            end_date: period_end,
        });

        match period_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
        period_number += 1;
    }

    ranges
}

/// Returns the last day of a month.
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
