//! Fiscal year and period management.

pub mod calendar;
pub mod period;

pub use calendar::{
    PeriodRange, date_ranges_overlap, last_day_of_month, monthly_ranges, period_for_date,
    validate_date_range, validate_new_period,
};
pub use period::{FiscalPeriod, FiscalYear, PeriodStatus};
