use chrono::{DateTime, Utc};

use crate::{
    error::{HrError, HrResult},
    utils::calendar::Month,
};

pub mod admin;
pub mod attendance;
pub mod employee;
pub mod leave;
pub mod payroll;
pub mod salary;

/// `?month=YYYY-MM`, defaulting to the month of `now`.
pub(crate) fn month_or_current(month: Option<&str>, now: DateTime<Utc>) -> HrResult<Month> {
    match month {
        Some(raw) => raw.parse().map_err(|e: String| HrError::invalid("month", e)),
        None => Ok(Month::of(now.date_naive())),
    }
}
