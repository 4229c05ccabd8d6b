use chrono::{Datelike, NaiveDate};

use crate::error::{ServiceError, ServiceResult};

/// First and last calendar day of a month.
pub fn month_bounds(year: i32, month: u32) -> ServiceResult<(NaiveDate, NaiveDate)> {
    let invalid = || ServiceError::validation(format!("invalid period {}-{:02}", year, month));

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next.pred_opt().ok_or_else(invalid)?;

    Ok((first, last))
}

pub fn year_start(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

/// Every date in `[from, to]`, empty when `from > to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}
