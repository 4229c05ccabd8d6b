//! Monthly attendance and leave facts per employee.
//!
//! Everything here is re-derived from the source records on each call and
//! nothing is written back, so calling [`FactAggregator::aggregate`] twice
//! over unchanged data gives the same answer.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::attendance::classify;
use super::office_hours::OfficeHoursPolicy;
use super::settings::SettingsService;
use crate::error::ServiceResult;
use crate::model::attendance::{AttendanceFacts, AttendanceRecord, AttendanceStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::payroll::validate_period;
use crate::model::settings::PayrollSettings;
use crate::store::{self, Filter, SharedStore};
use crate::utils::dates::{days_between, month_bounds, year_start};

#[derive(Clone)]
pub struct FactAggregator {
    store: SharedStore,
    settings: SettingsService,
    policy: Arc<dyn OfficeHoursPolicy>,
}

impl FactAggregator {
    pub fn new(store: SharedStore, settings: SettingsService, policy: Arc<dyn OfficeHoursPolicy>) -> Self {
        Self {
            store,
            settings,
            policy,
        }
    }

    pub async fn aggregate(&self, employee_id: &str, month: u32, year: i32) -> ServiceResult<AttendanceFacts> {
        let settings = self.settings.load().await?;
        self.aggregate_with(employee_id, month, year, &settings).await
    }

    /// Same as [`aggregate`](Self::aggregate) with settings the caller already loaded.
    pub async fn aggregate_with(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
        settings: &PayrollSettings,
    ) -> ServiceResult<AttendanceFacts> {
        validate_period(month, year)?;
        let (first, last) = month_bounds(year, month)?;

        let records: Vec<AttendanceRecord> =
            store::fetch_all(self.store.as_ref(), &[Filter::eq("employee_id", employee_id)]).await?;
        let leaves: Vec<LeaveRequest> = store::fetch_all(
            self.store.as_ref(),
            &[
                Filter::eq("employee_id", employee_id),
                Filter::eq("status", LeaveStatus::Approved.to_string()),
            ],
        )
        .await?;

        let leave_dates = approved_leave_dates(&leaves, first, last);
        let mut facts = tally_attendance(&records, &leave_dates, first, last, self.policy.as_ref(), settings);
        facts.unpaid_leave_days = count_unpaid_leave_days(&leaves, settings, first, last);
        Ok(facts)
    }
}

fn approved_leave_dates(leaves: &[LeaveRequest], first: NaiveDate, last: NaiveDate) -> HashSet<NaiveDate> {
    leaves
        .iter()
        .filter(|l| l.status() == LeaveStatus::Approved)
        .flat_map(|l| days_between(l.start_date.max(first), l.end_date.min(last)))
        .collect()
}

/// Counts attendance inside `[first, last]`. Present days include late and
/// half days; absences on approved-leave dates are not counted.
pub fn tally_attendance(
    records: &[AttendanceRecord],
    leave_dates: &HashSet<NaiveDate>,
    first: NaiveDate,
    last: NaiveDate,
    policy: &dyn OfficeHoursPolicy,
    settings: &PayrollSettings,
) -> AttendanceFacts {
    let mut facts = AttendanceFacts::default();

    for record in records.iter().filter(|r| r.date >= first && r.date <= last) {
        match classify(record.date, record.check_in, record.check_out, policy, settings) {
            AttendanceStatus::Present => facts.present_days += 1,
            AttendanceStatus::Late => {
                facts.present_days += 1;
                facts.late_days += 1;
            }
            AttendanceStatus::HalfDay => {
                facts.present_days += 1;
                facts.half_days += 1;
            }
            AttendanceStatus::Absent if leave_dates.contains(&record.date) => {}
            AttendanceStatus::Absent => facts.absent_days += 1,
        }
    }

    facts
}

/// Unpaid leave days falling inside `[first, last]`.
///
/// Casual and sick days draw down their annual allotment in date order from
/// January 1st of the period's year; days past the allotment are unpaid, and
/// `unpaid` leave is always unpaid.
pub fn count_unpaid_leave_days(
    leaves: &[LeaveRequest],
    settings: &PayrollSettings,
    first: NaiveDate,
    last: NaiveDate,
) -> u32 {
    let from = year_start(first);

    let mut approved: Vec<&LeaveRequest> = leaves
        .iter()
        .filter(|l| l.status() == LeaveStatus::Approved)
        .collect();
    approved.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let mut casual_left = settings.annual_casual_leave_days;
    let mut sick_left = settings.annual_sick_leave_days;
    let mut unpaid = 0;

    for leave in approved {
        for day in days_between(leave.start_date.max(from), leave.end_date.min(last)) {
            let allotment = match leave.leave_type {
                LeaveType::Casual => Some(&mut casual_left),
                LeaveType::Sick => Some(&mut sick_left),
                LeaveType::Unpaid => None,
            };
            let paid = match allotment {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            };
            if !paid && day >= first {
                unpaid += 1;
            }
        }
    }

    unpaid
}
