//! Salary deduction arithmetic.
//!
//! [`recompute`] is the single place where derived payroll amounts are
//! written. Every mutation path calls it after changing any input, so the
//! derived fields are always a function of the stored inputs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::payroll::{PayrollRecord, round_cents};
use crate::model::settings::PayrollSettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DeductionBreakdown {
    pub late_penalty: f64,
    pub unpaid_leave_deduction: f64,
    pub half_day_deduction: f64,
    pub absent_deduction: f64,
    pub basic_salary: f64,
    pub total_deduction: f64,
    pub net_payable: f64,
}

/// A half-day absence costs this share of a day's pay.
const HALF_DAY_WEIGHT: f64 = 0.5;

pub fn compute_deductions(
    record: &PayrollRecord,
    settings: &PayrollSettings,
) -> ServiceResult<DeductionBreakdown> {
    let basic_salary = match record.basic_salary {
        Some(salary) if salary.is_finite() && salary >= 0.0 => round_cents(salary),
        Some(_) => {
            return Err(ServiceError::validation(format!(
                "payroll record {} has a non-numeric basic salary",
                record.id
            )));
        }
        None => {
            return Err(ServiceError::validation(format!(
                "payroll record {} has no basic salary; check the employee's gross salary",
                record.id
            )));
        }
    };
    if settings.working_days_per_month == 0 || settings.late_tolerance_count == 0 {
        return Err(ServiceError::validation(
            "working_days_per_month and late_tolerance_count must be at least 1",
        ));
    }

    let daily_rate = basic_salary / f64::from(settings.working_days_per_month);

    let late_units = record.total_late_days / settings.late_tolerance_count;
    let late_penalty = f64::from(late_units) * daily_rate;
    let unpaid_leave_deduction = f64::from(record.unpaid_leave_days) * daily_rate;
    let half_day_deduction = f64::from(record.total_half_days) * HALF_DAY_WEIGHT * daily_rate;
    let absent_deduction = f64::from(record.total_absent_days) * daily_rate;

    let total_deduction = late_penalty
        + unpaid_leave_deduction
        + half_day_deduction
        + absent_deduction
        + record.loan_deduction
        + record.ait
        - record.festival_bonus
        - record.lunch_subsidy;

    // Net is not rounded again: it must equal `max(0, basic - total)` exactly.
    let total_deduction = round_cents(total_deduction);
    let net_payable = (basic_salary - total_deduction).max(0.0);

    Ok(DeductionBreakdown {
        late_penalty: round_cents(late_penalty),
        unpaid_leave_deduction: round_cents(unpaid_leave_deduction),
        half_day_deduction: round_cents(half_day_deduction),
        absent_deduction: round_cents(absent_deduction),
        basic_salary,
        total_deduction,
        net_payable,
    })
}

/// Recomputes every derived amount from the record's current inputs.
pub fn recompute(record: &mut PayrollRecord, settings: &PayrollSettings) -> ServiceResult<DeductionBreakdown> {
    let breakdown = compute_deductions(record, settings)?;
    record.basic_salary = Some(breakdown.basic_salary);
    record.late_penalty = breakdown.late_penalty;
    record.unpaid_leave_deduction = breakdown.unpaid_leave_deduction;
    record.half_day_deduction = breakdown.half_day_deduction;
    record.absent_deduction = breakdown.absent_deduction;
    record.total_deduction = breakdown.total_deduction;
    record.net_payable_salary = breakdown.net_payable;
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::{Employee, EmployeeStatus};
    use crate::model::payroll::{EditableField, PayrollKey};
    use chrono::Utc;

    fn record(salary: Option<f64>) -> PayrollRecord {
        let employee = Employee {
            id: "e1".into(),
            name: "Tanvir".into(),
            email: "tanvir@company.com".into(),
            department: None,
            designation: None,
            supervisor_id: None,
            is_supervisor: false,
            gross_salary: salary,
            status: EmployeeStatus::Active,
            joined_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let key = PayrollKey::new("e1", 5, 2026).unwrap();
        PayrollRecord::seeded(&key, &employee, Utc::now())
    }

    fn settings() -> PayrollSettings {
        PayrollSettings {
            working_days_per_month: 30,
            late_tolerance_count: 3,
            ..PayrollSettings::default()
        }
    }

    #[test]
    fn late_penalty_counts_full_tolerance_multiples() {
        let mut r = record(Some(30000.0));
        r.total_late_days = 7;
        let b = compute_deductions(&r, &settings()).unwrap();
        assert_eq!(b.late_penalty, 2000.0);

        r.total_late_days = 2;
        assert_eq!(compute_deductions(&r, &settings()).unwrap().late_penalty, 0.0);

        r.total_late_days = 3;
        assert_eq!(compute_deductions(&r, &settings()).unwrap().late_penalty, 1000.0);
    }

    #[test]
    fn total_and_net_follow_the_formula() {
        let mut r = record(Some(30000.0));
        r.total_late_days = 7;
        r.unpaid_leave_days = 2;
        r.loan_deduction = 500.0;
        r.ait = 300.0;
        r.festival_bonus = 1000.0;
        r.lunch_subsidy = 200.0;

        let b = compute_deductions(&r, &settings()).unwrap();
        assert_eq!(b.unpaid_leave_deduction, 2000.0);
        assert_eq!(b.total_deduction, 3600.0);
        assert_eq!(b.net_payable, 26400.0);
    }

    #[test]
    fn half_days_and_absences_convert_at_daily_rate() {
        let mut r = record(Some(30000.0));
        r.total_half_days = 3;
        r.total_absent_days = 2;
        let b = compute_deductions(&r, &settings()).unwrap();
        assert_eq!(b.half_day_deduction, 1500.0);
        assert_eq!(b.absent_deduction, 2000.0);
        assert_eq!(b.total_deduction, 3500.0);
    }

    #[test]
    fn net_payable_never_goes_negative() {
        let mut r = record(Some(10000.0));
        r.loan_deduction = 25000.0;
        let b = compute_deductions(&r, &settings()).unwrap();
        assert_eq!(b.total_deduction, 25000.0);
        assert_eq!(b.net_payable, 0.0);
    }

    #[test]
    fn missing_or_invalid_salary_is_a_validation_error() {
        let r = record(None);
        assert!(matches!(
            compute_deductions(&r, &settings()),
            Err(ServiceError::Validation(_))
        ));

        let r = record(Some(f64::NAN));
        assert!(matches!(
            compute_deductions(&r, &settings()),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn rounding_happens_only_on_output() {
        let mut r = record(Some(10000.0));
        // 10000 / 30 = 333.333..; three unpaid days must be exactly 1000.00.
        r.unpaid_leave_days = 3;
        let b = compute_deductions(&r, &settings()).unwrap();
        assert_eq!(b.unpaid_leave_deduction, 1000.0);
        assert_eq!(b.net_payable, 9000.0);
    }

    #[test]
    fn net_equals_basic_minus_total_for_uneven_salaries() {
        let settings = settings();
        for cents in 0..20_000u32 {
            let mut r = record(Some(30000.0 + f64::from(cents) / 100.0));
            r.loan_deduction = 1000.01 + f64::from(cents % 97) / 100.0;
            r.ait = 234.01;
            r.total_late_days = cents % 5;
            recompute(&mut r, &settings).unwrap();
            assert_eq!(
                r.net_payable_salary,
                (r.basic_salary.unwrap() - r.total_deduction).max(0.0),
                "salary cents {}",
                cents
            );
        }
    }

    #[test]
    fn salary_snapshot_is_kept_in_cents() {
        let mut r = record(Some(30000.555));
        assert_eq!(r.basic_salary, Some(30000.56));

        r.basic_salary = Some(12000.004);
        recompute(&mut r, &settings()).unwrap();
        assert_eq!(r.basic_salary, Some(12000.0));
        assert_eq!(r.net_payable_salary, 12000.0);
        assert_eq!(
            r.net_payable_salary,
            r.basic_salary.unwrap() - r.total_deduction
        );
    }

    #[test]
    fn recompute_overwrites_stale_derived_fields() {
        let mut r = record(Some(30000.0));
        r.total_deduction = 99999.0;
        r.net_payable_salary = 1.0;
        r.set_field(EditableField::LoanDeduction, 500.0).unwrap();

        recompute(&mut r, &settings()).unwrap();
        assert_eq!(r.total_deduction, 500.0);
        assert_eq!(r.net_payable_salary, 29500.0);
        assert_eq!(
            r.net_payable_salary,
            (r.basic_salary.unwrap() - r.total_deduction).max(0.0)
        );
    }
}
