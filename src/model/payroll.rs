use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

use super::attendance::AttendanceFacts;
use super::employee::Employee;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Collection, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayrollStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayrollAction {
    Approve,
    Reject,
}

/// The manual adjustments an administrator may edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditableField {
    FestivalBonus,
    LoanDeduction,
    LunchSubsidy,
    Ait,
}

/// Identity of a payroll record: one per employee per period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{}_{}_{:02}", employee_id, year, month)]
pub struct PayrollKey {
    pub employee_id: String,
    pub year: i32,
    pub month: u32,
}

impl PayrollKey {
    pub fn new(employee_id: &str, month: u32, year: i32) -> ServiceResult<Self> {
        validate_period(month, year)?;
        if employee_id.is_empty() {
            return Err(ServiceError::validation("employee id is required"));
        }
        Ok(Self {
            employee_id: employee_id.to_string(),
            year,
            month,
        })
    }
}

impl FromStr for PayrollKey {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::validation(format!("malformed payroll record id: {}", s));

        let mut parts = s.rsplitn(3, '_');
        let month = parts.next().and_then(|m| m.parse::<u32>().ok()).ok_or_else(invalid)?;
        let year = parts.next().and_then(|y| y.parse::<i32>().ok()).ok_or_else(invalid)?;
        let employee_id = parts.next().ok_or_else(invalid)?;

        PayrollKey::new(employee_id, month, year).map_err(|_| invalid())
    }
}

pub fn validate_period(month: u32, year: i32) -> ServiceResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ServiceError::validation(format!("invalid month: {}", month)));
    }
    if !(2000..=2100).contains(&year) {
        return Err(ServiceError::validation(format!("invalid year: {}", year)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollRecord {
    pub id: String,
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub month: u32,
    pub year: i32,
    /// Gross salary snapshot taken when the record was created.
    #[serde(default)]
    pub basic_salary: Option<f64>,

    #[serde(default)]
    pub festival_bonus: f64,
    #[serde(default)]
    pub loan_deduction: f64,
    #[serde(default)]
    pub lunch_subsidy: f64,
    #[serde(default)]
    pub ait: f64,

    #[serde(default)]
    pub total_present_days: u32,
    #[serde(default)]
    pub total_absent_days: u32,
    #[serde(default)]
    pub total_late_days: u32,
    #[serde(default)]
    pub total_half_days: u32,
    #[serde(default)]
    pub unpaid_leave_days: u32,

    #[serde(default)]
    pub late_penalty: f64,
    #[serde(default)]
    pub unpaid_leave_deduction: f64,
    #[serde(default)]
    pub half_day_deduction: f64,
    #[serde(default)]
    pub absent_deduction: f64,

    #[serde(default)]
    pub total_deduction: f64,
    #[serde(default)]
    pub net_payable_salary: f64,

    pub status: PayrollStatus,
    #[serde(default)]
    pub decided_by: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub paid_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for PayrollRecord {
    const COLLECTION: Collection = Collection::PayrollRecords;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        let key = PayrollKey::new(&self.employee_id, self.month, self.year).map_err(|e| e.to_string())?;
        if key.to_string() != self.id {
            return Err(format!("id does not match period key {}", key));
        }
        Ok(())
    }
}

/// Rounds an amount to whole cents.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid emitting -0.0.
    if rounded == 0.0 { 0.0 } else { rounded }
}

impl PayrollRecord {
    /// A fresh pending record: salary snapshot, zero adjustments, no facts yet.
    pub fn seeded(key: &PayrollKey, employee: &Employee, now: DateTime<Utc>) -> Self {
        Self {
            id: key.to_string(),
            employee_id: key.employee_id.clone(),
            employee_name: Some(employee.name.clone()),
            month: key.month,
            year: key.year,
            basic_salary: employee.gross_salary.map(round_cents),
            festival_bonus: 0.0,
            loan_deduction: 0.0,
            lunch_subsidy: 0.0,
            ait: 0.0,
            total_present_days: 0,
            total_absent_days: 0,
            total_late_days: 0,
            total_half_days: 0,
            unpaid_leave_days: 0,
            late_penalty: 0.0,
            unpaid_leave_deduction: 0.0,
            half_day_deduction: 0.0,
            absent_deduction: 0.0,
            total_deduction: 0.0,
            net_payable_salary: 0.0,
            status: PayrollStatus::Pending,
            decided_by: None,
            decided_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_facts(&mut self, facts: &AttendanceFacts) {
        self.total_present_days = facts.present_days;
        self.total_absent_days = facts.absent_days;
        self.total_late_days = facts.late_days;
        self.total_half_days = facts.half_days;
        self.unpaid_leave_days = facts.unpaid_leave_days;
    }

    pub fn set_field(&mut self, field: EditableField, value: f64) -> ServiceResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(ServiceError::validation(format!(
                "{} must be a non-negative number",
                field
            )));
        }
        if self.status == PayrollStatus::Paid {
            return Err(ServiceError::validation(format!(
                "payroll record {} is already paid",
                self.id
            )));
        }
        match field {
            EditableField::FestivalBonus => self.festival_bonus = value,
            EditableField::LoanDeduction => self.loan_deduction = value,
            EditableField::LunchSubsidy => self.lunch_subsidy = value,
            EditableField::Ait => self.ait = value,
        }
        Ok(())
    }

    /// Approve or reject. Amounts are left as computed.
    pub fn decide(&mut self, action: PayrollAction, approver_id: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let target = match action {
            PayrollAction::Approve => PayrollStatus::Approved,
            PayrollAction::Reject => PayrollStatus::Rejected,
        };
        match self.status {
            PayrollStatus::Paid => {
                return Err(ServiceError::validation(format!(
                    "payroll record {} is already paid",
                    self.id
                )));
            }
            current if current == target => {
                return Err(ServiceError::validation(format!(
                    "payroll record {} is already {}",
                    self.id, current
                )));
            }
            _ => {}
        }
        self.status = target;
        self.decided_by = Some(approver_id.to_string());
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> ServiceResult<()> {
        if self.status != PayrollStatus::Approved {
            return Err(ServiceError::validation(format!(
                "payroll record {} is {}, only approved records can be paid",
                self.id, self.status
            )));
        }
        self.status = PayrollStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
