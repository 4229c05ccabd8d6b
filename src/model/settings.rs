use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::store::{Collection, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettingKey {
    AnnualCasualLeaveDays,
    AnnualSickLeaveDays,
    LateToleranceCount,
    WorkingDaysPerMonth,
    HalfDayHours,
    FullDayHours,
}

/// One stored key/value entry; the document id is the key itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettingEntry {
    pub id: String,
    pub key: String,
    pub value: f64,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for SettingEntry {
    const COLLECTION: Collection = Collection::PayrollSettings;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollSettings {
    pub annual_casual_leave_days: u32,
    pub annual_sick_leave_days: u32,
    /// Every full multiple of this many late days costs one day's pay.
    pub late_tolerance_count: u32,
    pub working_days_per_month: u32,
    pub half_day_hours: f64,
    pub full_day_hours: f64,
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            annual_casual_leave_days: 10,
            annual_sick_leave_days: 14,
            late_tolerance_count: 3,
            working_days_per_month: 30,
            half_day_hours: 4.0,
            full_day_hours: 8.0,
        }
    }
}

impl SettingKey {
    /// Keys holding a whole number of days or occurrences.
    pub fn is_count(self) -> bool {
        !matches!(self, SettingKey::HalfDayHours | SettingKey::FullDayHours)
    }
}

impl PayrollSettings {
    /// Sets one value. Count keys only take whole non-negative numbers, so
    /// the stored value is always the one computations use.
    pub fn apply(&mut self, key: SettingKey, value: f64) -> Result<(), String> {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{} must be a non-negative number", key));
        }
        if key.is_count() && (value.fract() != 0.0 || value > f64::from(u32::MAX)) {
            return Err(format!("{} must be a whole number, got {}", key, value));
        }
        let days = value as u32;
        match key {
            SettingKey::AnnualCasualLeaveDays => self.annual_casual_leave_days = days,
            SettingKey::AnnualSickLeaveDays => self.annual_sick_leave_days = days,
            SettingKey::LateToleranceCount => self.late_tolerance_count = days,
            SettingKey::WorkingDaysPerMonth => self.working_days_per_month = days,
            SettingKey::HalfDayHours => self.half_day_hours = value,
            SettingKey::FullDayHours => self.full_day_hours = value,
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.late_tolerance_count == 0 {
            return Err("late_tolerance_count must be at least 1".into());
        }
        if self.working_days_per_month == 0 {
            return Err("working_days_per_month must be at least 1".into());
        }
        if !(self.half_day_hours > 0.0 && self.half_day_hours < self.full_day_hours) {
            return Err("half_day_hours must be positive and below full_day_hours".into());
        }
        if self.full_day_hours > 24.0 {
            return Err("full_day_hours cannot exceed 24".into());
        }
        Ok(())
    }
}
