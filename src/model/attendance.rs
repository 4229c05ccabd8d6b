use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::store::{Collection, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkLocation {
    #[default]
    Office,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "09:05:00")]
    pub check_in: Option<NaiveTime>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub location: WorkLocation,
    /// Entered by an administrator rather than a check-in.
    #[serde(default)]
    pub manual: bool,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// One record per employee per calendar date.
    pub fn key(employee_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", employee_id, date.format("%Y-%m-%d"))
    }
}

impl Entity for AttendanceRecord {
    const COLLECTION: Collection = Collection::Attendance;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        match (self.check_in, self.check_out) {
            (None, Some(_)) => Err("check_out without check_in".into()),
            (Some(i), Some(o)) if o < i => Err("check_out precedes check_in".into()),
            _ => Ok(()),
        }
    }
}

/// Per-employee, per-month aggregate derived from attendance and leave records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceFacts {
    pub present_days: u32,
    pub absent_days: u32,
    pub late_days: u32,
    pub half_days: u32,
    pub unpaid_leave_days: u32,
}
