use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::store::{Collection, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "EMP-001",
        "name": "Farhana Akter",
        "email": "farhana@company.com",
        "department": "Finance",
        "designation": "Accountant",
        "supervisor_id": "EMP-000",
        "is_supervisor": false,
        "gross_salary": 30000.0,
        "status": "active"
    })
)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    /// Current line manager; copied onto leave requests at submission.
    #[serde(default)]
    pub supervisor_id: Option<String>,
    /// Set explicitly by HR; grants stage-one leave decisions.
    #[serde(default)]
    pub is_supervisor: bool,
    /// Monthly gross. Missing salary blocks payroll computation.
    #[serde(default)]
    pub gross_salary: Option<f64>,
    pub status: EmployeeStatus,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date")]
    pub joined_on: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Employee {
    const COLLECTION: Collection = Collection::Employees;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.supervisor_id.as_deref() == Some(self.id.as_str()) {
            return Err("employee cannot supervise themself".into());
        }
        Ok(())
    }
}
