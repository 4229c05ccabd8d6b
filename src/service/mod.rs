pub mod aggregator;
pub mod attendance;
pub mod computation;
pub mod employee;
pub mod leave_workflow;
pub mod office_hours;
pub mod payroll_lifecycle;
pub mod settings;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::role::Role;

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    /// Present only if the user is linked to an employee record
    pub employee_id: Option<String>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> ServiceResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> ServiceResult<()> {
        if self.role.manages_people() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("HR/Admin only"))
        }
    }

    pub fn employee_id(&self) -> ServiceResult<&str> {
        self.employee_id
            .as_deref()
            .ok_or_else(|| ServiceError::forbidden("No employee profile"))
    }
}

/// Result of one item inside a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ItemOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn success(id: impl Into<String>, status: impl ToString) -> Self {
        Self {
            id: id.into(),
            ok: true,
            status: Some(status.to_string()),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: &ServiceError) -> Self {
        Self {
            id: id.into(),
            ok: false,
            status: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_result<T: ToString>(id: &str, result: ServiceResult<T>) -> Self {
        match result {
            Ok(status) => Self::success(id, status),
            Err(e) => Self::failure(id, &e),
        }
    }
}
