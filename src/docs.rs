use crate::api::MessageResponse;
use crate::api::attendance::CheckInBody;
use crate::api::employee::StatusBody;
use crate::api::leave_request::{AppealBody, DecisionBody, PendingAppealCount};
use crate::api::payroll::{BulkDecision, GeneratePayroll, RecordIds, UpdateField};
use crate::api::settings::UpdateSetting;
use crate::model::attendance::{AttendanceFacts, AttendanceRecord, AttendanceStatus, WorkLocation};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeave, RejectedBy};
use crate::model::payroll::{EditableField, PayrollAction, PayrollRecord, PayrollStatus};
use crate::model::settings::{PayrollSettings, SettingKey};
use crate::service::ItemOutcome;
use crate::service::attendance::ManualEntry;
use crate::service::employee::{EmployeeUpdate, NewEmployee};
use crate::service::payroll_lifecycle::GenerationReport;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave & Payroll API",
        version = "1.0.0",
        description = r#"
## Leave approval and payroll computation

### 🔹 Key Features
- **Leave Management**
  - Two-stage approval: the assigned supervisor first, then an admin
  - Rejection reasons, one appeal at a time, admin appeal review
- **Attendance**
  - Daily check-in / check-out, manual corrections, monthly facts
- **Payroll**
  - Monthly generation per active employee, manual adjustments with automatic
    recomputation, bulk approve/reject and payment with per-record outcomes
- **Settings**
  - Leave allotments, late tolerance, working days and half/full day hours

### 🔐 Security
Every endpoint expects a **JWT Bearer** token issued by the identity service.

---
Built with **Rust**, **Actix Web**, **SQLx**, **Moka** and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::supervisor_decision,
        crate::api::leave_request::admin_decision,
        crate::api::leave_request::appeal_leave,
        crate::api::leave_request::review_appeal,
        crate::api::leave_request::pending_appeal_count,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::manual_entry,
        crate::api::attendance::monthly_facts,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::set_employee_status,
        crate::api::employee::delete_employee,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::get_payroll,
        crate::api::payroll::update_field,
        crate::api::payroll::bulk_decide,
        crate::api::payroll::mark_paid,

        crate::api::settings::get_settings,
        crate::api::settings::update_setting
    ),
    components(
        schemas(
            NewLeave,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            RejectedBy,
            DecisionBody,
            AppealBody,
            PendingAppealCount,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceFacts,
            WorkLocation,
            CheckInBody,
            ManualEntry,
            Employee,
            EmployeeStatus,
            NewEmployee,
            EmployeeUpdate,
            StatusBody,
            PayrollRecord,
            PayrollStatus,
            PayrollAction,
            EditableField,
            GeneratePayroll,
            GenerationReport,
            UpdateField,
            BulkDecision,
            RecordIds,
            ItemOutcome,
            PayrollSettings,
            SettingKey,
            UpdateSetting,
            MessageResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave approval workflow APIs"),
        (name = "Attendance", description = "Attendance capture APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payroll", description = "Payroll lifecycle APIs"),
        (name = "Settings", description = "Payroll settings APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_the_workflow_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/leave/{leave_id}/supervisor-decision",
            "/api/leave/{leave_id}/appeal/review",
            "/api/payroll/generate",
            "/api/payroll/{payroll_id}/field",
            "/api/settings",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{}", path);
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
