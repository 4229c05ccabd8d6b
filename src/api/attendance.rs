use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::model::attendance::{AttendanceFacts, AttendanceRecord, WorkLocation};
use crate::service::attendance::ManualEntry;

#[derive(Deserialize, Default, ToSchema)]
pub struct CheckInBody {
    #[serde(default)]
    #[schema(example = "office")]
    pub location: WorkLocation,
}

#[derive(Deserialize, IntoParams)]
pub struct FactsQuery {
    /// Defaults to the caller's own employee id
    pub employee_id: Option<String>,
    #[param(example = 3)]
    pub month: u32,
    #[param(example = 2026)]
    pub year: i32,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = CheckInBody, description = "Optional work location"),
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<CheckInBody>>,
) -> actix_web::Result<impl Responder> {
    let location = body.map(|b| b.into_inner().location).unwrap_or_default();
    let record = state
        .attendance
        .check_in(&auth.actor(), Local::now().naive_local(), location)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let record = state
        .attendance
        .check_out(&auth.actor(), Local::now().naive_local())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Create or replace one day's record (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/manual",
    request_body = ManualEntry,
    responses(
        (status = 200, description = "Record saved", body = AttendanceRecord),
        (status = 400, description = "Inconsistent times"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn manual_entry(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ManualEntry>,
) -> actix_web::Result<impl Responder> {
    let record = state
        .attendance
        .manual_entry(&auth.actor(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Monthly attendance and leave facts for one employee
#[utoipa::path(
    get,
    path = "/api/attendance/facts",
    params(FactsQuery),
    responses(
        (status = 200, body = AttendanceFacts),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "Only HR/Admin may read other employees' facts")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_facts(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<FactsQuery>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let employee_id = match query.employee_id.as_deref() {
        Some(id) if actor.employee_id.as_deref() == Some(id) => id,
        Some(id) => {
            actor.require_hr_or_admin()?;
            id
        }
        None => actor.employee_id()?,
    };
    if employee_id.is_empty() {
        return Err(ServiceError::validation("employee_id is required").into());
    }

    let facts = state.facts.aggregate(employee_id, query.month, query.year).await?;
    Ok(HttpResponse::Ok().json(facts))
}
