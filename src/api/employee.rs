use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use super::{AppState, MessageResponse};
use crate::auth::auth::AuthUser;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::service::employee::{EmployeeFilter, EmployeeUpdate, NewEmployee};

#[derive(Deserialize, ToSchema)]
pub struct StatusBody {
    #[schema(example = "on_leave")]
    pub status: EmployeeStatus,
}

#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload or supervisor"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee = state
        .employees
        .create(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeFilter),
    responses(
        (status = 200, body = [Employee]),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeFilter>,
) -> actix_web::Result<impl Responder> {
    auth.actor().require_hr_or_admin()?;
    debug!(?query, "Listing employees");

    let employees = state.employees.list(&query).await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, body = Employee),
        (status = 403, description = "HR/Admin or the employee themself"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    if actor.employee_id.as_deref() != Some(path.as_str()) {
        actor.require_hr_or_admin()?;
    }

    let employee = state.employees.get(&path).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    params(("id" = String, Path, description = "Employee id")),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid payload or supervisor"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<EmployeeUpdate>,
) -> actix_web::Result<impl Responder> {
    let employee = state
        .employees
        .update(&auth.actor(), &path, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    put,
    path = "/api/employee/{id}/status",
    params(("id" = String, Path, description = "Employee id")),
    request_body = StatusBody,
    responses(
        (status = 200, description = "Status changed", body = Employee),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn set_employee_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<StatusBody>,
) -> actix_web::Result<impl Responder> {
    let employee = state
        .employees
        .set_status(&auth.actor(), &path, body.status)
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    delete,
    path = "/api/employee/{id}",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    state.employees.delete(&auth.actor(), &path).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Employee deleted")))
}
