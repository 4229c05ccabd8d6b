use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppState;
use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, NewLeave};
use crate::service::leave_workflow::LeaveFilter;

#[derive(Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(example = false)]
    pub approve: bool,
    /// Required when rejecting
    #[schema(example = "Team is short-staffed that week")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AppealBody {
    #[schema(example = "The dates were agreed with my team lead in advance")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct PendingAppealCount {
    #[schema(example = 2)]
    pub count: usize,
}

/// Submit a leave request for the authenticated employee
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = NewLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates, missing reason or no supervisor assigned"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewLeave>,
) -> actix_web::Result<impl Responder> {
    let request = state.leave.submit(&auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(request))
}

/// List leave requests visible to the caller
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let requests = state.leave.list(&auth.actor(), &query).await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = String, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Not the requester, their supervisor, HR or admin"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave_requests 7f1c not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let request = state.leave.get(&auth.actor(), &path).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Stage 1: the assigned supervisor approves or rejects
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/supervisor-decision",
    params(("leave_id" = String, Path, description = "Leave request id")),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRequest),
        (status = 400, description = "Request is not awaiting the supervisor, or reason missing"),
        (status = 403, description = "Caller is not the assigned supervisor"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn supervisor_decision(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DecisionBody>,
) -> actix_web::Result<impl Responder> {
    let body = body.into_inner();
    let request = state
        .leave
        .supervisor_decide(&auth.actor(), &path, body.approve, body.reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Stage 2: an admin finalizes a supervisor-approved request
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/admin-decision",
    params(("leave_id" = String, Path, description = "Leave request id")),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRequest),
        (status = 400, description = "Request is not awaiting an admin, or reason missing"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn admin_decision(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DecisionBody>,
) -> actix_web::Result<impl Responder> {
    let body = body.into_inner();
    let request = state
        .leave
        .admin_decide(&auth.actor(), &path, body.approve, body.reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Appeal a rejected request
#[utoipa::path(
    post,
    path = "/api/leave/{leave_id}/appeal",
    params(("leave_id" = String, Path, description = "Leave request id")),
    request_body = AppealBody,
    responses(
        (status = 200, description = "Appeal filed", body = LeaveRequest),
        (status = 400, description = "Request not rejected, empty message, or an appeal is still unreviewed"),
        (status = 403, description = "Only the requester can appeal"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn appeal_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AppealBody>,
) -> actix_web::Result<impl Responder> {
    let request = state.leave.appeal(&auth.actor(), &path, &body.message).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/appeal/review",
    params(("leave_id" = String, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Appeal marked reviewed", body = LeaveRequest),
        (status = 400, description = "No unreviewed appeal on this request"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn review_appeal(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let request = state.leave.review_appeal(&auth.actor(), &path).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Unreviewed appeals the caller is responsible for
#[utoipa::path(
    get,
    path = "/api/leave/appeals/pending-count",
    responses(
        (status = 200, body = PendingAppealCount),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_appeal_count(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let count = state.leave.pending_appeal_count(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(PendingAppealCount { count }))
}
