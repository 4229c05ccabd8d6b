use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::AppState;
use crate::auth::auth::AuthUser;
use crate::model::payroll::{PayrollAction, PayrollRecord};
use crate::service::ItemOutcome;
use crate::service::payroll_lifecycle::{GenerationReport, PayrollFilter};

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateField {
    /// One of festival_bonus, loan_deduction, lunch_subsidy, ait
    #[schema(example = "loan_deduction")]
    pub field: String,
    #[schema(example = 1500.0)]
    pub value: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkDecision {
    #[schema(example = json!(["emp_07_2026_03", "emp_08_2026_03"]))]
    pub record_ids: Vec<String>,
    pub action: PayrollAction,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordIds {
    #[schema(example = json!(["emp_07_2026_03"]))]
    pub record_ids: Vec<String>,
}

/// Generate pending payroll for every active employee (Admin)
#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 200, description = "Created, skipped and failed records", body = GenerationReport),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    let report = state
        .payroll
        .generate(&auth.actor(), body.month, body.year)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollFilter),
    responses(
        (status = 200, body = [PayrollRecord]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PayrollFilter>,
) -> actix_web::Result<impl Responder> {
    let records = state.payroll.list(&auth.actor(), &query).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(("payroll_id", description = "Payroll record id, <employee>_<YYYY>_<MM>")),
    responses(
        (status = 200, body = PayrollRecord),
        (status = 403),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let record = state.payroll.get(&auth.actor(), &path).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Edit one manual adjustment; totals are recomputed (Admin)
#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/field",
    request_body = UpdateField,
    params(("payroll_id", description = "Payroll record id, <employee>_<YYYY>_<MM>")),
    responses(
        (status = 200, description = "Record with recomputed totals", body = PayrollRecord),
        (status = 400, description = "Field not editable, bad value, or record already paid"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee named by the id does not exist")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_field(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateField>,
) -> actix_web::Result<impl Responder> {
    let record = state
        .payroll
        .update_field(&auth.actor(), &path, &body.field, body.value)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Approve or reject many records; each one succeeds or fails on its own
#[utoipa::path(
    put,
    path = "/api/payroll/decision",
    request_body = BulkDecision,
    responses(
        (status = 200, description = "Per-record outcome", body = [ItemOutcome]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn bulk_decide(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<BulkDecision>,
) -> actix_web::Result<impl Responder> {
    let outcomes = state
        .payroll
        .bulk_decide(&auth.actor(), &body.record_ids, body.action)
        .await?;
    Ok(HttpResponse::Ok().json(outcomes))
}

#[utoipa::path(
    put,
    path = "/api/payroll/pay",
    request_body = RecordIds,
    responses(
        (status = 200, description = "Per-record outcome", body = [ItemOutcome]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn mark_paid(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<RecordIds>,
) -> actix_web::Result<impl Responder> {
    let outcomes = state.payroll.mark_paid(&auth.actor(), &body.record_ids).await?;
    Ok(HttpResponse::Ok().json(outcomes))
}
