use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::AppState;
use crate::auth::auth::AuthUser;
use crate::model::settings::PayrollSettings;

#[derive(Deserialize, ToSchema)]
pub struct UpdateSetting {
    #[schema(example = "late_tolerance_count")]
    pub key: String,
    #[schema(example = 3.0)]
    pub value: f64,
}

/// Effective payroll settings (stored values over defaults)
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, body = PayrollSettings),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_settings(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    auth.actor().require_hr_or_admin()?;
    let settings = state.settings.load().await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = UpdateSetting,
    responses(
        (status = 200, description = "Settings after the change", body = PayrollSettings),
        (status = 400, description = "Unknown key or invalid value"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_setting(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<UpdateSetting>,
) -> actix_web::Result<impl Responder> {
    let settings = state
        .settings
        .update(&auth.actor(), &body.key, body.value)
        .await?;
    Ok(HttpResponse::Ok().json(settings))
}
