use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    error::{HrError, HrResult},
    service::payroll::{self as generator, GeneratePayroll},
    store::{HrStore, PayrollFilter},
    utils::calendar::Month,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PayrollQuery {
    /// Admin/HR only; employees always get their own
    #[serde(alias = "userId")]
    #[param(example = 1000)]
    pub employee_id: Option<u64>,

    /// `YYYY-MM`
    #[param(example = "2024-02")]
    pub month: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 201, description = "Payroll generated (or regenerated while unlocked)", body = Object, example = json!({
            "message": "Payroll generated successfully",
            "payroll": {}
        })),
        (status = 400, description = "Locked, duplicate or invalid input", body = Object, example = json!({
            "message": "Payroll for this month is already locked"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    auth: AuthUser,
    body: web::Json<GeneratePayroll>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_payroll_runner()?;

    let payroll = generator::generate(store.get_ref(), body.into_inner(), Utc::now()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Payroll generated successfully",
        "payroll": payroll
    })))
}

#[utoipa::path(
    put,
    path = "/api/payroll/lock/{payroll_id}",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll locked", body = Object, example = json!({
            "message": "Payroll locked successfully",
            "payroll": {}
        })),
        (status = 400, description = "Payroll is already locked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn lock_payroll(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_payroll_runner()?;

    let payroll = generator::lock(store.get_ref(), path.into_inner(), auth.user_id, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Payroll locked successfully",
        "payroll": payroll
    })))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll record", body = crate::model::payroll::PayrollRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your payroll"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let payroll = generator::get(store.get_ref(), path.into_inner()).await?;
    auth.ensure_can_view(payroll.employee_id)?;
    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, description = "Payroll records, latest month first", body = [crate::model::payroll::PayrollRecord]),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    query: web::Query<PayrollQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let query = query.into_inner();
    let employee_id = auth.scope(query.employee_id)?;

    let month = match query.month.as_deref() {
        Some(raw) => Some(
            raw.parse::<Month>()
                .map_err(|e| HrError::invalid("month", e))?
                .to_string(),
        ),
        None => None,
    };

    let payrolls = generator::list(store.get_ref(), &PayrollFilter { employee_id, month }).await?;
    Ok(HttpResponse::Ok().json(payrolls))
}
