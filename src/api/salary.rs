use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{
    api::month_or_current,
    auth::auth::AuthUser,
    error::HrResult,
    model::salary::{SalaryProfile, SalaryProfileView},
    service::salary::{self as profiles, SalaryInput},
    store::HrStore,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SalaryQuery {
    #[serde(alias = "userId")]
    pub employee_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// `YYYY-MM`, defaults to the current month
    #[param(example = "2024-02")]
    pub month: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/salary",
    request_body = SalaryInput,
    responses(
        (status = 200, description = "Salary profile saved", body = Object, example = json!({
            "message": "Salary profile saved",
            "salary": {}
        })),
        (status = 400, description = "Components exceed base wage, or invalid amounts"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn upsert_salary(
    auth: AuthUser,
    body: web::Json<SalaryInput>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    let profile = profiles::upsert(store.get_ref(), body.into_inner(), Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Salary profile saved",
        "salary": profile.view()
    })))
}

#[utoipa::path(
    get,
    path = "/api/salary",
    params(SalaryQuery),
    responses(
        (status = 200, description = "Salary profiles", body = [SalaryProfileView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn list_salaries(
    auth: AuthUser,
    query: web::Query<SalaryQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.scope(query.employee_id)?;

    let views: Vec<SalaryProfileView> = profiles::list(store.get_ref(), employee_id)
        .await?
        .iter()
        .map(SalaryProfile::view)
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/salary/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Salary profile with resolved amounts", body = SalaryProfileView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your salary profile"),
        (status = 404, description = "Salary profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn get_salary(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.ensure_can_view(employee_id)?;

    let profile = profiles::get(store.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(profile.view()))
}

#[utoipa::path(
    get,
    path = "/api/salary/{employee_id}/payroll",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        PreviewQuery
    ),
    responses(
        (status = 200, description = "Attendance-prorated pay preview; nothing is stored", body = crate::service::salary::PayrollPreview),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Salary profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn payroll_preview(
    auth: AuthUser,
    path: web::Path<u64>,
    query: web::Query<PreviewQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;
    let month = month_or_current(query.month.as_deref(), Utc::now())?;

    let preview = profiles::payroll_preview(store.get_ref(), path.into_inner(), month).await?;
    Ok(HttpResponse::Ok().json(preview))
}
