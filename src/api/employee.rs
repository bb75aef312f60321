use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    error::HrResult,
    service::employee::{self as onboarding, CreateEmployee, EmployeeUpdate, LoginIdRegistry},
    store::{EmployeeFilter, HrStore},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeListQuery {
    /// Case-insensitive match on name or email (Admin/HR)
    pub search: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

impl From<EmployeeListQuery> for EmployeeFilter {
    fn from(query: EmployeeListQuery) -> Self {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        EmployeeFilter {
            search: non_blank(query.search),
            department: non_blank(query.department),
            is_active: query.is_active,
        }
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee onboarded; the temporary password is shown once", body = crate::service::employee::OnboardedEmployee),
        (status = 400, description = "Validation failure or duplicate email", body = Object, example = json!({
            "message": "Employee with this email already exists"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only; only admins may set a role other than employee"),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Internal Server Error"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    payload: web::Json<CreateEmployee>,
    store: web::Data<dyn HrStore>,
    registry: web::Data<LoginIdRegistry>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    let onboarded =
        onboarding::create(store.get_ref(), &registry, auth.role, payload.into_inner(), Utc::now()).await?;

    Ok(HttpResponse::Created().json(onboarded))
}

/// List employees. Employees only see themselves.
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeListQuery),
    responses(
        (status = 200, description = "Employees sorted by name", body = [crate::model::employee::Employee]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    query: web::Query<EmployeeListQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employees = match auth.scope(None)? {
        Some(own) => vec![onboarding::get(store.get_ref(), own).await?],
        None => onboarding::list(store.get_ref(), &query.into_inner().into()).await?,
    };
    debug!(count = employees.len(), "Employees listed");

    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee profile", body = crate::model::employee::Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.ensure_can_view(employee_id)?;

    let employee = onboarding::get(store.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Updated profile", body = crate::model::employee::Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Another employee's profile, a role change by non-admin or a status change by an employee"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    payload: web::Json<EmployeeUpdate>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.ensure_can_view(employee_id)?;

    let employee = onboarding::update(
        store.get_ref(),
        auth.role,
        employee_id,
        payload.into_inner(),
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Deactivate Employee. The record and its history are kept; the login stops working.
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee deactivated", body = Object, example = json!({
            "message": "Employee deactivated successfully"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    onboarding::deactivate(store.get_ref(), path.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deactivated successfully" })))
}
