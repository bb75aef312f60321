use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::month_or_current,
    auth::auth::AuthUser,
    error::{HrError, HrResult},
    model::attendance::AttendanceStatus,
    service::attendance::{self as ledger, AttendancePolicy},
    store::{AttendanceFilter, HrStore},
    utils::calendar::Month,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    /// Defaults to today.
    #[schema(example = "2026-01-05", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeMonthQuery {
    /// Required for Admin/HR; employees always get their own.
    pub employee_id: Option<u64>,
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    pub employee_id: Option<u64>,
    /// Defaults to today.
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    /// `YYYY-MM`; takes precedence over the date range
    pub month: Option<String>,
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayStatusResponse {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendance,
    responses(
        (status = 201, description = "Attendance marked", body = Object, example = json!({
            "message": "Attendance marked successfully",
            "attendance": {}
        })),
        (status = 400, description = "Already marked for this date, or invalid status", body = Object, example = json!({
            "message": "Attendance already marked for this date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    body: web::Json<MarkAttendance>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.require_self_service()?;
    let now = Utc::now();
    let date = body.date.unwrap_or_else(|| now.date_naive());

    let record = ledger::mark_attendance(store.get_ref(), employee_id, date, body.status, now).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Attendance marked successfully",
        "attendance": record
    })))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "attendance": {}
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(auth: AuthUser, store: web::Data<dyn HrStore>) -> HrResult<HttpResponse> {
    let employee_id = auth.require_self_service()?;

    let record = ledger::check_in(store.get_ref(), employee_id, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "attendance": record
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "attendance": {}
        })),
        (status = 400, description = "Not checked in, or already checked out", body = Object, example = json!({
            "message": "Please check in first"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<dyn HrStore>,
    policy: web::Data<AttendancePolicy>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.require_self_service()?;

    let record = ledger::check_out(store.get_ref(), &policy, employee_id, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "attendance": record
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    params(("employeeId" = Option<u64>, Query, description = "Admin/HR only")),
    responses(
        (status = 200, description = "Today's record and resolved status", body = crate::service::attendance::TodayAttendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    query: web::Query<DayQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.subject(query.employee_id)?;
    let today = ledger::today(store.get_ref(), employee_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(today))
}

/// Leave-aware status of one day
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(DayQuery),
    responses(
        (status = 200, description = "Resolved status", body = DayStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn day_status(
    auth: AuthUser,
    query: web::Query<DayQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.subject(query.employee_id)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let status = ledger::day_status(store.get_ref(), employee_id, date).await?;

    Ok(HttpResponse::Ok().json(DayStatusResponse {
        employee_id,
        date,
        status,
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/monthly",
    params(EmployeeMonthQuery),
    responses(
        (status = 200, description = "Every day of the month with totals", body = crate::service::attendance::MonthlyAttendance),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly(
    auth: AuthUser,
    query: web::Query<EmployeeMonthQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.subject(query.employee_id)?;
    let month = month_or_current(query.month.as_deref(), Utc::now())?;

    let summary = ledger::month_summary(store.get_ref(), employee_id, month).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/attendance/stats",
    params(EmployeeMonthQuery),
    responses(
        (status = 200, description = "Stored records counted by status", body = crate::service::attendance::AttendanceStats),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn stats(
    auth: AuthUser,
    query: web::Query<EmployeeMonthQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.subject(query.employee_id)?;
    let month = month_or_current(query.month.as_deref(), Utc::now())?;

    let stats = ledger::stats(store.get_ref(), employee_id, month).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records, newest first", body = [crate::model::attendance::AttendanceRecord]),
        (status = 400, description = "Invalid month or range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    query: web::Query<AttendanceQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let query = query.into_inner();
    let employee_id = auth.scope(query.employee_id)?;

    let (from, to) = match query.month.as_deref() {
        Some(raw) => {
            let month: Month = raw.parse().map_err(|e: String| HrError::invalid("month", e))?;
            (Some(month.first_day()), Some(month.last_day()))
        }
        None => (query.start_date, query.end_date),
    };
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(HrError::InvalidRange);
        }
    }

    let records = ledger::list(
        store.get_ref(),
        &AttendanceFilter {
            employee_id,
            from,
            to,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/admin",
    params(DayQuery),
    responses(
        (status = 200, description = "Status of every employee on the day", body = [crate::service::attendance::RosterEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn admin_roster(
    auth: AuthUser,
    query: web::Query<DayQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let roster = ledger::admin_roster(store.get_ref(), date, query.employee_id).await?;
    Ok(HttpResponse::Ok().json(roster))
}
