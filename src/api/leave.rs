use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::{HrError, HrResult},
    model::leave::{LeaveStatus, LeaveType},
    service::leave::{self as ledger, DecisionOutcome, LeaveApplication, LeaveDecisionRequest},
    store::{HrStore, LeaveFilter},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveQuery {
    /// Filter by employee ID (Admin/HR)
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    #[serde(rename = "type")]
    pub leave_type: Option<LeaveType>,
    /// Leaves overlapping `[startDate, endDate]` match; give both or neither
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub employee_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectLeave {
    #[schema(example = "Project deadline")]
    pub rejection_reason: Option<String>,
}

fn decided(outcome: DecisionOutcome) -> HttpResponse {
    let message = match outcome.leave.status {
        LeaveStatus::Approved => "Leave approved successfully",
        _ => "Leave rejected successfully",
    };
    HttpResponse::Ok().json(json!({
        "message": message,
        "leave": outcome.leave,
        "daysMarked": outcome.days_marked
    }))
}

#[utoipa::path(
    post,
    path = "/api/leave/apply",
    request_body = LeaveApplication,
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "leave": {}
        })),
        (status = 400, description = "Invalid range, insufficient balance or missing reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    body: web::Json<LeaveApplication>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.require_self_service()?;

    let leave = ledger::apply(store.get_ref(), employee_id, body.into_inner(), Utc::now()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "leave": leave
    })))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Leave requests, newest first", body = [crate::model::leave::LeaveRequest]),
        (status = 400, description = "Invalid date window"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leaves(
    auth: AuthUser,
    query: web::Query<LeaveQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let query = query.into_inner();
    let employee_id = auth.scope(query.employee_id)?;

    let overlapping = match (query.start_date, query.end_date) {
        (Some(from), Some(to)) if to < from => return Err(HrError::InvalidRange),
        (Some(from), Some(to)) => Some((from, to)),
        (None, None) => None,
        _ => {
            return Err(HrError::invalid(
                "startDate",
                "startDate and endDate must be given together",
            ));
        }
    };

    let leaves = ledger::list(
        store.get_ref(),
        &LeaveFilter {
            employee_id,
            status: query.status,
            leave_type: query.leave_type,
            overlapping,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(leaves))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request", body = crate::model::leave::LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your leave request"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let leave = ledger::get(store.get_ref(), path.into_inner()).await?;
    auth.ensure_can_view(leave.employee_id)?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/approve/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = LeaveDecisionRequest,
    responses(
        (status = 200, description = "Leave decided", body = Object, example = json!({
            "message": "Leave approved successfully",
            "leave": {},
            "daysMarked": 3
        })),
        (status = 400, description = "Already processed, or status is not approved/rejected"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn decide_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<LeaveDecisionRequest>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    let outcome = ledger::decide(
        store.get_ref(),
        path.into_inner(),
        auth.user_id,
        body.into_inner(),
        Utc::now(),
    )
    .await?;
    Ok(decided(outcome))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved successfully",
            "leave": {},
            "daysMarked": 3
        })),
        (status = 400, description = "Leave request has already been processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    let outcome = ledger::approve(store.get_ref(), path.into_inner(), auth.user_id, Utc::now()).await?;
    Ok(decided(outcome))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = RejectLeave, description = "Optional rejection reason"),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected successfully",
            "leave": {},
            "daysMarked": 0
        })),
        (status = 400, description = "Leave request has already been processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    body: Option<web::Json<RejectLeave>>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();

    let outcome = ledger::reject(
        store.get_ref(),
        path.into_inner(),
        auth.user_id,
        body.rejection_reason,
        Utc::now(),
    )
    .await?;
    Ok(decided(outcome))
}

#[utoipa::path(
    get,
    path = "/api/leave/balance",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Remaining leave days", body = crate::model::leave::LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    query: web::Query<EmployeeQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.subject(query.employee_id)?;
    let balance = ledger::balance(store.get_ref(), employee_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

#[utoipa::path(
    get,
    path = "/api/leave/stats",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Leave requests counted by status", body = crate::service::leave::LeaveStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_stats(
    auth: AuthUser,
    query: web::Query<EmployeeQuery>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let employee_id = auth.scope(query.employee_id)?;
    let stats = ledger::stats(store.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{admin_token, app, bearer, body_json, config, hr_token, memory_store, onboard};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn approval_debits_balance_and_marks_attendance() {
        let store = memory_store();
        let (employee, token) = onboard(&store, "John Doe", "john@acme.test").await;
        let app = test::init_service(app(store.clone(), config())).await;

        let resp = test::TestRequest::post()
            .uri("/api/leave/apply")
            .insert_header(bearer(&token))
            .set_json(json!({
                "type": "sick",
                "fromDate": "2024-02-05",
                "toDate": "2024-02-07",
                "reason": "Flu"
            }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let leave = body_json(resp).await["leave"].clone();
        assert_eq!(leave["numberOfDays"], 3);
        assert_eq!(leave["status"], "pending");
        let leave_id = leave["id"].as_u64().unwrap();

        // employees cannot approve
        let self_approve = test::TestRequest::put()
            .uri(&format!("/api/leave/{leave_id}/approve"))
            .insert_header(bearer(&token))
            .send_request(&app)
            .await;
        assert_eq!(self_approve.status(), StatusCode::FORBIDDEN);

        let approved = test::TestRequest::put()
            .uri(&format!("/api/leave/approve/{leave_id}"))
            .insert_header(bearer(&hr_token()))
            .set_json(json!({ "status": "approved" }))
            .send_request(&app)
            .await;
        assert_eq!(approved.status(), StatusCode::OK);
        let body = body_json(approved).await;
        assert_eq!(body["leave"]["status"], "approved");
        assert_eq!(body["daysMarked"], 3);

        let twice = test::TestRequest::put()
            .uri(&format!("/api/leave/{leave_id}/approve"))
            .insert_header(bearer(&admin_token()))
            .send_request(&app)
            .await;
        assert_eq!(twice.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(twice).await["message"],
            "Leave request has already been processed"
        );

        let balance = test::TestRequest::get()
            .uri("/api/leave/balance")
            .insert_header(bearer(&token))
            .send_request(&app)
            .await;
        let balance = body_json(balance).await;
        assert_eq!(balance["sickLeave"], 3);
        assert_eq!(balance["paidLeave"], 12);

        let unknown = test::TestRequest::get()
            .uri("/api/leave/balance?employeeId=424242")
            .insert_header(bearer(&hr_token()))
            .send_request(&app)
            .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(unknown).await["message"], "Employee not found");

        let status = test::TestRequest::get()
            .uri("/api/attendance/status?date=2024-02-06")
            .insert_header(bearer(&token))
            .send_request(&app)
            .await;
        assert_eq!(body_json(status).await["status"], "on_leave");

        let record = store
            .find_attendance(employee.id, NaiveDate::from_ymd_opt(2024, 2, 7).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, crate::model::attendance::AttendanceStatus::OnLeave);
    }

    #[actix_web::test]
    async fn apply_validates_range_and_balance() {
        let store = memory_store();
        let (_, token) = onboard(&store, "John Doe", "john@acme.test").await;
        let app = test::init_service(app(store.clone(), config())).await;

        let apply = |body: serde_json::Value| {
            test::TestRequest::post()
                .uri("/api/leave/apply")
                .insert_header(bearer(&token))
                .set_json(body)
        };

        let inverted = apply(json!({
            "type": "paid_leave", "fromDate": "2024-02-07", "toDate": "2024-02-05", "reason": "Trip"
        }))
        .send_request(&app)
        .await;
        assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(inverted).await["message"], "To date must be after from date");

        let too_long = apply(json!({
            "type": "sick_leave", "fromDate": "2024-02-01", "toDate": "2024-02-10", "reason": "Surgery"
        }))
        .send_request(&app)
        .await;
        assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(too_long).await["message"], "Insufficient sick_leave balance");

        let unpaid = apply(json!({
            "type": "unpaid", "fromDate": "2024-02-01", "toDate": "2024-02-20", "reason": "Sabbatical"
        }))
        .send_request(&app)
        .await;
        assert_eq!(unpaid.status(), StatusCode::CREATED);

        let blank = apply(json!({
            "type": "unpaid", "fromDate": "2024-03-01", "toDate": "2024-03-01", "reason": "  "
        }))
        .send_request(&app)
        .await;
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(blank).await["errors"][0]["field"], "reason");
    }

    #[actix_web::test]
    async fn rejection_and_scoped_reads() {
        let store = memory_store();
        let (_, john) = onboard(&store, "John Doe", "john@acme.test").await;
        let (_, jane) = onboard(&store, "Jane Roe", "jane@acme.test").await;
        let app = test::init_service(app(store.clone(), config())).await;

        let resp = test::TestRequest::post()
            .uri("/api/leave/apply")
            .insert_header(bearer(&john))
            .set_json(json!({
                "type": "paid_leave", "fromDate": "2024-04-01", "toDate": "2024-04-02", "reason": "Trip"
            }))
            .send_request(&app)
            .await;
        let leave_id = body_json(resp).await["leave"]["id"].as_u64().unwrap();

        let foreign = test::TestRequest::get()
            .uri(&format!("/api/leave/{leave_id}"))
            .insert_header(bearer(&jane))
            .send_request(&app)
            .await;
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

        let rejected = test::TestRequest::put()
            .uri(&format!("/api/leave/{leave_id}/reject"))
            .insert_header(bearer(&hr_token()))
            .set_json(json!({ "rejectionReason": "Release week" }))
            .send_request(&app)
            .await;
        assert_eq!(rejected.status(), StatusCode::OK);
        let body = body_json(rejected).await;
        assert_eq!(body["leave"]["status"], "rejected");
        assert_eq!(body["leave"]["rejectionReason"], "Release week");
        assert_eq!(body["daysMarked"], 0);

        let pending_decision = test::TestRequest::put()
            .uri(&format!("/api/leave/approve/{leave_id}"))
            .insert_header(bearer(&hr_token()))
            .set_json(json!({ "status": "pending" }))
            .send_request(&app)
            .await;
        assert_eq!(pending_decision.status(), StatusCode::BAD_REQUEST);

        let jane_list = test::TestRequest::get()
            .uri("/api/leave")
            .insert_header(bearer(&jane))
            .send_request(&app)
            .await;
        assert_eq!(body_json(jane_list).await.as_array().unwrap().len(), 0);

        let all = test::TestRequest::get()
            .uri("/api/leave?status=rejected&startDate=2024-04-02&endDate=2024-04-30")
            .insert_header(bearer(&hr_token()))
            .send_request(&app)
            .await;
        assert_eq!(body_json(all).await.as_array().unwrap().len(), 1);

        let stats = test::TestRequest::get()
            .uri("/api/leave/stats")
            .insert_header(bearer(&john))
            .send_request(&app)
            .await;
        let stats = body_json(stats).await;
        assert_eq!(stats["rejected"], 1);
        assert_eq!(stats["total"], 1);

        let missing = test::TestRequest::get()
            .uri("/api/leave/9999")
            .insert_header(bearer(&hr_token()))
            .send_request(&app)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
