//! Leave ledger. Approval is the only path that touches balances and attendance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    error::{FieldError, HrError, HrResult},
    model::leave::{LeaveBalance, LeaveDecision, LeaveRequest, LeaveStatus, LeaveType, NewLeave},
    store::{HrStore, LeaveFilter},
    utils::calendar::{days_inclusive, each_day},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    #[serde(rename = "type", alias = "leaveType")]
    #[schema(example = "sick_leave")]
    pub leave_type: LeaveType,
    #[serde(alias = "startDate")]
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[serde(alias = "endDate")]
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Flu")]
    pub reason: String,
    /// Opaque reference to an already uploaded document.
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDecisionRequest {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub leave: LeaveRequest,
    /// Attendance days flipped to `on_leave`; zero for rejections.
    pub days_marked: u32,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct LeaveStats {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub total: u32,
}

pub async fn apply(
    store: &dyn HrStore,
    employee_id: u64,
    application: LeaveApplication,
    now: DateTime<Utc>,
) -> HrResult<LeaveRequest> {
    let reason = application.reason.trim().to_string();
    if reason.is_empty() {
        return Err(HrError::Validation(vec![FieldError::new(
            "reason",
            "Reason is required",
        )]));
    }
    if application.to_date < application.from_date {
        return Err(HrError::InvalidRange);
    }

    let number_of_days = days_inclusive(application.from_date, application.to_date);

    if application.leave_type.is_balance_limited() {
        let balance = store.leave_balance(employee_id, now).await?;
        let available = balance.available(application.leave_type).unwrap_or(0);
        if i64::from(number_of_days) > i64::from(available) {
            return Err(HrError::InsufficientBalance(application.leave_type));
        }
    }

    let leave = store
        .insert_leave(
            NewLeave {
                employee_id,
                leave_type: application.leave_type,
                from_date: application.from_date,
                to_date: application.to_date,
                number_of_days,
                reason,
                attachment: application.attachment.filter(|a| !a.trim().is_empty()),
            },
            now,
        )
        .await?;

    info!(
        leave_id = leave.id,
        employee_id,
        leave_type = %leave.leave_type,
        days = number_of_days,
        "Leave request submitted"
    );
    Ok(leave)
}

pub async fn get(store: &dyn HrStore, leave_id: u64) -> HrResult<LeaveRequest> {
    store
        .find_leave(leave_id)
        .await?
        .ok_or(HrError::NotFound("Leave request"))
}

async fn pending(store: &dyn HrStore, leave_id: u64) -> HrResult<LeaveRequest> {
    let leave = get(store, leave_id).await?;
    if leave.status != LeaveStatus::Pending {
        return Err(HrError::AlreadyProcessed);
    }
    Ok(leave)
}

pub async fn approve(
    store: &dyn HrStore,
    leave_id: u64,
    approver_id: u64,
    now: DateTime<Utc>,
) -> HrResult<DecisionOutcome> {
    let leave = pending(store, leave_id).await?;

    let decision = LeaveDecision {
        status: LeaveStatus::Approved,
        decided_by: approver_id,
        decided_at: now,
        rejection_reason: None,
    };
    // transition first: a second approver loses here and never debits
    if !store.decide_leave(leave_id, &decision).await? {
        return Err(HrError::AlreadyProcessed);
    }

    store
        .debit_leave_balance(leave.employee_id, leave.leave_type, leave.number_of_days, now)
        .await?;

    let mut days_marked = 0;
    for date in each_day(leave.from_date, leave.to_date) {
        match store.upsert_on_leave(leave.employee_id, date, now).await {
            Ok(()) => days_marked += 1,
            Err(e) => warn!(
                error = %e,
                leave_id,
                employee_id = leave.employee_id,
                %date,
                "Failed to mark attendance day as on_leave"
            ),
        }
    }

    info!(
        leave_id,
        employee_id = leave.employee_id,
        approver_id,
        days_marked,
        "Leave approved"
    );

    Ok(DecisionOutcome {
        leave: get(store, leave_id).await?,
        days_marked,
    })
}

pub async fn reject(
    store: &dyn HrStore,
    leave_id: u64,
    approver_id: u64,
    rejection_reason: Option<String>,
    now: DateTime<Utc>,
) -> HrResult<DecisionOutcome> {
    pending(store, leave_id).await?;

    let decision = LeaveDecision {
        status: LeaveStatus::Rejected,
        decided_by: approver_id,
        decided_at: now,
        rejection_reason: rejection_reason.filter(|r| !r.trim().is_empty()),
    };
    if !store.decide_leave(leave_id, &decision).await? {
        return Err(HrError::AlreadyProcessed);
    }

    info!(leave_id, approver_id, "Leave rejected");

    Ok(DecisionOutcome {
        leave: get(store, leave_id).await?,
        days_marked: 0,
    })
}

pub async fn decide(
    store: &dyn HrStore,
    leave_id: u64,
    approver_id: u64,
    request: LeaveDecisionRequest,
    now: DateTime<Utc>,
) -> HrResult<DecisionOutcome> {
    match request.status {
        LeaveStatus::Approved => approve(store, leave_id, approver_id, now).await,
        LeaveStatus::Rejected => reject(store, leave_id, approver_id, request.rejection_reason, now).await,
        LeaveStatus::Pending => Err(HrError::invalid(
            "status",
            "Status must be approved or rejected",
        )),
    }
}

/// Opens the default balance on first read, so the employee must exist.
pub async fn balance(store: &dyn HrStore, employee_id: u64, now: DateTime<Utc>) -> HrResult<LeaveBalance> {
    if store.find_employee(employee_id).await?.is_none() {
        return Err(HrError::NotFound("Employee"));
    }
    Ok(store.leave_balance(employee_id, now).await?)
}

pub async fn stats(store: &dyn HrStore, employee_id: Option<u64>) -> HrResult<LeaveStats> {
    let leaves = store
        .list_leaves(&LeaveFilter {
            employee_id,
            ..Default::default()
        })
        .await?;

    let mut stats = LeaveStats::default();
    for leave in &leaves {
        match leave.status {
            LeaveStatus::Pending => stats.pending += 1,
            LeaveStatus::Approved => stats.approved += 1,
            LeaveStatus::Rejected => stats.rejected += 1,
        }
        stats.total += 1;
    }
    Ok(stats)
}

pub async fn list(store: &dyn HrStore, filter: &LeaveFilter) -> HrResult<Vec<LeaveRequest>> {
    Ok(store.list_leaves(filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::attendance::{AttendanceStatus, NewAttendance},
        store::{MemoryStore, testing::FaultyStore},
    };

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn application(leave_type: LeaveType, from: &str, to: &str) -> LeaveApplication {
        LeaveApplication {
            leave_type,
            from_date: date(from),
            to_date: date(to),
            reason: "family event".into(),
            attachment: None,
        }
    }

    #[actix_web::test]
    async fn inverted_range_is_rejected() {
        let store = MemoryStore::new();
        let err = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-05", "2024-02-01"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, HrError::InvalidRange));
    }

    #[actix_web::test]
    async fn blank_reason_is_a_field_error() {
        let store = MemoryStore::new();
        let mut app = application(LeaveType::PaidLeave, "2024-02-01", "2024-02-01");
        app.reason = "  ".into();
        match apply(&store, 1, app, Utc::now()).await {
            Err(HrError::Validation(errors)) => assert_eq!(errors[0].field, "reason"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn balance_limits_paid_and_sick_only() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let err = apply(&store, 1, application(LeaveType::SickLeave, "2024-02-01", "2024-02-07"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, HrError::InsufficientBalance(LeaveType::SickLeave)));

        let ok = apply(&store, 1, application(LeaveType::SickLeave, "2024-02-01", "2024-02-06"), now)
            .await
            .unwrap();
        assert_eq!(ok.number_of_days, 6);
        assert_eq!(ok.status, LeaveStatus::Pending);

        let unpaid = apply(&store, 1, application(LeaveType::UnpaidLeave, "2024-01-01", "2024-03-31"), now)
            .await
            .unwrap();
        assert_eq!(unpaid.number_of_days, 91);
    }

    #[actix_web::test]
    async fn approval_debits_balance_and_marks_days() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let checked_in = date("2024-02-02").and_hms_opt(9, 0, 0).unwrap().and_utc();
        store
            .insert_attendance(
                NewAttendance {
                    employee_id: 1,
                    date: date("2024-02-02"),
                    status: AttendanceStatus::Present,
                    check_in: Some(checked_in),
                },
                now,
            )
            .await
            .unwrap();

        let leave = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-01", "2024-02-03"), now)
            .await
            .unwrap();
        let outcome = approve(&store, leave.id, 42, now).await.unwrap();

        assert_eq!(outcome.days_marked, 3);
        assert_eq!(outcome.leave.status, LeaveStatus::Approved);
        assert_eq!(outcome.leave.approved_by, Some(42));

        let balance = store.leave_balance(1, now).await.unwrap();
        assert_eq!(balance.paid_leave, 9);
        assert_eq!(balance.sick_leave, 6);

        let merged = store.find_attendance(1, date("2024-02-02")).await.unwrap().unwrap();
        assert_eq!(merged.status, AttendanceStatus::OnLeave);
        assert_eq!(merged.check_in, Some(checked_in));
        for day in ["2024-02-01", "2024-02-03"] {
            let record = store.find_attendance(1, date(day)).await.unwrap().unwrap();
            assert_eq!(record.status, AttendanceStatus::OnLeave);
        }
    }

    #[actix_web::test]
    async fn unpaid_approval_leaves_balance_alone() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let leave = apply(&store, 1, application(LeaveType::UnpaidLeave, "2024-02-01", "2024-02-02"), now)
            .await
            .unwrap();
        approve(&store, leave.id, 42, now).await.unwrap();

        let balance = store.leave_balance(1, now).await.unwrap();
        assert_eq!(
            (balance.paid_leave, balance.sick_leave, balance.unpaid_leave),
            (12, 6, 0)
        );
    }

    #[actix_web::test]
    async fn decisions_are_final() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let leave = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-01", "2024-02-01"), now)
            .await
            .unwrap();

        let rejected = decide(
            &store,
            leave.id,
            42,
            LeaveDecisionRequest {
                status: LeaveStatus::Rejected,
                rejection_reason: Some("busy quarter".into()),
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(rejected.leave.status, LeaveStatus::Rejected);
        assert_eq!(rejected.leave.rejection_reason.as_deref(), Some("busy quarter"));
        assert_eq!(rejected.days_marked, 0);

        assert!(matches!(
            approve(&store, leave.id, 42, now).await,
            Err(HrError::AlreadyProcessed)
        ));
        assert!(matches!(
            approve(&store, 999, 42, now).await,
            Err(HrError::NotFound(_))
        ));
        assert!(store.find_attendance(1, date("2024-02-01")).await.unwrap().is_none());
        assert_eq!(store.leave_balance(1, now).await.unwrap().paid_leave, 12);
    }

    #[actix_web::test]
    async fn pending_is_not_a_decision() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let leave = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-01", "2024-02-01"), now)
            .await
            .unwrap();
        let err = decide(
            &store,
            leave.id,
            42,
            LeaveDecisionRequest {
                status: LeaveStatus::Pending,
                rejection_reason: None,
            },
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HrError::Validation(_)));
    }

    #[actix_web::test]
    async fn stats_count_by_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-01", "2024-02-01"), now)
            .await
            .unwrap();
        apply(&store, 1, application(LeaveType::PaidLeave, "2024-03-01", "2024-03-01"), now)
            .await
            .unwrap();
        apply(&store, 2, application(LeaveType::PaidLeave, "2024-03-01", "2024-03-01"), now)
            .await
            .unwrap();
        approve(&store, a.id, 42, now).await.unwrap();

        assert_eq!(
            stats(&store, Some(1)).await.unwrap(),
            LeaveStats {
                pending: 1,
                approved: 1,
                rejected: 0,
                total: 2,
            }
        );
        assert_eq!(stats(&store, None).await.unwrap().total, 3);
    }

    #[actix_web::test]
    async fn balance_of_unknown_employee_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            balance(&store, 424242, Utc::now()).await,
            Err(HrError::NotFound("Employee"))
        ));
    }

    #[actix_web::test]
    async fn approval_survives_a_failed_attendance_day() {
        let store = FaultyStore {
            fail_on_leave_date: Some(date("2024-02-02")),
            ..Default::default()
        };
        let now = Utc::now();
        let leave = apply(&store, 1, application(LeaveType::PaidLeave, "2024-02-01", "2024-02-03"), now)
            .await
            .unwrap();

        let outcome = approve(&store, leave.id, 42, now).await.unwrap();
        assert_eq!(outcome.days_marked, 2);
        assert_eq!(outcome.leave.status, LeaveStatus::Approved);
        assert_eq!(store.leave_balance(1, now).await.unwrap().paid_leave, 9);

        assert!(store.find_attendance(1, date("2024-02-02")).await.unwrap().is_none());
        for day in ["2024-02-01", "2024-02-03"] {
            let record = store.find_attendance(1, date(day)).await.unwrap().unwrap();
            assert_eq!(record.status, AttendanceStatus::OnLeave);
        }
    }
}
