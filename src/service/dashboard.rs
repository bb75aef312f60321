//! Headline numbers for the admin landing page.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::HrResult,
    model::leave::{LeaveRequest, LeaveStatus},
    store::{AttendanceFilter, EmployeeFilter, HrStore, LeaveFilter},
};

const RECENT_PENDING_LEAVES: usize = 5;

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_employees: usize,
    pub active_employees: usize,
    pub pending_leaves: usize,
    /// Attendance rows recorded for today, whatever their status.
    pub today_attendance: usize,
}

/// A pending request with enough of the requester to act on it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingLeave {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    pub employee_name: Option<String>,
    pub employee_email: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    /// Newest first.
    pub recent_leaves: Vec<PendingLeave>,
}

pub async fn dashboard(store: &dyn HrStore, now: DateTime<Utc>) -> HrResult<Dashboard> {
    let today = now.date_naive();

    let employees = store.list_employees(&EmployeeFilter::default()).await?;
    let pending = store
        .list_leaves(&LeaveFilter {
            status: Some(LeaveStatus::Pending),
            ..Default::default()
        })
        .await?;
    let today_attendance = store
        .list_attendance(&AttendanceFilter {
            employee_id: None,
            from: Some(today),
            to: Some(today),
        })
        .await?
        .len();

    let stats = DashboardStats {
        total_employees: employees.len(),
        active_employees: employees.iter().filter(|e| e.is_active).count(),
        pending_leaves: pending.len(),
        today_attendance,
    };

    let by_id: HashMap<u64, _> = employees.iter().map(|e| (e.id, e)).collect();
    let recent_leaves = pending
        .into_iter()
        .take(RECENT_PENDING_LEAVES)
        .map(|leave| {
            let employee = by_id.get(&leave.employee_id);
            PendingLeave {
                employee_name: employee.map(|e| e.name.clone()),
                employee_email: employee.map(|e| e.email.clone()),
                department: employee.and_then(|e| e.department.clone()),
                leave,
            }
        })
        .collect();

    Ok(Dashboard {
        stats,
        recent_leaves,
    })
}
