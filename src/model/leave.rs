use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    #[serde(alias = "annual")]
    PaidLeave,
    #[serde(alias = "sick")]
    SickLeave,
    #[serde(alias = "unpaid")]
    UnpaidLeave,
}

impl LeaveType {
    /// Unpaid leave never touches a balance.
    pub fn is_balance_limited(self) -> bool {
        !matches!(self, LeaveType::UnpaidLeave)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "employeeId": 1000,
    "leaveType": "sick_leave",
    "fromDate": "2026-01-01",
    "toDate": "2026-01-03",
    "numberOfDays": 3,
    "reason": "Flu",
    "attachment": null,
    "status": "pending",
    "approvedBy": null,
    "approvedAt": null,
    "rejectionReason": null,
    "createdAt": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    pub number_of_days: u32,
    pub reason: String,
    pub attachment: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.from_date <= end && self.to_date >= start
    }
}

#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub number_of_days: u32,
    pub reason: String,
    pub attachment: Option<String>,
}

/// The terminal transition out of `pending`.
#[derive(Debug, Clone)]
pub struct LeaveDecision {
    pub status: LeaveStatus,
    pub decided_by: u64,
    pub decided_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub employee_id: u64,
    #[schema(example = 12)]
    pub paid_leave: i32,
    #[schema(example = 6)]
    pub sick_leave: i32,
    #[schema(example = 0)]
    pub unpaid_leave: i32,
    #[schema(value_type = String, format = "date-time")]
    pub last_updated: DateTime<Utc>,
}

impl LeaveBalance {
    pub const DEFAULT_PAID: i32 = 12;
    pub const DEFAULT_SICK: i32 = 6;

    pub fn opening(employee_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            employee_id,
            paid_leave: Self::DEFAULT_PAID,
            sick_leave: Self::DEFAULT_SICK,
            unpaid_leave: 0,
            last_updated: now,
        }
    }

    /// Remaining days for a balance-limited type; `None` for unpaid leave.
    pub fn available(&self, leave_type: LeaveType) -> Option<i32> {
        match leave_type {
            LeaveType::PaidLeave => Some(self.paid_leave),
            LeaveType::SickLeave => Some(self.sick_leave),
            LeaveType::UnpaidLeave => None,
        }
    }

    pub fn debit(&mut self, leave_type: LeaveType, days: u32, now: DateTime<Utc>) {
        let days = days as i32;
        match leave_type {
            LeaveType::PaidLeave => self.paid_leave -= days,
            LeaveType::SickLeave => self.sick_leave -= days,
            LeaveType::UnpaidLeave => {}
        }
        self.last_updated = now;
    }
}
