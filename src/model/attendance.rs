use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[serde(alias = "half-day")]
    #[strum(to_string = "half_day", serialize = "half-day")]
    HalfDay,
    OnLeave,
}

impl AttendanceStatus {
    /// Statuses an employee may record by hand; `on_leave` only comes from leave approval.
    pub fn is_markable(self) -> bool {
        !matches!(self, AttendanceStatus::OnLeave)
    }
}

/// One row per employee per calendar day.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub work_hours: f64,
    pub extra_hours: f64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_complete(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
}
