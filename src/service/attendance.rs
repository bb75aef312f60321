//! Attendance ledger: explicit marking, check-in/out for today and the
//! leave-aware day status used by every read model.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{HrError, HrResult},
    model::{
        attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
        leave::{LeaveRequest, LeaveStatus},
    },
    store::{AttendanceFilter, EmployeeFilter, HrStore, LeaveFilter, StoreError},
    utils::calendar::{Month, round2},
};

/// Working-day rules applied on check-out.
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    pub standard_work_hours: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            standard_work_hours: 8.0,
        }
    }
}

impl AttendancePolicy {
    /// `(work_hours, extra_hours)` for one check-in/check-out pair.
    pub fn hours(&self, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> (f64, f64) {
        let work_hours = ((check_out - check_in).num_seconds() as f64 / 3600.0).max(0.0);
        let extra_hours = (work_hours - self.standard_work_hours).max(0.0);
        (work_hours, extra_hours)
    }
}

/// Leave wins over raw attendance; a day only counts as present when it was closed.
pub fn resolve_status(record: Option<&AttendanceRecord>, on_approved_leave: bool) -> AttendanceStatus {
    if on_approved_leave {
        AttendanceStatus::OnLeave
    } else if record.is_some_and(AttendanceRecord::is_complete) {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Absent
    }
}

async fn approved_leaves(
    store: &dyn HrStore,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> HrResult<Vec<LeaveRequest>> {
    let filter = LeaveFilter {
        employee_id,
        status: Some(LeaveStatus::Approved),
        overlapping: Some((from, to)),
        ..Default::default()
    };
    Ok(store.list_leaves(&filter).await?)
}

async fn fetch_day(store: &dyn HrStore, employee_id: u64, date: NaiveDate) -> HrResult<AttendanceRecord> {
    store
        .find_attendance(employee_id, date)
        .await?
        .ok_or(HrError::NotFound("Attendance record"))
}

pub async fn mark_attendance(
    store: &dyn HrStore,
    employee_id: u64,
    date: NaiveDate,
    status: AttendanceStatus,
    now: DateTime<Utc>,
) -> HrResult<AttendanceRecord> {
    if !status.is_markable() {
        return Err(HrError::invalid(
            "status",
            "Status must be one of present, absent, half_day",
        ));
    }

    let check_in = (status != AttendanceStatus::Absent).then_some(now);
    let record = NewAttendance {
        employee_id,
        date,
        status,
        check_in,
    };

    match store.insert_attendance(record, now).await {
        Ok(record) => Ok(record),
        Err(StoreError::Duplicate) => Err(HrError::DuplicateAttendance),
        Err(e) => Err(e.into()),
    }
}

pub async fn check_in(store: &dyn HrStore, employee_id: u64, now: DateTime<Utc>) -> HrResult<AttendanceRecord> {
    let today = now.date_naive();

    match store.find_attendance(employee_id, today).await? {
        Some(record) if record.check_in.is_some() => Err(HrError::AlreadyCheckedIn),
        Some(record) => {
            if !store.record_check_in(record.id, now).await? {
                return Err(HrError::AlreadyCheckedIn);
            }
            fetch_day(store, employee_id, today).await
        }
        None => {
            let record = NewAttendance {
                employee_id,
                date: today,
                status: AttendanceStatus::Present,
                check_in: Some(now),
            };
            match store.insert_attendance(record, now).await {
                Ok(record) => Ok(record),
                // a concurrent check-in won the insert
                Err(StoreError::Duplicate) => Err(HrError::AlreadyCheckedIn),
                Err(e) => Err(e.into()),
            }
        }
    }
}

pub async fn check_out(
    store: &dyn HrStore,
    policy: &AttendancePolicy,
    employee_id: u64,
    now: DateTime<Utc>,
) -> HrResult<AttendanceRecord> {
    let today = now.date_naive();

    let record = store
        .find_attendance(employee_id, today)
        .await?
        .ok_or(HrError::NotCheckedIn)?;
    let check_in = record.check_in.ok_or(HrError::NotCheckedIn)?;
    if record.check_out.is_some() {
        return Err(HrError::AlreadyCheckedOut);
    }

    let (work_hours, extra_hours) = policy.hours(check_in, now);
    if !store
        .record_check_out(record.id, now, work_hours, extra_hours)
        .await?
    {
        return Err(HrError::AlreadyCheckedOut);
    }

    fetch_day(store, employee_id, today).await
}

pub async fn day_status(store: &dyn HrStore, employee_id: u64, date: NaiveDate) -> HrResult<AttendanceStatus> {
    let leaves = approved_leaves(store, Some(employee_id), date, date).await?;
    let record = store.find_attendance(employee_id, date).await?;
    Ok(resolve_status(record.as_ref(), !leaves.is_empty()))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayAttendance {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub work_hours: f64,
    pub extra_hours: f64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthTotals {
    pub present_days: u32,
    pub absent_days: u32,
    pub on_leave_days: u32,
    pub work_hours: f64,
    pub extra_hours: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    pub employee_id: u64,
    #[schema(value_type = String, example = "2024-02")]
    pub month: Month,
    pub days: Vec<DayAttendance>,
    pub summary: MonthTotals,
}

/// Per-day status for every calendar day of `month`, oldest first.
pub async fn month_summary(store: &dyn HrStore, employee_id: u64, month: Month) -> HrResult<MonthlyAttendance> {
    let (start, end) = (month.first_day(), month.last_day());

    let leaves = approved_leaves(store, Some(employee_id), start, end).await?;
    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from: Some(start),
            to: Some(end),
        })
        .await?;
    let by_date: HashMap<NaiveDate, &AttendanceRecord> = records.iter().map(|r| (r.date, r)).collect();

    let mut summary = MonthTotals::default();
    let mut days = Vec::with_capacity(month.days() as usize);

    for date in month.each_day() {
        let record = by_date.get(&date).copied();
        let status = resolve_status(record, leaves.iter().any(|l| l.covers(date)));

        match status {
            AttendanceStatus::Present => summary.present_days += 1,
            AttendanceStatus::OnLeave => summary.on_leave_days += 1,
            _ => summary.absent_days += 1,
        }

        let (work_hours, extra_hours) = record.map_or((0.0, 0.0), |r| (r.work_hours, r.extra_hours));
        summary.work_hours += work_hours;
        summary.extra_hours += extra_hours;

        days.push(DayAttendance {
            date,
            status,
            check_in: record.and_then(|r| r.check_in),
            check_out: record.and_then(|r| r.check_out),
            work_hours,
            extra_hours,
        });
    }

    summary.work_hours = round2(summary.work_hours);
    summary.extra_hours = round2(summary.extra_hours);

    Ok(MonthlyAttendance {
        employee_id,
        month,
        days,
        summary,
    })
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayAttendance {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub record: Option<AttendanceRecord>,
}

pub async fn today(store: &dyn HrStore, employee_id: u64, now: DateTime<Utc>) -> HrResult<TodayAttendance> {
    let date = now.date_naive();
    let leaves = approved_leaves(store, Some(employee_id), date, date).await?;
    let record = store.find_attendance(employee_id, date).await?;

    Ok(TodayAttendance {
        date,
        status: resolve_status(record.as_ref(), !leaves.is_empty()),
        record,
    })
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub present: u32,
    pub absent: u32,
    pub half_day: u32,
    pub on_leave: u32,
    pub total: u32,
}

/// Counts of stored records by status; days without a record are not counted.
pub async fn stats(store: &dyn HrStore, employee_id: u64, month: Month) -> HrResult<AttendanceStats> {
    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from: Some(month.first_day()),
            to: Some(month.last_day()),
        })
        .await?;

    let mut stats = AttendanceStats::default();
    for record in &records {
        match record.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::HalfDay => stats.half_day += 1,
            AttendanceStatus::OnLeave => stats.on_leave += 1,
        }
        stats.total += 1;
    }
    Ok(stats)
}

pub async fn list(store: &dyn HrStore, filter: &AttendanceFilter) -> HrResult<Vec<AttendanceRecord>> {
    Ok(store.list_attendance(filter).await?)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub employee_id: u64,
    pub login_id: String,
    pub name: String,
    pub department: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub work_hours: f64,
    pub extra_hours: f64,
}

/// Status of every active employee (or just one) on `date`.
pub async fn admin_roster(
    store: &dyn HrStore,
    date: NaiveDate,
    employee_id: Option<u64>,
) -> HrResult<Vec<RosterEntry>> {
    let employees = match employee_id {
        Some(id) => vec![
            store
                .find_employee(id)
                .await?
                .ok_or(HrError::NotFound("Employee"))?,
        ],
        None => {
            store
                .list_employees(&EmployeeFilter {
                    is_active: Some(true),
                    ..Default::default()
                })
                .await?
        }
    };

    let leaves = approved_leaves(store, employee_id, date, date).await?;
    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id,
            from: Some(date),
            to: Some(date),
        })
        .await?;
    let by_employee: HashMap<u64, &AttendanceRecord> =
        records.iter().map(|r| (r.employee_id, r)).collect();

    Ok(employees
        .into_iter()
        .map(|employee| {
            let record = by_employee.get(&employee.id).copied();
            let on_leave = leaves.iter().any(|l| l.employee_id == employee.id);
            RosterEntry {
                employee_id: employee.id,
                login_id: employee.login_id,
                name: employee.name,
                department: employee.department,
                date,
                status: resolve_status(record, on_leave),
                check_in: record.and_then(|r| r.check_in),
                check_out: record.and_then(|r| r.check_out),
                work_hours: record.map_or(0.0, |r| r.work_hours),
                extra_hours: record.map_or(0.0, |r| r.extra_hours),
            }
        })
        .collect())
}
