//! Payroll generator: attendance and approved leave of one employee-month,
//! folded into a draft record that can be regenerated until it is locked.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{FieldError, HrError, HrResult},
    model::{
        attendance::{AttendanceRecord, AttendanceStatus},
        leave::{LeaveRequest, LeaveStatus},
        payroll::{PayrollFigures, PayrollRecord},
    },
    store::{AttendanceFilter, HrStore, LeaveFilter, PayrollFilter, StoreError},
    utils::calendar::{Month, days_inclusive},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayroll {
    #[serde(alias = "userId")]
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2024-02")]
    pub month: String,
    #[schema(example = 30000.0)]
    pub basic: f64,
    #[serde(default)]
    #[schema(example = 0.0)]
    pub allowances: f64,
}

/// Present days count fully, half days count half.
pub fn attendance_days(records: &[AttendanceRecord]) -> f64 {
    records
        .iter()
        .map(|r| match r.status {
            AttendanceStatus::Present => 1.0,
            AttendanceStatus::HalfDay => 0.5,
            _ => 0.0,
        })
        .sum()
}

/// Leave days inside `month`, each leave clipped to the month bounds.
pub fn leave_days(leaves: &[LeaveRequest], month: Month) -> u32 {
    let (start, end) = (month.first_day(), month.last_day());
    leaves
        .iter()
        .map(|l| days_inclusive(l.from_date.max(start), l.to_date.min(end)))
        .sum()
}

pub fn compute_deductions(days_in_month: u32, leave_days: u32, attendance_days: f64, basic: f64) -> f64 {
    let expected_days = f64::from(days_in_month) - f64::from(leave_days);
    if expected_days <= 0.0 {
        return 0.0;
    }
    let per_day = basic / expected_days;
    let absent_days = expected_days - attendance_days;
    (absent_days * per_day).max(0.0)
}

fn validate(request: &GeneratePayroll) -> HrResult<Month> {
    let mut errors = Vec::new();

    let month = match request.month.parse::<Month>() {
        Ok(month) => Some(month),
        Err(message) => {
            errors.push(FieldError::new("month", message));
            None
        }
    };
    if !request.basic.is_finite() || request.basic < 0.0 {
        errors.push(FieldError::new("basic", "Basic must be a non-negative number"));
    }
    if !request.allowances.is_finite() || request.allowances < 0.0 {
        errors.push(FieldError::new("allowances", "Allowances must be a non-negative number"));
    }

    match month {
        Some(month) if errors.is_empty() => Ok(month),
        _ => Err(HrError::Validation(errors)),
    }
}

async fn figures_for(
    store: &dyn HrStore,
    employee_id: u64,
    month: Month,
    basic: f64,
    allowances: f64,
) -> HrResult<PayrollFigures> {
    let (start, end) = (month.first_day(), month.last_day());

    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from: Some(start),
            to: Some(end),
        })
        .await?;
    let leaves = store
        .list_leaves(&LeaveFilter {
            employee_id: Some(employee_id),
            status: Some(LeaveStatus::Approved),
            overlapping: Some((start, end)),
            ..Default::default()
        })
        .await?;

    let attendance_days = attendance_days(&records);
    let leave_days = leave_days(&leaves, month);

    Ok(PayrollFigures {
        basic,
        allowances,
        deductions: compute_deductions(month.days(), leave_days, attendance_days, basic),
        attendance_days,
        leave_days,
    })
}

pub async fn generate(store: &dyn HrStore, request: GeneratePayroll, now: DateTime<Utc>) -> HrResult<PayrollRecord> {
    let month = validate(&request)?;
    let month_key = month.to_string();
    let employee_id = request.employee_id;

    if store.find_employee(employee_id).await?.is_none() {
        return Err(HrError::NotFound("Employee"));
    }

    let existing = store.find_payroll_for(employee_id, &month_key).await?;
    if existing.as_ref().is_some_and(|p| p.is_locked) {
        return Err(HrError::PayrollLocked);
    }

    let figures = figures_for(store, employee_id, month, request.basic, request.allowances).await?;

    let record = match existing {
        Some(existing) => {
            // lost a race against lock
            if !store.update_unlocked_payroll(existing.id, &figures, now).await? {
                return Err(HrError::PayrollLocked);
            }
            get(store, existing.id).await?
        }
        None => match store.insert_payroll(employee_id, &month_key, &figures, now).await {
            Ok(record) => record,
            Err(StoreError::Duplicate) => return Err(HrError::PayrollExists),
            Err(e) => return Err(e.into()),
        },
    };

    info!(
        payroll_id = record.id,
        employee_id,
        month = %month_key,
        deductions = record.deductions,
        net_salary = record.net_salary,
        "Payroll generated"
    );
    Ok(record)
}

pub async fn lock(store: &dyn HrStore, payroll_id: u64, locker_id: u64, now: DateTime<Utc>) -> HrResult<PayrollRecord> {
    let record = get(store, payroll_id).await?;
    if record.is_locked {
        return Err(HrError::AlreadyLocked);
    }
    if !store.lock_payroll(payroll_id, locker_id, now).await? {
        return Err(HrError::AlreadyLocked);
    }

    info!(payroll_id, locker_id, employee_id = record.employee_id, month = %record.month, "Payroll locked");
    get(store, payroll_id).await
}

pub async fn get(store: &dyn HrStore, payroll_id: u64) -> HrResult<PayrollRecord> {
    store
        .find_payroll(payroll_id)
        .await?
        .ok_or(HrError::NotFound("Payroll"))
}

pub async fn list(store: &dyn HrStore, filter: &PayrollFilter) -> HrResult<Vec<PayrollRecord>> {
    Ok(store.list_payrolls(filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            attendance::NewAttendance,
            employee::NewEmployee,
            leave::{LeaveDecision, LeaveType, NewLeave},
        },
        store::{MemoryStore, testing::FaultyStore},
    };
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seeded_store() -> (MemoryStore, u64) {
        let store = MemoryStore::new();
        let employee = store
            .insert_employee(
                NewEmployee {
                    login_id: "ACJD20240001".into(),
                    name: "John Doe".into(),
                    email: "john@acme.test".into(),
                    company: "Acme".into(),
                    company_code: "AC".into(),
                    department: None,
                    phone: None,
                    year_of_joining: 2024,
                    serial_number: 1,
                    employee_initials: "JD".into(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        (store, employee.id)
    }

    async fn approved_leave(store: &MemoryStore, employee_id: u64, from: &str, to: &str) {
        let now = Utc::now();
        let leave = store
            .insert_leave(
                NewLeave {
                    employee_id,
                    leave_type: LeaveType::PaidLeave,
                    from_date: date(from),
                    to_date: date(to),
                    number_of_days: days_inclusive(date(from), date(to)),
                    reason: "trip".into(),
                    attachment: None,
                },
                now,
            )
            .await
            .unwrap();
        store
            .decide_leave(
                leave.id,
                &LeaveDecision {
                    status: LeaveStatus::Approved,
                    decided_by: 99,
                    decided_at: now,
                    rejection_reason: None,
                },
            )
            .await
            .unwrap();
    }

    fn request(employee_id: u64, month: &str, basic: f64) -> GeneratePayroll {
        GeneratePayroll {
            employee_id,
            month: month.into(),
            basic,
            allowances: 0.0,
        }
    }

    #[test]
    fn deductions_follow_expected_days() {
        let deductions = compute_deductions(29, 2, 25.0, 30_000.0);
        assert!((deductions - 2_222.222_222).abs() < 1e-3);
        assert_eq!(compute_deductions(29, 2, 27.0, 30_000.0), 0.0);
        // more attendance than expected never turns into a bonus
        assert_eq!(compute_deductions(29, 2, 28.0, 30_000.0), 0.0);
        assert_eq!(compute_deductions(29, 29, 0.0, 30_000.0), 0.0);
    }

    #[test]
    fn leave_is_clipped_to_month() {
        let month: Month = "2024-02".parse().unwrap();
        let now = Utc::now();
        let leave = |from: &str, to: &str| LeaveRequest {
            id: 1,
            employee_id: 1,
            leave_type: LeaveType::PaidLeave,
            from_date: date(from),
            to_date: date(to),
            number_of_days: 0,
            reason: String::new(),
            attachment: None,
            status: LeaveStatus::Approved,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
        };
        let leaves = [leave("2024-01-30", "2024-02-01"), leave("2024-02-28", "2024-03-04")];
        assert_eq!(leave_days(&leaves, month), 3);
    }

    #[actix_web::test]
    async fn generates_february_example() {
        let (store, id) = seeded_store().await;
        let now = Utc::now();

        for day in 3..=27 {
            store
                .insert_attendance(
                    NewAttendance {
                        employee_id: id,
                        date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                        status: AttendanceStatus::Present,
                        check_in: None,
                    },
                    now,
                )
                .await
                .unwrap();
        }
        approved_leave(&store, id, "2024-02-01", "2024-02-02").await;

        let record = generate(&store, request(id, "2024-02", 30_000.0), now).await.unwrap();
        assert_eq!(record.attendance_days, 25.0);
        assert_eq!(record.leave_days, 2);
        assert!((record.deductions - 2_222.22).abs() < 0.01);
        assert_eq!(record.net_salary, record.basic + record.allowances - record.deductions);
        assert!(!record.is_locked);
    }

    #[actix_web::test]
    async fn regenerating_overwrites_until_locked() {
        let (store, id) = seeded_store().await;
        let now = Utc::now();

        let first = generate(&store, request(id, "2024-02", 30_000.0), now).await.unwrap();
        let mut second = request(id, "2024-02", 31_000.0);
        second.allowances = 500.0;
        let second = generate(&store, second, now).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.basic, 31_000.0);
        assert_eq!(second.allowances, 500.0);

        let locked = lock(&store, first.id, 7, now).await.unwrap();
        assert!(locked.is_locked);
        assert_eq!(locked.locked_by, Some(7));

        assert!(matches!(
            generate(&store, request(id, "2024-02", 1.0), now).await,
            Err(HrError::PayrollLocked)
        ));
        assert_eq!(get(&store, first.id).await.unwrap().basic, 31_000.0);

        assert!(matches!(lock(&store, first.id, 7, now).await, Err(HrError::AlreadyLocked)));
        assert!(matches!(lock(&store, 999, 7, now).await, Err(HrError::NotFound("Payroll"))));
    }

    #[actix_web::test]
    async fn invalid_input_is_reported_per_field() {
        let (store, id) = seeded_store().await;
        let mut bad = request(id, "2024-13", -5.0);
        bad.allowances = -1.0;

        match generate(&store, bad, Utc::now()).await {
            Err(HrError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["month", "basic", "allowances"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn list_is_scoped_and_sorted() {
        let (store, id) = seeded_store().await;
        let now = Utc::now();
        generate(&store, request(id, "2024-01", 1_000.0), now).await.unwrap();
        generate(&store, request(id, "2024-03", 1_000.0), now).await.unwrap();

        let all = list(&store, &PayrollFilter::default()).await.unwrap();
        let months: Vec<_> = all.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, ["2024-03", "2024-01"]);

        let march = list(
            &store,
            &PayrollFilter {
                employee_id: Some(id),
                month: Some("2024-03".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(march.len(), 1);
    }

    #[actix_web::test]
    async fn concurrent_first_generation_is_a_conflict() {
        let (inner, id) = seeded_store().await;
        let store = FaultyStore {
            inner,
            payroll_insert_clashes: true,
            ..Default::default()
        };

        assert!(matches!(
            generate(&store, request(id, "2024-02", 30_000.0), Utc::now()).await,
            Err(HrError::PayrollExists)
        ));
    }

    #[actix_web::test]
    async fn regeneration_racing_a_lock_reports_locked() {
        let (inner, id) = seeded_store().await;
        let mut store = FaultyStore {
            inner,
            ..Default::default()
        };
        let now = Utc::now();
        let draft = generate(&store, request(id, "2024-02", 30_000.0), now).await.unwrap();

        store.payroll_update_loses_to_lock = true;
        assert!(matches!(
            generate(&store, request(id, "2024-02", 31_000.0), now).await,
            Err(HrError::PayrollLocked)
        ));
        assert_eq!(get(&store, draft.id).await.unwrap().basic, 30_000.0);
    }
}
