use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Monetary and attendance inputs of one payroll run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollFigures {
    pub basic: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub attendance_days: f64,
    pub leave_days: u32,
}

impl PayrollFigures {
    pub fn net_salary(&self) -> f64 {
        self.basic + self.allowances - self.deductions
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "employeeId": 1000,
    "month": "2024-02",
    "basic": 30000.0,
    "allowances": 0.0,
    "deductions": 2222.22,
    "netSalary": 27777.78,
    "attendanceDays": 25.0,
    "leaveDays": 2,
    "isLocked": false,
    "lockedAt": null,
    "lockedBy": null,
    "createdAt": "2024-03-01T00:00:00Z",
    "updatedAt": "2024-03-01T00:00:00Z"
}))]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    /// `YYYY-MM`
    pub month: String,
    pub basic: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub attendance_days: f64,
    pub leave_days: u32,
    pub is_locked: bool,
    #[schema(value_type = String, format = "date-time")]
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl PayrollRecord {
    /// Overwrites the figures; net salary is always derived, never taken from input.
    pub fn apply(&mut self, figures: &PayrollFigures, now: DateTime<Utc>) {
        self.basic = figures.basic;
        self.allowances = figures.allowances;
        self.deductions = figures.deductions;
        self.attendance_days = figures.attendance_days;
        self.leave_days = figures.leave_days;
        self.net_salary = figures.net_salary();
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_salary_is_derived() {
        let figures = PayrollFigures {
            basic: 30_000.0,
            allowances: 1_000.0,
            deductions: 500.0,
            attendance_days: 20.0,
            leave_days: 0,
        };
        assert_eq!(figures.net_salary(), 30_500.0);

        let now = Utc::now();
        let mut record = PayrollRecord {
            id: 1,
            employee_id: 1,
            month: "2024-02".into(),
            basic: 0.0,
            allowances: 0.0,
            deductions: 0.0,
            net_salary: 999.0,
            attendance_days: 0.0,
            leave_days: 0,
            is_locked: false,
            locked_at: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        };
        record.apply(&figures, now);
        assert_eq!(record.net_salary, 30_500.0);
    }
}
