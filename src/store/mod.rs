//! Persistence seam. Handlers and services only ever see [`HrStore`].
//!
//! Writes that guard an invariant are conditional in every backend:
//! attendance is unique per `(employee, date)`, payroll per `(employee, month)`,
//! leave decisions only leave `pending`, payroll updates and locks only touch
//! unlocked rows.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::model::{
    attendance::{AttendanceRecord, NewAttendance},
    employee::{Employee, NewEmployee},
    leave::{LeaveBalance, LeaveDecision, LeaveRequest, LeaveStatus, LeaveType, NewLeave},
    payroll::{PayrollFigures, PayrollRecord},
    role::Role,
    salary::SalaryProfile,
    user::{NewUser, User},
};

pub mod memory;
pub mod mysql;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "duplicate key")]
    Duplicate,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub employee_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    /// Inclusive window the leave range must overlap.
    pub overlapping: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub employee_id: Option<u64>,
    pub month: Option<String>,
}

#[async_trait]
pub trait HrStore: Send + Sync {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User>;
    async fn find_user(&self, id: u64) -> StoreResult<Option<User>>;
    async fn find_user_by_login_id(&self, login_id: &str) -> StoreResult<Option<User>>;
    /// Stores a new hash and clears the first-login flag.
    async fn set_password(&self, user_id: u64, password_hash: &str) -> StoreResult<()>;
    async fn record_login(&self, user_id: u64, at: DateTime<Utc>) -> StoreResult<()>;
    async fn login_ids(&self) -> StoreResult<Vec<String>>;
    async fn recent_login_ids(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>>;

    async fn insert_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// `false` when the token is unknown or was already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool>;

    async fn insert_employee(&self, employee: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee>;
    /// Inserts an employee and its login as one unit: either both rows exist
    /// afterwards or neither does. `account.employee_id` is overwritten with the
    /// new employee's id.
    async fn insert_employee_account(
        &self,
        employee: NewEmployee,
        account: NewUser,
        now: DateTime<Utc>,
    ) -> StoreResult<(Employee, User)>;
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>>;
    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>>;
    /// Sorted by name.
    async fn list_employees(&self, filter: &EmployeeFilter) -> StoreResult<Vec<Employee>>;
    async fn update_employee(&self, employee: &Employee) -> StoreResult<()>;
    /// Flips the employee and every login linked to it. `false` when the employee is unknown.
    async fn set_employee_active(&self, employee_id: u64, active: bool, now: DateTime<Utc>) -> StoreResult<bool>;
    /// `false` when no login is linked to the employee.
    async fn set_user_role(&self, employee_id: u64, role: Role) -> StoreResult<bool>;
    async fn max_serial_number(&self, company_code: &str, year: i32) -> StoreResult<Option<u32>>;

    async fn insert_attendance(
        &self,
        record: NewAttendance,
        now: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord>;
    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;
    /// Sets check-in and `present` on a record without one; `false` if it already had one.
    async fn record_check_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<bool>;
    /// `false` if the record was already checked out.
    async fn record_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        work_hours: f64,
        extra_hours: f64,
    ) -> StoreResult<bool>;
    /// Creates the day as `on_leave`, or flips an existing day to `on_leave`
    /// keeping its check-in/out.
    async fn upsert_on_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// Newest day first.
    async fn list_attendance(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>>;

    async fn insert_leave(&self, leave: NewLeave, now: DateTime<Utc>) -> StoreResult<LeaveRequest>;
    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRequest>>;
    /// Newest request first.
    async fn list_leaves(&self, filter: &LeaveFilter) -> StoreResult<Vec<LeaveRequest>>;
    /// Applies the decision only while the request is pending.
    async fn decide_leave(&self, id: u64, decision: &LeaveDecision) -> StoreResult<bool>;
    /// Opens the default balance on first access.
    async fn leave_balance(&self, employee_id: u64, now: DateTime<Utc>) -> StoreResult<LeaveBalance>;
    async fn debit_leave_balance(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryProfile>>;
    async fn list_salaries(&self, employee_id: Option<u64>) -> StoreResult<Vec<SalaryProfile>>;
    /// Insert or replace by employee.
    async fn save_salary(&self, profile: &SalaryProfile) -> StoreResult<()>;

    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>>;
    async fn find_payroll_for(&self, employee_id: u64, month: &str) -> StoreResult<Option<PayrollRecord>>;
    async fn insert_payroll(
        &self,
        employee_id: u64,
        month: &str,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<PayrollRecord>;
    /// `false` when the row is locked (or gone).
    async fn update_unlocked_payroll(
        &self,
        id: u64,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// `false` when the row was already locked.
    async fn lock_payroll(&self, id: u64, locked_by: u64, at: DateTime<Utc>) -> StoreResult<bool>;
    /// Latest month first.
    async fn list_payrolls(&self, filter: &PayrollFilter) -> StoreResult<Vec<PayrollRecord>>;
}
