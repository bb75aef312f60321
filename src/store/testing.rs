//! Store double for failure paths: delegates to [`MemoryStore`] and fails
//! the writes it is told to.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{
    AttendanceFilter, EmployeeFilter, HrStore, LeaveFilter, MemoryStore, PayrollFilter, StoreError,
    StoreResult,
};
use crate::model::{
    attendance::{AttendanceRecord, NewAttendance},
    employee::{Employee, NewEmployee},
    leave::{LeaveBalance, LeaveDecision, LeaveRequest, LeaveType, NewLeave},
    payroll::{PayrollFigures, PayrollRecord},
    role::Role,
    salary::SalaryProfile,
    user::{NewUser, User},
};

#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// `upsert_on_leave` fails for this day.
    pub fail_on_leave_date: Option<NaiveDate>,
    /// `insert_payroll` reports a unique-key clash, as if another request won.
    pub payroll_insert_clashes: bool,
    /// `update_unlocked_payroll` finds the row locked.
    pub payroll_update_loses_to_lock: bool,
}

fn injected() -> StoreError {
    StoreError::Corrupt("injected failure".into())
}

#[async_trait]
impl HrStore for FaultyStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        self.inner.insert_user(user, now).await
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_login_id(&self, login_id: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_login_id(login_id).await
    }

    async fn set_password(&self, user_id: u64, password_hash: &str) -> StoreResult<()> {
        self.inner.set_password(user_id, password_hash).await
    }

    async fn record_login(&self, user_id: u64, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.record_login(user_id, at).await
    }

    async fn login_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.login_ids().await
    }

    async fn recent_login_ids(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        self.inner.recent_login_ids(since).await
    }

    async fn insert_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.insert_refresh_token(user_id, jti, expires_at).await
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        self.inner.revoke_refresh_token(jti).await
    }

    async fn insert_employee(&self, employee: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee> {
        self.inner.insert_employee(employee, now).await
    }

    async fn insert_employee_account(
        &self,
        employee: NewEmployee,
        account: NewUser,
        now: DateTime<Utc>,
    ) -> StoreResult<(Employee, User)> {
        self.inner.insert_employee_account(employee, account, now).await
    }

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        self.inner.find_employee(id).await
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        self.inner.find_employee_by_email(email).await
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> StoreResult<Vec<Employee>> {
        self.inner.list_employees(filter).await
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        self.inner.update_employee(employee).await
    }

    async fn set_employee_active(&self, employee_id: u64, active: bool, now: DateTime<Utc>) -> StoreResult<bool> {
        self.inner.set_employee_active(employee_id, active, now).await
    }

    async fn set_user_role(&self, employee_id: u64, role: Role) -> StoreResult<bool> {
        self.inner.set_user_role(employee_id, role).await
    }

    async fn max_serial_number(&self, company_code: &str, year: i32) -> StoreResult<Option<u32>> {
        self.inner.max_serial_number(company_code, year).await
    }

    async fn insert_attendance(
        &self,
        record: NewAttendance,
        now: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        self.inner.insert_attendance(record, now).await
    }

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        self.inner.find_attendance(employee_id, date).await
    }

    async fn record_check_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        self.inner.record_check_in(id, at).await
    }

    async fn record_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        work_hours: f64,
        extra_hours: f64,
    ) -> StoreResult<bool> {
        self.inner.record_check_out(id, at, work_hours, extra_hours).await
    }

    async fn upsert_on_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        if self.fail_on_leave_date == Some(date) {
            return Err(injected());
        }
        self.inner.upsert_on_leave(employee_id, date, now).await
    }

    async fn list_attendance(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        self.inner.list_attendance(filter).await
    }

    async fn insert_leave(&self, leave: NewLeave, now: DateTime<Utc>) -> StoreResult<LeaveRequest> {
        self.inner.insert_leave(leave, now).await
    }

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        self.inner.find_leave(id).await
    }

    async fn list_leaves(&self, filter: &LeaveFilter) -> StoreResult<Vec<LeaveRequest>> {
        self.inner.list_leaves(filter).await
    }

    async fn decide_leave(&self, id: u64, decision: &LeaveDecision) -> StoreResult<bool> {
        self.inner.decide_leave(id, decision).await
    }

    async fn leave_balance(&self, employee_id: u64, now: DateTime<Utc>) -> StoreResult<LeaveBalance> {
        self.inner.leave_balance(employee_id, now).await
    }

    async fn debit_leave_balance(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.debit_leave_balance(employee_id, leave_type, days, now).await
    }

    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryProfile>> {
        self.inner.find_salary(employee_id).await
    }

    async fn list_salaries(&self, employee_id: Option<u64>) -> StoreResult<Vec<SalaryProfile>> {
        self.inner.list_salaries(employee_id).await
    }

    async fn save_salary(&self, profile: &SalaryProfile) -> StoreResult<()> {
        self.inner.save_salary(profile).await
    }

    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>> {
        self.inner.find_payroll(id).await
    }

    async fn find_payroll_for(&self, employee_id: u64, month: &str) -> StoreResult<Option<PayrollRecord>> {
        self.inner.find_payroll_for(employee_id, month).await
    }

    async fn insert_payroll(
        &self,
        employee_id: u64,
        month: &str,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<PayrollRecord> {
        if self.payroll_insert_clashes {
            return Err(StoreError::Duplicate);
        }
        self.inner.insert_payroll(employee_id, month, figures, now).await
    }

    async fn update_unlocked_payroll(
        &self,
        id: u64,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if self.payroll_update_loses_to_lock {
            return Ok(false);
        }
        self.inner.update_unlocked_payroll(id, figures, now).await
    }

    async fn lock_payroll(&self, id: u64, locked_by: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        self.inner.lock_payroll(id, locked_by, at).await
    }

    async fn list_payrolls(&self, filter: &PayrollFilter) -> StoreResult<Vec<PayrollRecord>> {
        self.inner.list_payrolls(filter).await
    }
}
