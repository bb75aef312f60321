use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{
    AttendanceFilter, EmployeeFilter, HrStore, LeaveFilter, PayrollFilter, StoreError, StoreResult,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
    employee::{BankDetails, Employee, NewEmployee},
    leave::{LeaveBalance, LeaveDecision, LeaveRequest, LeaveStatus, LeaveType, NewLeave},
    payroll::{PayrollFigures, PayrollRecord},
    role::Role,
    salary::SalaryProfile,
    user::{NewUser, User},
};

struct RefreshToken {
    revoked: bool,
}

#[derive(Default)]
struct Tables {
    last_id: u64,
    users: BTreeMap<u64, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    employees: BTreeMap<u64, Employee>,
    attendance: BTreeMap<u64, AttendanceRecord>,
    leaves: BTreeMap<u64, LeaveRequest>,
    balances: HashMap<u64, LeaveBalance>,
    salaries: BTreeMap<u64, SalaryProfile>,
    payrolls: BTreeMap<u64, PayrollRecord>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn login_taken(&self, login_id: &str) -> bool {
        self.users
            .values()
            .any(|u| u.login_id.eq_ignore_ascii_case(login_id))
    }

    fn employee_clash(&self, employee: &NewEmployee) -> bool {
        self.employees.values().any(|e| {
            e.login_id.eq_ignore_ascii_case(&employee.login_id)
                || e.email.eq_ignore_ascii_case(&employee.email)
                || (e.company_code == employee.company_code
                    && e.year_of_joining == employee.year_of_joining
                    && e.serial_number == employee.serial_number)
        })
    }

    fn push_user(&mut self, user: NewUser, now: DateTime<Utc>) -> User {
        let id = self.next_id();
        let user = User {
            id,
            login_id: user.login_id,
            email: user.email,
            password: user.password,
            role: user.role,
            employee_id: user.employee_id,
            is_first_login: user.is_first_login,
            is_active: true,
            last_login_at: None,
            created_at: now,
        };
        self.users.insert(id, user.clone());
        user
    }

    fn push_employee(&mut self, employee: NewEmployee, now: DateTime<Utc>) -> Employee {
        let id = self.next_id();
        let employee = Employee {
            id,
            login_id: employee.login_id,
            name: employee.name,
            email: employee.email,
            company: employee.company,
            company_code: employee.company_code,
            department: employee.department,
            manager: None,
            phone: employee.phone,
            address: None,
            year_of_joining: employee.year_of_joining,
            serial_number: employee.serial_number,
            employee_initials: employee.employee_initials,
            bank_details: BankDetails::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.employees.insert(id, employee.clone());
        employee
    }
}

impl EmployeeFilter {
    fn matches(&self, employee: &Employee) -> bool {
        let needle = self.search.as_deref().map(str::to_lowercase);
        needle.is_none_or(|needle| {
            employee.name.to_lowercase().contains(&needle)
                || employee.email.to_lowercase().contains(&needle)
        }) && self.department.as_deref().is_none_or(|wanted| {
            employee
                .department
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(wanted))
        }) && self.is_active.is_none_or(|active| employee.is_active == active)
    }
}

/// Process-local store used by tests and `STORE_BACKEND=memory`.
///
/// Enforces the same unique keys and conditional writes as the MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HrStore for MemoryStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut t = self.tables();
        if t.login_taken(&user.login_id) {
            return Err(StoreError::Duplicate);
        }
        Ok(t.push_user(user, now))
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_user_by_login_id(&self, login_id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.login_id.eq_ignore_ascii_case(login_id))
            .cloned())
    }

    async fn set_password(&self, user_id: u64, password_hash: &str) -> StoreResult<()> {
        if let Some(user) = self.tables().users.get_mut(&user_id) {
            user.password = password_hash.to_string();
            user.is_first_login = false;
        }
        Ok(())
    }

    async fn record_login(&self, user_id: u64, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(user) = self.tables().users.get_mut(&user_id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn login_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables().users.values().map(|u| u.login_id.clone()).collect())
    }

    async fn recent_login_ids(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        Ok(self
            .tables()
            .users
            .values()
            .filter(|u| u.last_login_at.is_some_and(|at| at >= since))
            .map(|u| u.login_id.clone())
            .collect())
    }

    async fn insert_refresh_token(
        &self,
        _user_id: u64,
        jti: &str,
        _expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut t = self.tables();
        if t.refresh_tokens.contains_key(jti) {
            return Err(StoreError::Duplicate);
        }
        t.refresh_tokens
            .insert(jti.to_string(), RefreshToken { revoked: false });
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        match self.tables().refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_employee(&self, employee: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee> {
        let mut t = self.tables();
        if t.employee_clash(&employee) {
            return Err(StoreError::Duplicate);
        }
        Ok(t.push_employee(employee, now))
    }

    async fn insert_employee_account(
        &self,
        employee: NewEmployee,
        mut account: NewUser,
        now: DateTime<Utc>,
    ) -> StoreResult<(Employee, User)> {
        let mut t = self.tables();
        if t.employee_clash(&employee) || t.login_taken(&account.login_id) {
            return Err(StoreError::Duplicate);
        }
        let employee = t.push_employee(employee, now);
        account.employee_id = Some(employee.id);
        let user = t.push_user(account, now);
        Ok((employee, user))
    }

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.tables().employees.get(&id).cloned())
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        Ok(self
            .tables()
            .employees
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> StoreResult<Vec<Employee>> {
        let mut employees: Vec<_> = self
            .tables()
            .employees
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(employees)
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        if let Some(stored) = self.tables().employees.get_mut(&employee.id) {
            *stored = employee.clone();
        }
        Ok(())
    }

    async fn set_employee_active(&self, employee_id: u64, active: bool, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut t = self.tables();
        let Some(employee) = t.employees.get_mut(&employee_id) else {
            return Ok(false);
        };
        employee.is_active = active;
        employee.updated_at = now;
        for user in t.users.values_mut().filter(|u| u.employee_id == Some(employee_id)) {
            user.is_active = active;
        }
        Ok(true)
    }

    async fn set_user_role(&self, employee_id: u64, role: Role) -> StoreResult<bool> {
        let mut linked = false;
        for user in self
            .tables()
            .users
            .values_mut()
            .filter(|u| u.employee_id == Some(employee_id))
        {
            user.role = role;
            linked = true;
        }
        Ok(linked)
    }

    async fn max_serial_number(&self, company_code: &str, year: i32) -> StoreResult<Option<u32>> {
        Ok(self
            .tables()
            .employees
            .values()
            .filter(|e| e.company_code == company_code && e.year_of_joining == year)
            .map(|e| e.serial_number)
            .max())
    }

    async fn insert_attendance(
        &self,
        record: NewAttendance,
        now: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        let mut t = self.tables();
        if t.attendance
            .values()
            .any(|a| a.employee_id == record.employee_id && a.date == record.date)
        {
            return Err(StoreError::Duplicate);
        }
        let id = t.next_id();
        let record = AttendanceRecord {
            id,
            employee_id: record.employee_id,
            date: record.date,
            status: record.status,
            check_in: record.check_in,
            check_out: None,
            work_hours: 0.0,
            extra_hours: 0.0,
            created_at: now,
        };
        t.attendance.insert(id, record.clone());
        Ok(record)
    }

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self
            .tables()
            .attendance
            .values()
            .find(|a| a.employee_id == employee_id && a.date == date)
            .cloned())
    }

    async fn record_check_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        match self.tables().attendance.get_mut(&id) {
            Some(record) if record.check_in.is_none() => {
                record.check_in = Some(at);
                record.status = AttendanceStatus::Present;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        work_hours: f64,
        extra_hours: f64,
    ) -> StoreResult<bool> {
        match self.tables().attendance.get_mut(&id) {
            Some(record) if record.check_out.is_none() => {
                record.check_out = Some(at);
                record.work_hours = work_hours;
                record.extra_hours = extra_hours;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_on_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut t = self.tables();
        if let Some(record) = t
            .attendance
            .values_mut()
            .find(|a| a.employee_id == employee_id && a.date == date)
        {
            record.status = AttendanceStatus::OnLeave;
            return Ok(());
        }
        let id = t.next_id();
        t.attendance.insert(
            id,
            AttendanceRecord {
                id,
                employee_id,
                date,
                status: AttendanceStatus::OnLeave,
                check_in: None,
                check_out: None,
                work_hours: 0.0,
                extra_hours: 0.0,
                created_at: now,
            },
        );
        Ok(())
    }

    async fn list_attendance(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .tables()
            .attendance
            .values()
            .filter(|a| filter.employee_id.is_none_or(|id| a.employee_id == id))
            .filter(|a| filter.from.is_none_or(|from| a.date >= from))
            .filter(|a| filter.to.is_none_or(|to| a.date <= to))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(a.employee_id.cmp(&b.employee_id)));
        Ok(records)
    }

    async fn insert_leave(&self, leave: NewLeave, now: DateTime<Utc>) -> StoreResult<LeaveRequest> {
        let mut t = self.tables();
        let id = t.next_id();
        let leave = LeaveRequest {
            id,
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            from_date: leave.from_date,
            to_date: leave.to_date,
            number_of_days: leave.number_of_days,
            reason: leave.reason,
            attachment: leave.attachment,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
        };
        t.leaves.insert(id, leave.clone());
        Ok(leave)
    }

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        Ok(self.tables().leaves.get(&id).cloned())
    }

    async fn list_leaves(&self, filter: &LeaveFilter) -> StoreResult<Vec<LeaveRequest>> {
        let mut leaves: Vec<_> = self
            .tables()
            .leaves
            .values()
            .filter(|l| filter.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .filter(|l| filter.leave_type.is_none_or(|t| l.leave_type == t))
            .filter(|l| {
                filter
                    .overlapping
                    .is_none_or(|(start, end)| l.overlaps(start, end))
            })
            .cloned()
            .collect();
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(leaves)
    }

    async fn decide_leave(&self, id: u64, decision: &LeaveDecision) -> StoreResult<bool> {
        match self.tables().leaves.get_mut(&id) {
            Some(leave) if leave.status == LeaveStatus::Pending => {
                leave.status = decision.status;
                leave.approved_by = Some(decision.decided_by);
                leave.approved_at = Some(decision.decided_at);
                leave.rejection_reason = decision.rejection_reason.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn leave_balance(&self, employee_id: u64, now: DateTime<Utc>) -> StoreResult<LeaveBalance> {
        Ok(self
            .tables()
            .balances
            .entry(employee_id)
            .or_insert_with(|| LeaveBalance::opening(employee_id, now))
            .clone())
    }

    async fn debit_leave_balance(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.tables()
            .balances
            .entry(employee_id)
            .or_insert_with(|| LeaveBalance::opening(employee_id, now))
            .debit(leave_type, days, now);
        Ok(())
    }

    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryProfile>> {
        Ok(self.tables().salaries.get(&employee_id).cloned())
    }

    async fn list_salaries(&self, employee_id: Option<u64>) -> StoreResult<Vec<SalaryProfile>> {
        Ok(self
            .tables()
            .salaries
            .values()
            .filter(|s| employee_id.is_none_or(|id| s.employee_id == id))
            .cloned()
            .collect())
    }

    async fn save_salary(&self, profile: &SalaryProfile) -> StoreResult<()> {
        self.tables()
            .salaries
            .insert(profile.employee_id, profile.clone());
        Ok(())
    }

    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>> {
        Ok(self.tables().payrolls.get(&id).cloned())
    }

    async fn find_payroll_for(&self, employee_id: u64, month: &str) -> StoreResult<Option<PayrollRecord>> {
        Ok(self
            .tables()
            .payrolls
            .values()
            .find(|p| p.employee_id == employee_id && p.month == month)
            .cloned())
    }

    async fn insert_payroll(
        &self,
        employee_id: u64,
        month: &str,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<PayrollRecord> {
        let mut t = self.tables();
        if t.payrolls
            .values()
            .any(|p| p.employee_id == employee_id && p.month == month)
        {
            return Err(StoreError::Duplicate);
        }
        let id = t.next_id();
        let mut record = PayrollRecord {
            id,
            employee_id,
            month: month.to_string(),
            basic: 0.0,
            allowances: 0.0,
            deductions: 0.0,
            net_salary: 0.0,
            attendance_days: 0.0,
            leave_days: 0,
            is_locked: false,
            locked_at: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        };
        record.apply(figures, now);
        t.payrolls.insert(id, record.clone());
        Ok(record)
    }

    async fn update_unlocked_payroll(
        &self,
        id: u64,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.tables().payrolls.get_mut(&id) {
            Some(record) if !record.is_locked => {
                record.apply(figures, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lock_payroll(&self, id: u64, locked_by: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        match self.tables().payrolls.get_mut(&id) {
            Some(record) if !record.is_locked => {
                record.is_locked = true;
                record.locked_at = Some(at);
                record.locked_by = Some(locked_by);
                record.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_payrolls(&self, filter: &PayrollFilter) -> StoreResult<Vec<PayrollRecord>> {
        let mut payrolls: Vec<_> = self
            .tables()
            .payrolls
            .values()
            .filter(|p| filter.employee_id.is_none_or(|id| p.employee_id == id))
            .filter(|p| filter.month.as_deref().is_none_or(|m| p.month == m))
            .cloned()
            .collect();
        payrolls.sort_by(|a, b| b.month.cmp(&a.month).then(a.employee_id.cmp(&b.employee_id)));
        Ok(payrolls)
    }
}
