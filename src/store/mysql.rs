use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    FromRow, MySqlPool,
    mysql::MySqlArguments,
    query::{Query, QueryAs},
    types::Json,
};

use super::{
    AttendanceFilter, EmployeeFilter, HrStore, LeaveFilter, PayrollFilter, StoreError, StoreResult,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
    employee::{BankDetails, Employee, NewEmployee},
    leave::{LeaveBalance, LeaveDecision, LeaveRequest, LeaveType, NewLeave},
    payroll::{PayrollFigures, PayrollRecord},
    role::Role,
    salary::{SalaryComponents, SalaryDeductions, SalaryProfile},
    user::{NewUser, User},
};

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unexpected {column} value '{value}'")))
}

// Typed binding for the dynamic WHERE clauses below
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
    Bool(bool),
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, sqlx::MySql, O, MySqlArguments>,
    args: Vec<FilterValue>,
) -> QueryAs<'q, sqlx::MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Str(v) => query.bind(v),
            FilterValue::Date(v) => query.bind(v),
            FilterValue::Bool(v) => query.bind(v),
        };
    }
    query
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    login_id: String,
    email: String,
    password: String,
    role_id: u8,
    employee_id: Option<u64>,
    is_first_login: bool,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role id {}", row.role_id)))?;
        Ok(User {
            id: row.id,
            login_id: row.login_id,
            email: row.email,
            password: row.password,
            role,
            employee_id: row.employee_id,
            is_first_login: row.is_first_login,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    login_id: String,
    name: String,
    email: String,
    company: String,
    company_code: String,
    department: Option<String>,
    manager: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    year_of_joining: i32,
    serial_number: u32,
    employee_initials: String,
    bank_details: Json<BankDetails>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            login_id: row.login_id,
            name: row.name,
            email: row.email,
            company: row.company,
            company_code: row.company_code,
            department: row.department,
            manager: row.manager,
            phone: row.phone,
            address: row.address,
            year_of_joining: row.year_of_joining,
            serial_number: row.serial_number,
            employee_initials: row.employee_initials,
            bank_details: row.bank_details.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    work_hours: f64,
    extra_hours: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            status: parse_column::<AttendanceStatus>("attendance.status", &row.status)?,
            check_in: row.check_in,
            check_out: row.check_out,
            work_hours: row.work_hours,
            extra_hours: row.extra_hours,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    from_date: NaiveDate,
    to_date: NaiveDate,
    number_of_days: u32,
    reason: String,
    attachment: Option<String>,
    status: String,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> StoreResult<Self> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: parse_column("leave_requests.leave_type", &row.leave_type)?,
            from_date: row.from_date,
            to_date: row.to_date,
            number_of_days: row.number_of_days,
            reason: row.reason,
            attachment: row.attachment,
            status: parse_column("leave_requests.status", &row.status)?,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SalaryRow {
    employee_id: u64,
    base_wage: f64,
    components: Json<SalaryComponents>,
    deductions: Json<SalaryDeductions>,
    monthly_salary: f64,
    yearly_salary: f64,
    last_updated: DateTime<Utc>,
}

impl From<SalaryRow> for SalaryProfile {
    fn from(row: SalaryRow) -> Self {
        SalaryProfile {
            employee_id: row.employee_id,
            base_wage: row.base_wage,
            components: row.components.0,
            deductions: row.deductions.0,
            monthly_salary: row.monthly_salary,
            yearly_salary: row.yearly_salary,
            last_updated: row.last_updated,
        }
    }
}

const USER_COLUMNS: &str = "id, login_id, email, password, role_id, employee_id, \
     is_first_login, is_active, last_login_at, created_at";

const EMPLOYEE_COLUMNS: &str = "id, login_id, name, email, company, company_code, department, \
     manager, phone, address, year_of_joining, serial_number, employee_initials, bank_details, \
     is_active, created_at, updated_at";

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, date, status, check_in, check_out, work_hours, extra_hours, created_at";

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, from_date, to_date, number_of_days, \
     reason, attachment, status, approved_by, approved_at, rejection_reason, created_at";

const SALARY_COLUMNS: &str =
    "employee_id, base_wage, components, deductions, monthly_salary, yearly_salary, last_updated";

const PAYROLL_COLUMNS: &str = "id, employee_id, month, basic, allowances, deductions, net_salary, \
     attendance_days, leave_days, is_locked, locked_at, locked_by, created_at, updated_at";

fn insert_user_query<'q>(user: &'q NewUser, now: DateTime<Utc>) -> Query<'q, sqlx::MySql, MySqlArguments> {
    sqlx::query(
        r#"
        INSERT INTO users (login_id, email, password, role_id, employee_id, is_first_login, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.login_id)
    .bind(&user.email)
    .bind(&user.password)
    .bind(user.role.id())
    .bind(user.employee_id)
    .bind(user.is_first_login)
    .bind(now)
}

fn insert_employee_query<'q>(
    employee: &'q NewEmployee,
    now: DateTime<Utc>,
) -> Query<'q, sqlx::MySql, MySqlArguments> {
    sqlx::query(
        r#"
        INSERT INTO employees
            (login_id, name, email, company, company_code, department, phone,
             year_of_joining, serial_number, employee_initials, bank_details,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&employee.login_id)
    .bind(&employee.name)
    .bind(&employee.email)
    .bind(&employee.company)
    .bind(&employee.company_code)
    .bind(&employee.department)
    .bind(&employee.phone)
    .bind(employee.year_of_joining)
    .bind(employee.serial_number)
    .bind(&employee.employee_initials)
    .bind(Json(BankDetails::default()))
    .bind(now)
    .bind(now)
}

#[async_trait]
impl HrStore for MySqlStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let result = insert_user_query(&user, now).execute(&self.pool).await?;

        self.find_user(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted user vanished".into()))
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_login_id(&self, login_id: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login_id = ?"
        ))
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn set_password(&self, user_id: u64, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET password = ?, is_first_login = FALSE WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(&self, user_id: u64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn login_ids(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT login_id FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn recent_login_ids(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT login_id
            FROM users
            WHERE last_login_at >= ?
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_employee(&self, employee: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee> {
        let result = insert_employee_query(&employee, now).execute(&self.pool).await?;

        self.find_employee(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted employee vanished".into()))
    }

    async fn insert_employee_account(
        &self,
        employee: NewEmployee,
        mut account: NewUser,
        now: DateTime<Utc>,
    ) -> StoreResult<(Employee, User)> {
        // dropping the transaction on an early return rolls both inserts back
        let mut tx = self.pool.begin().await?;

        let employee_id = insert_employee_query(&employee, now)
            .execute(&mut *tx)
            .await?
            .last_insert_id();
        account.employee_id = Some(employee_id);
        let user_id = insert_user_query(&account, now)
            .execute(&mut *tx)
            .await?
            .last_insert_id();

        tx.commit().await?;

        let employee = self
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted employee vanished".into()))?;
        let user = self
            .find_user(user_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted user vanished".into()))?;
        Ok((employee, user))
    }

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Employee::from))
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Employee::from))
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> StoreResult<Vec<Employee>> {
        let mut sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE 1=1");
        let mut args = Vec::new();

        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", search.to_lowercase());
            sql.push_str(" AND (LOWER(name) LIKE ? OR LOWER(email) LIKE ?)");
            args.push(FilterValue::Str(pattern.clone()));
            args.push(FilterValue::Str(pattern));
        }
        if let Some(department) = filter.department.as_deref() {
            sql.push_str(" AND department = ?");
            args.push(FilterValue::Str(department.to_string()));
        }
        if let Some(active) = filter.is_active {
            sql.push_str(" AND is_active = ?");
            args.push(FilterValue::Bool(active));
        }
        sql.push_str(" ORDER BY name, id");

        let rows = bind_all(sqlx::query_as::<_, EmployeeRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, department = ?, manager = ?, phone = ?, address = ?,
                bank_details = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.department)
        .bind(&employee.manager)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(Json(&employee.bank_details))
        .bind(employee.updated_at)
        .bind(employee.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_employee_active(&self, employee_id: u64, active: bool, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE employees SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now)
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        // an unchanged row reports 0 affected
        let exists = updated.rows_affected() == 1
            || sqlx::query_as::<_, (u64,)>("SELECT id FROM employees WHERE id = ?")
                .bind(employee_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
        if !exists {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET is_active = ? WHERE employee_id = ?")
            .bind(active)
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn set_user_role(&self, employee_id: u64, role: Role) -> StoreResult<bool> {
        let linked = sqlx::query_as::<_, (u64,)>("SELECT id FROM users WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        if linked.is_empty() {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET role_id = ? WHERE employee_id = ?")
            .bind(role.id())
            .bind(employee_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn max_serial_number(&self, company_code: &str, year: i32) -> StoreResult<Option<u32>> {
        let (max,) = sqlx::query_as::<_, (Option<u64>,)>(
            r#"
            SELECT CAST(MAX(serial_number) AS UNSIGNED)
            FROM employees
            WHERE company_code = ? AND year_of_joining = ?
            "#,
        )
        .bind(company_code)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        max.map(|n| {
            u32::try_from(n).map_err(|_| StoreError::Corrupt(format!("serial number {n} out of range")))
        })
        .transpose()
    }

    async fn insert_attendance(
        &self,
        record: NewAttendance,
        now: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status, check_in, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.status.as_ref())
        .bind(record.check_in)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?"
        ))
        .bind(result.last_insert_id())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?"
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn record_check_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in = ?, status = 'present'
            WHERE id = ? AND check_in IS NULL
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        work_hours: f64,
        extra_hours: f64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, work_hours = ?, extra_hours = ?
            WHERE id = ? AND check_out IS NULL
            "#,
        )
        .bind(at)
        .bind(work_hours)
        .bind(extra_hours)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_on_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status, created_at)
            VALUES (?, ?, 'on_leave', ?)
            ON DUPLICATE KEY UPDATE status = 'on_leave'
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_attendance(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE 1=1");
        let mut args = Vec::new();

        if let Some(id) = filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND date >= ?");
            args.push(FilterValue::Date(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND date <= ?");
            args.push(FilterValue::Date(to));
        }
        sql.push_str(" ORDER BY date DESC, employee_id");

        let rows = bind_all(sqlx::query_as::<_, AttendanceRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn insert_leave(&self, leave: NewLeave, now: DateTime<Utc>) -> StoreResult<LeaveRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, from_date, to_date, number_of_days, reason, attachment, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.leave_type.as_ref())
        .bind(leave.from_date)
        .bind(leave.to_date)
        .bind(leave.number_of_days)
        .bind(&leave.reason)
        .bind(&leave.attachment)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_leave(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted leave request vanished".into()))
    }

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
    }

    async fn list_leaves(&self, filter: &LeaveFilter) -> StoreResult<Vec<LeaveRequest>> {
        let mut sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE 1=1");
        let mut args = Vec::new();

        if let Some(id) = filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }
        if let Some(leave_type) = filter.leave_type {
            sql.push_str(" AND leave_type = ?");
            args.push(FilterValue::Str(leave_type.to_string()));
        }
        if let Some((start, end)) = filter.overlapping {
            sql.push_str(" AND from_date <= ? AND to_date >= ?");
            args.push(FilterValue::Date(end));
            args.push(FilterValue::Date(start));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let rows = bind_all(sqlx::query_as::<_, LeaveRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    async fn decide_leave(&self, id: u64, decision: &LeaveDecision) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(decision.status.as_ref())
        .bind(decision.decided_by)
        .bind(decision.decided_at)
        .bind(&decision.rejection_reason)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn leave_balance(&self, employee_id: u64, now: DateTime<Utc>) -> StoreResult<LeaveBalance> {
        sqlx::query(
            r#"
            INSERT INTO leave_balances (employee_id, paid_leave, sick_leave, unpaid_leave, last_updated)
            VALUES (?, ?, ?, 0, ?)
            ON DUPLICATE KEY UPDATE employee_id = employee_id
            "#,
        )
        .bind(employee_id)
        .bind(LeaveBalance::DEFAULT_PAID)
        .bind(LeaveBalance::DEFAULT_SICK)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let balance = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT employee_id, paid_leave, sick_leave, unpaid_leave, last_updated
            FROM leave_balances
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn debit_leave_balance(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let column = match leave_type {
            LeaveType::PaidLeave => "paid_leave",
            LeaveType::SickLeave => "sick_leave",
            LeaveType::UnpaidLeave => return Ok(()),
        };

        // make sure the row exists before decrementing in place
        self.leave_balance(employee_id, now).await?;

        sqlx::query(&format!(
            "UPDATE leave_balances SET {column} = {column} - ?, last_updated = ? WHERE employee_id = ?"
        ))
        .bind(i64::from(days))
        .bind(now)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryProfile>> {
        let row = sqlx::query_as::<_, SalaryRow>(&format!(
            "SELECT {SALARY_COLUMNS} FROM salary_profiles WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SalaryProfile::from))
    }

    async fn list_salaries(&self, employee_id: Option<u64>) -> StoreResult<Vec<SalaryProfile>> {
        let rows = match employee_id {
            Some(id) => {
                sqlx::query_as::<_, SalaryRow>(&format!(
                    "SELECT {SALARY_COLUMNS} FROM salary_profiles WHERE employee_id = ?"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SalaryRow>(&format!(
                    "SELECT {SALARY_COLUMNS} FROM salary_profiles ORDER BY employee_id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(SalaryProfile::from).collect())
    }

    async fn save_salary(&self, profile: &SalaryProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO salary_profiles
                (employee_id, base_wage, components, deductions, monthly_salary, yearly_salary, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                base_wage = VALUES(base_wage),
                components = VALUES(components),
                deductions = VALUES(deductions),
                monthly_salary = VALUES(monthly_salary),
                yearly_salary = VALUES(yearly_salary),
                last_updated = VALUES(last_updated)
            "#,
        )
        .bind(profile.employee_id)
        .bind(profile.base_wage)
        .bind(Json(&profile.components))
        .bind(Json(&profile.deductions))
        .bind(profile.monthly_salary)
        .bind(profile.yearly_salary)
        .bind(profile.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>> {
        let record = sqlx::query_as::<_, PayrollRecord>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_payroll_for(&self, employee_id: u64, month: &str) -> StoreResult<Option<PayrollRecord>> {
        let record = sqlx::query_as::<_, PayrollRecord>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE employee_id = ? AND month = ?"
        ))
        .bind(employee_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert_payroll(
        &self,
        employee_id: u64,
        month: &str,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<PayrollRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO payroll
                (employee_id, month, basic, allowances, deductions, net_salary,
                 attendance_days, leave_days, is_locked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(month)
        .bind(figures.basic)
        .bind(figures.allowances)
        .bind(figures.deductions)
        .bind(figures.net_salary())
        .bind(figures.attendance_days)
        .bind(figures.leave_days)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_payroll(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted payroll vanished".into()))
    }

    async fn update_unlocked_payroll(
        &self,
        id: u64,
        figures: &PayrollFigures,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payroll
            SET basic = ?, allowances = ?, deductions = ?, net_salary = ?,
                attendance_days = ?, leave_days = ?, updated_at = ?
            WHERE id = ? AND is_locked = FALSE
            "#,
        )
        .bind(figures.basic)
        .bind(figures.allowances)
        .bind(figures.deductions)
        .bind(figures.net_salary())
        .bind(figures.attendance_days)
        .bind(figures.leave_days)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn lock_payroll(&self, id: u64, locked_by: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payroll
            SET is_locked = TRUE, locked_at = ?, locked_by = ?, updated_at = ?
            WHERE id = ? AND is_locked = FALSE
            "#,
        )
        .bind(at)
        .bind(locked_by)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_payrolls(&self, filter: &PayrollFilter) -> StoreResult<Vec<PayrollRecord>> {
        let mut sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE 1=1");
        let mut args = Vec::new();

        if let Some(id) = filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(month) = &filter.month {
            sql.push_str(" AND month = ?");
            args.push(FilterValue::Str(month.clone()));
        }
        sql.push_str(" ORDER BY month DESC, employee_id");

        let records = bind_all(sqlx::query_as::<_, PayrollRecord>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}
