use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::{attendance::{DayStatusResponse, MarkAttendance}, leave::RejectLeave};
use crate::auth::handlers::{ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, TokenPair};
use crate::error::FieldError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    employee::{BankDetails, Employee, EmployeeProfileUpdate},
    leave::{LeaveBalance, LeaveRequest, LeaveStatus, LeaveType},
    payroll::PayrollRecord,
    role::Role,
    salary::{
        CompensationComponent, ResolvedComponents, ResolvedDeductions, SalaryComponents,
        SalaryComponentsPatch, SalaryDeductions, SalaryDeductionsPatch, SalaryProfileView,
    },
    user::UserSummary,
};
use crate::service::{
    attendance::{AttendanceStats, DayAttendance, MonthTotals, MonthlyAttendance, RosterEntry, TodayAttendance},
    dashboard::{Dashboard, DashboardStats, PendingLeave},
    employee::{CreateEmployee, EmployeeUpdate, OnboardedEmployee},
    leave::{DecisionOutcome, LeaveApplication, LeaveDecisionRequest, LeaveStats},
    payroll::GeneratePayroll,
    salary::{PayrollPreview, SalaryInput},
};

/// Registers the `bearer_auth` scheme the protected paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

Attendance, leave, salary and payroll for one organisation.

### 🔹 Key Features
- **Employee Management**
  - Onboard employees with generated login IDs, view, filter and update profiles
  - Assign roles (admin only) and deactivate accounts without losing history
- **Attendance Management**
  - Daily check-in/check-out, explicit marking, monthly summaries and an HR roster
- **Leave Management**
  - Apply for leave, approve/reject requests, balances and statistics
- **Salary Profiles**
  - Fixed or percentage components and deductions resolved against the base wage
- **Payroll Management**
  - Generate monthly payroll from attendance and approved leave, then lock it

### 🔐 Security
Protected endpoints require a **JWT Bearer** access token from `/auth/login`.
Roles: **admin** runs payroll, **hr** manages people and leave, **employee** is self-service.

### 📦 Response Format
- JSON, camelCase field names
- Errors: `{ "message": ... }` or `{ "errors": [{ "field", "message" }] }`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::change_password,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee,

        crate::api::admin::dashboard,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::day_status,
        crate::api::attendance::monthly,
        crate::api::attendance::stats,
        crate::api::attendance::list_attendance,
        crate::api::attendance::admin_roster,

        crate::api::leave::apply_leave,
        crate::api::leave::list_leaves,
        crate::api::leave::get_leave,
        crate::api::leave::decide_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::leave_balance,
        crate::api::leave::leave_stats,

        crate::api::salary::upsert_salary,
        crate::api::salary::list_salaries,
        crate::api::salary::get_salary,
        crate::api::salary::payroll_preview,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::lock_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::list_payrolls
    ),
    components(
        schemas(
            FieldError,
            LoginRequest,
            RefreshRequest,
            ChangePasswordRequest,
            TokenPair,
            LoginResponse,
            UserSummary,
            Role,
            Employee,
            BankDetails,
            CreateEmployee,
            OnboardedEmployee,
            EmployeeProfileUpdate,
            EmployeeUpdate,
            DashboardStats,
            PendingLeave,
            Dashboard,
            AttendanceStatus,
            AttendanceRecord,
            MarkAttendance,
            DayStatusResponse,
            TodayAttendance,
            DayAttendance,
            MonthTotals,
            MonthlyAttendance,
            AttendanceStats,
            RosterEntry,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            LeaveApplication,
            LeaveDecisionRequest,
            RejectLeave,
            DecisionOutcome,
            LeaveBalance,
            LeaveStats,
            CompensationComponent,
            SalaryComponents,
            SalaryDeductions,
            SalaryComponentsPatch,
            SalaryDeductionsPatch,
            ResolvedComponents,
            ResolvedDeductions,
            SalaryInput,
            SalaryProfileView,
            PayrollPreview,
            GeneratePayroll,
            PayrollRecord
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and account APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Admin", description = "Dashboard for HR and admins"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Salary", description = "Salary profile APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_paths_and_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payroll/generate"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/admin/dashboard"));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json["components"]["securitySchemes"]["bearer_auth"]["scheme"],
            "bearer"
        );
    }
}
