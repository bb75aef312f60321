pub mod attendance;
pub mod dashboard;
pub mod employee;
pub mod leave;
pub mod payroll;
pub mod salary;
