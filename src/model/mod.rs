pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod payroll;
pub mod role;
pub mod settings;
