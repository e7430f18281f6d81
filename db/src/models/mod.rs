pub mod attendance_log;
pub mod audit_log;
pub mod class;
pub mod lecturer_verification;
pub mod qr_generation;
pub mod session;
pub mod user;

pub use attendance_log::AttendanceStatus;
pub use audit_log::AuditAction;
pub use session::SessionStatus;
pub use user::Role;
