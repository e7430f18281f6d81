pub mod m202512110001_create_users;
pub mod m202512110002_create_classes;
pub mod m202512110003_create_sessions;
pub mod m202512110004_create_qr_generations;
pub mod m202512110005_create_attendance_logs;
pub mod m202512110006_create_lecturer_verifications;
pub mod m202512110007_create_audit_logs;
