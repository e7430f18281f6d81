mod attendance_test;
mod audit_test;
mod credentials_test;
mod health_test;
mod sessions_test;
