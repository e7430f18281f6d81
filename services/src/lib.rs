//! The attendance core: session lifecycle, check-in credentials, attendance
//! records with their verification workflow, and the audit trail.

pub mod attendance;
pub mod audit;
pub mod composition;
pub mod credential;
pub mod device;
pub mod error;
pub mod roster;
pub mod session;

#[cfg(test)]
mod test_support;

pub use composition::{AttendanceCore, CoreSettings};
pub use device::DeviceContext;
pub use error::{ServiceError, ServiceResult};
