use chrono::{DateTime, Utc};
use db::models::AttendanceStatus;
use serde::{Deserialize, Serialize};
use services::attendance::Marking;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MarkAttendanceReq {
    pub student_id: i64,
    pub status: AttendanceStatus,
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
    #[validate(length(max = 1000, message = "notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl From<MarkAttendanceReq> for Marking {
    fn from(req: MarkAttendanceReq) -> Self {
        Marking {
            student_id: req.student_id,
            status: req.status,
            reason: req.reason,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkMarkReq {
    #[validate(
        length(min = 1, max = 500, message = "records must contain between 1 and 500 entries"),
        nested
    )]
    pub records: Vec<MarkAttendanceReq>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyAttendanceReq {
    pub student_id: i64,
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
    #[validate(length(max = 1000, message = "notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UnverifyAttendanceReq {
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckInReq {
    #[validate(length(min = 1, max = 128, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 1, max = 128, message = "signature is required"))]
    pub signature: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationStatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Admins may inspect another lecturer; ignored for everyone else.
    pub lecturer_id: Option<i64>,
}
