use db::models::session::{Model as SessionModel, SessionStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub class_id: i64,
    pub scheduled_start: String,
    pub status: SessionStatus,
    pub scanning_enabled: bool,
    pub session_token: Option<String>,
    pub started_by: Option<i64>,
    pub started_at: Option<String>,
    pub delayed_by: Option<i64>,
    pub delay_reason: Option<String>,
    pub delayed_at: Option<String>,
    pub new_start_time: Option<String>,
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<String>,
    pub room_change_from: Option<String>,
    pub room_change_to: Option<String>,
    pub room_changed_by: Option<i64>,
    pub room_changed_at: Option<String>,
}

impl From<SessionModel> for SessionResponse {
    fn from(m: SessionModel) -> Self {
        let ts = |t: Option<chrono::DateTime<chrono::Utc>>| t.map(|t| t.to_rfc3339());
        Self {
            id: m.id,
            class_id: m.class_id,
            scheduled_start: m.scheduled_start.to_rfc3339(),
            status: m.status,
            scanning_enabled: m.scanning_enabled,
            session_token: m.session_token,
            started_by: m.started_by,
            started_at: ts(m.started_at),
            delayed_by: m.delayed_by,
            delay_reason: m.delay_reason,
            delayed_at: ts(m.delayed_at),
            new_start_time: ts(m.new_start_time),
            cancelled_by: m.cancelled_by,
            cancellation_reason: m.cancellation_reason,
            cancelled_at: ts(m.cancelled_at),
            room_change_from: m.room_change_from,
            room_change_to: m.room_change_to,
            room_changed_by: m.room_changed_by,
            room_changed_at: ts(m.room_changed_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DelaySessionReq {
    #[validate(range(min = 1, max = 1440, message = "delay_minutes must be between 1 and 1440"))]
    pub delay_minutes: i64,
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelSessionReq {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangeRoomReq {
    #[validate(length(min = 1, max = 100, message = "new_room must be 1-100 characters"))]
    pub new_room: String,
    #[validate(length(max = 100, message = "old_room must be at most 100 characters"))]
    #[serde(default)]
    pub old_room: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleScanningReq {
    pub enabled: bool,
}
