//! Routes scoped to one class: `/api/classes/{class_id}/...`.
//!
//! Lecturer-facing groups are guarded by `require_class_lecturer`; the
//! student-facing check-in and personal history only require authentication.

use axum::Router;

use crate::state::AppState;

pub mod attendance;
pub mod credentials;
pub mod sessions;

pub fn classes_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .merge(sessions::session_routes(app_state.clone()))
        .merge(credentials::credential_routes(app_state.clone()))
        .merge(attendance::lecturer_routes(app_state.clone()))
        .merge(attendance::student_routes())
}
