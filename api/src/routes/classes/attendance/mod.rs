//! Attendance records: lecturer marking and verification, student check-in.

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};

use crate::auth::guards::{allow_authenticated, require_class_lecturer};
use crate::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{attendance_summary, student_attendance, verification_history, verification_stats};
pub use post::{bulk_mark_attendance, check_in, mark_attendance};
pub use put::{unverify_attendance, verify_attendance};

/// Routes restricted to the class lecturer (or an admin).
pub fn lecturer_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/{class_id}/sessions/{session_id}/attendance",
            post(mark_attendance),
        )
        .route(
            "/{class_id}/sessions/{session_id}/attendance/bulk",
            post(bulk_mark_attendance),
        )
        .route(
            "/{class_id}/sessions/{session_id}/attendance/summary",
            get(attendance_summary),
        )
        .route(
            "/{class_id}/sessions/{session_id}/attendance/{attendance_id}/verify",
            put(verify_attendance),
        )
        .route(
            "/{class_id}/sessions/{session_id}/attendance/{attendance_id}/unverify",
            put(unverify_attendance),
        )
        .route(
            "/{class_id}/attendance/{attendance_id}/verifications",
            get(verification_history),
        )
        .route("/{class_id}/verification-stats", get(verification_stats))
        .route_layer(from_fn_with_state(app_state, require_class_lecturer))
}

/// Routes open to any authenticated user; handlers do their own checks.
pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/{class_id}/sessions/{session_id}/check-in", post(check_in))
        .route(
            "/{class_id}/students/{user_id}/attendance",
            get(student_attendance),
        )
        .route_layer(from_fn(allow_authenticated))
}
