use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::roster::DEFAULT_HISTORY_LIMIT;

use super::common::VerificationStatsQuery;
use crate::auth::{AuthUser, guards::is_class_lecturer};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::LimitQuery;
use crate::state::AppState;

/// GET /api/classes/{class_id}/sessions/{session_id}/attendance/summary
///
/// Per-status counts and the attendance percentage (present, late and
/// excused count as attended).
///
/// ### Response
/// ```json
/// {
///   "success": true,
///   "data": {
///     "session_id": 3, "total": 4, "present": 2, "absent": 1,
///     "late": 1, "excused": 0, "verified": 3, "attendance_percentage": 75.0
///   },
///   "message": "Attendance summary retrieved"
/// }
/// ```
pub async fn attendance_summary(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
) -> Response {
    match state.core().roster.summary(class_id, session_id).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(summary, "Attendance summary retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/classes/{class_id}/attendance/{attendance_id}/verifications?limit=20
///
/// Verification trail of one record, newest first.
pub async fn verification_history(
    State(state): State<AppState>,
    Path((class_id, attendance_id)): Path<(i64, i64)>,
    Query(q): Query<LimitQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state
        .core()
        .roster
        .verification_history(class_id, attendance_id, limit)
        .await
    {
        Ok(items) => (
            StatusCode::OK,
            Json(ApiResponse::success(items, "Verification history retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/classes/{class_id}/verification-stats?from=&to=&lecturer_id=
///
/// Daily verification counts for the caller. `from`/`to` are RFC 3339
/// timestamps; `lecturer_id` is honoured for admins only.
pub async fn verification_stats(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(q): Query<VerificationStatsQuery>,
) -> Response {
    let lecturer_id = match q.lecturer_id {
        Some(id) if claims.admin => id,
        _ => claims.sub,
    };

    match state
        .core()
        .roster
        .verification_stats(lecturer_id, class_id, q.from, q.to)
        .await
    {
        Ok(days) => (
            StatusCode::OK,
            Json(ApiResponse::success(days, "Verification statistics retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/classes/{class_id}/students/{user_id}/attendance?limit=20
///
/// A student's own history in the class. Lecturers of the class and admins
/// may read any student's history.
///
/// ### Responses
/// - `200 OK` with history items, most recent session first
/// - `403 Forbidden` for anyone else
pub async fn student_attendance(
    State(state): State<AppState>,
    Path((class_id, user_id)): Path<(i64, i64)>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<LimitQuery>,
) -> Response {
    if user.0.sub != user_id && !is_class_lecturer(&state, &user, class_id).await {
        return error_response(
            StatusCode::FORBIDDEN,
            "You may only view your own attendance",
        );
    }

    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state
        .core()
        .roster
        .student_history(user_id, class_id, limit)
        .await
    {
        Ok(items) => (
            StatusCode::OK,
            Json(ApiResponse::success(items, "Attendance history retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
