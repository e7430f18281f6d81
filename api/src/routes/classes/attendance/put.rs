use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::common::{UnverifyAttendanceReq, VerifyAttendanceReq};
use crate::auth::{AuthUser, Device};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::{JsonBody, format_validation_errors};
use crate::state::AppState;

/// PUT /api/classes/{class_id}/sessions/{session_id}/attendance/{attendance_id}/verify
///
/// ### Request Body
/// ```json
/// { "student_id": 7, "reason": "Seen in venue", "notes": "Front row" }
/// ```
///
/// ### Responses
/// - `200 OK` with the updated record
/// - `404 Not Found` if the record does not belong to that student and session
pub async fn verify_attendance(
    State(state): State<AppState>,
    Path((class_id, session_id, attendance_id)): Path<(i64, i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<VerifyAttendanceReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .attendance
        .verify(
            claims.sub,
            class_id,
            session_id,
            req.student_id,
            attendance_id,
            req.reason,
            req.notes,
            &device,
        )
        .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(record, "Attendance verified")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// PUT /api/classes/{class_id}/sessions/{session_id}/attendance/{attendance_id}/unverify
pub async fn unverify_attendance(
    State(state): State<AppState>,
    Path((class_id, session_id, attendance_id)): Path<(i64, i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<UnverifyAttendanceReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .attendance
        .unverify(
            claims.sub,
            attendance_id,
            class_id,
            session_id,
            req.reason,
            &device,
        )
        .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(record, "Attendance unverified")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
