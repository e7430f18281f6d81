use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::attendance::{CheckInOutcome, Marking};
use validator::Validate;

use super::common::{BulkMarkReq, CheckInReq, MarkAttendanceReq};
use crate::auth::{AuthUser, Device};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::{JsonBody, format_validation_errors};
use crate::state::AppState;

/// POST /api/classes/{class_id}/sessions/{session_id}/attendance
///
/// Records or overwrites one student's status. Manual marks are verified
/// by the caller immediately.
///
/// ### Request Body
/// ```json
/// { "student_id": 7, "status": "late", "reason": "Bus strike", "notes": null }
/// ```
///
/// ### Responses
/// - `201 Created` when a new record was written, `200 OK` when one was updated
/// - `404 Not Found` for an unknown session or student
pub async fn mark_attendance(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<MarkAttendanceReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .attendance
        .mark(claims.sub, class_id, session_id, req.into(), &device)
        .await
    {
        Ok(result) => {
            let status = if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(ApiResponse::success(result, "Attendance marked")),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/attendance/bulk
///
/// Applies each record independently. The response is `200 OK` even when
/// some items fail; `success` is false in that case and `data.errors` lists
/// the failing students.
pub async fn bulk_mark_attendance(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<BulkMarkReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    let markings: Vec<Marking> = req.records.into_iter().map(Into::into).collect();
    match state
        .core()
        .attendance
        .bulk_mark(claims.sub, class_id, session_id, markings, &device)
        .await
    {
        Ok(outcome) => {
            let message = format!(
                "Processed {} record(s): {} succeeded, {} failed",
                outcome.processed_count, outcome.success_count, outcome.failure_count
            );
            (
                StatusCode::OK,
                Json(ApiResponse::outcome(outcome.success, outcome, message)),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/check-in
///
/// Student check-in with a scanned credential.
///
/// ### Request Body
/// ```json
/// { "token": "…", "signature": "…" }
/// ```
///
/// ### Responses
/// - `201 Created` on first check-in
/// - `200 OK` when the student is already recorded (idempotent)
/// - `400 Bad Request` when the credential is rejected; the reason is in `message`
pub async fn check_in(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<CheckInReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .attendance
        .check_in(
            claims.sub,
            &req.token,
            &req.signature,
            session_id,
            class_id,
            &device,
        )
        .await
    {
        Ok(outcome) => {
            let (status, success, message) = match &outcome {
                CheckInOutcome::CheckedIn { .. } => {
                    (StatusCode::CREATED, true, "Checked in".to_owned())
                }
                CheckInOutcome::AlreadyCheckedIn { .. } => {
                    (StatusCode::OK, true, "Already checked in".to_owned())
                }
                CheckInOutcome::Rejected { reason } => {
                    (StatusCode::BAD_REQUEST, false, reason.clone())
                }
            };
            (
                status,
                Json(ApiResponse::outcome(success, outcome, message)),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
