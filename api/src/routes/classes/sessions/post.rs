use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::common::{CancelSessionReq, DelaySessionReq, SessionResponse};
use crate::auth::{AuthUser, Device};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::{JsonBody, format_validation_errors};
use crate::state::AppState;

fn session_ok(session: db::models::session::Model, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success(SessionResponse::from(session), message)),
    )
        .into_response()
}

/// POST /api/classes/{class_id}/sessions/{session_id}/start
///
/// Moves a scheduled session to `in_progress` with scanning enabled.
///
/// ### Responses
/// - `200 OK` with the updated session
/// - `404 Not Found` if the session does not exist or was already started
pub async fn start_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
) -> Response {
    match state
        .core()
        .sessions
        .start(class_id, session_id, claims.sub, &device)
        .await
    {
        Ok(session) => session_ok(session, "Session started"),
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/delay
///
/// ### Request Body
/// ```json
/// { "delay_minutes": 15, "reason": "Venue unavailable" }
/// ```
///
/// ### Responses
/// - `200 OK` with the updated session
/// - `400 Bad Request` for a non-positive delay or missing reason
/// - `404 Not Found` / `409 Conflict` (session cancelled)
pub async fn delay_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<DelaySessionReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .sessions
        .delay(
            class_id,
            session_id,
            claims.sub,
            req.delay_minutes,
            &req.reason,
            &device,
        )
        .await
    {
        Ok(session) => session_ok(session, "Session delayed"),
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/cancel
///
/// Terminal. Scanning is switched off.
pub async fn cancel_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<CancelSessionReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .sessions
        .cancel(class_id, session_id, claims.sub, &req.reason, &device)
        .await
    {
        Ok(session) => session_ok(session, "Session cancelled"),
        Err(e) => service_error(e),
    }
}
