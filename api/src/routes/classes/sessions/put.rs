use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::common::{ChangeRoomReq, SessionResponse, ToggleScanningReq};
use crate::auth::{AuthUser, Device};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::{JsonBody, format_validation_errors};
use crate::state::AppState;

/// PUT /api/classes/{class_id}/sessions/{session_id}/room
///
/// ### Request Body
/// ```json
/// { "new_room": "IT 4-1", "old_room": "IT 2-27" }
/// ```
pub async fn change_room(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<ChangeRoomReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .sessions
        .change_room(
            class_id,
            session_id,
            claims.sub,
            &req.new_room,
            &req.old_room,
            &device,
        )
        .await
    {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Room changed",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// PUT /api/classes/{class_id}/sessions/{session_id}/scanning
///
/// Pauses or resumes credential issuance without ending the session.
///
/// ### Request Body
/// ```json
/// { "enabled": false }
/// ```
pub async fn toggle_scanning(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<ToggleScanningReq>,
) -> Response {
    match state
        .core()
        .sessions
        .toggle_scanning(class_id, session_id, claims.sub, req.enabled, &device)
        .await
    {
        Ok(session) => {
            let message = if req.enabled {
                "Scanning enabled"
            } else {
                "Scanning disabled"
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(SessionResponse::from(session), message)),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
