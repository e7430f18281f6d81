use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::common::SessionResponse;
use crate::response::{ApiResponse, service_error};
use crate::state::AppState;

/// GET /api/classes/{class_id}/sessions/{session_id}
///
/// Current lifecycle state of the session.
///
/// ### Responses
/// - `200 OK` with the session
/// - `404 Not Found` if the session does not belong to the class
pub async fn get_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
) -> Response {
    match state.core().sessions.get_state(class_id, session_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session retrieved",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
