use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::credential::CredentialPayload;

use super::common::CredentialHistoryItem;
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::LimitQuery;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: u64 = 20;

/// GET /api/classes/{class_id}/sessions/{session_id}/credentials/active
///
/// The latest unexpired credential, for re-rendering the code on screen.
///
/// ### Responses
/// - `200 OK` with the credential payload
/// - `404 Not Found` when no credential is live
pub async fn active_credential(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
) -> Response {
    match state.core().credentials.active(class_id, session_id).await {
        Ok(Some(payload)) => (
            StatusCode::OK,
            Json(ApiResponse::<CredentialPayload>::success(
                payload,
                "Active QR code retrieved",
            )),
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No active QR code for this session"),
        Err(e) => service_error(e),
    }
}

/// GET /api/classes/{class_id}/sessions/{session_id}/credentials?limit=20
///
/// Issued credentials, newest first.
pub async fn credential_history(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Query(q): Query<LimitQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state
        .core()
        .credentials
        .history(class_id, session_id, limit)
        .await
    {
        Ok(rows) => {
            let items: Vec<CredentialHistoryItem> = rows.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(items, "QR history retrieved")),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
