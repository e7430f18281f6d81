use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::response::{ApiResponse, error_response, service_error};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    pub older_than_days: i64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}

/// DELETE /api/audit?older_than_days=365
///
/// Retention: drops entries created before the cutoff.
///
/// ### Responses
/// - `200 OK` with `{ removed }`
/// - `400 Bad Request` if `older_than_days` is below 1
pub async fn purge_audit_logs(
    State(state): State<AppState>,
    Query(q): Query<PurgeQuery>,
) -> Response {
    if q.older_than_days < 1 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "older_than_days must be at least 1",
        );
    }

    match state.core().audit.purge_older_than(q.older_than_days).await {
        Ok(removed) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                PurgeResponse { removed },
                format!("Purged {removed} audit entr(ies)"),
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
