use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub written: usize,
    pub remaining: usize,
}

/// POST /api/audit/dead-letters/replay
///
/// Retries every parked entry. Entries that fail again stay queued.
pub async fn replay_dead_letters(State(state): State<AppState>) -> Response {
    let audit = &state.core().audit;
    let written = audit.replay_dead_letters().await;
    let remaining = audit.dead_letters().len();
    (
        StatusCode::OK,
        Json(ApiResponse::success(
            ReplayResponse { written, remaining },
            format!("Replayed {written} audit entr(ies)"),
        )),
    )
        .into_response()
}
