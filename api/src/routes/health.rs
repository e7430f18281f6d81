use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, Default)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// Builds the `/health` route group.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// GET /health
///
/// ### Responses
/// - `200 OK` with `{"status": "ok", "database": "up"}`
/// - `503 Service Unavailable` when the database cannot be reached
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                HealthStatus {
                    status: "ok",
                    database: "up",
                },
                "Health check passed",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed to reach database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::outcome(
                    false,
                    HealthStatus {
                        status: "degraded",
                        database: "down",
                    },
                    "Database unreachable",
                )),
            )
        }
    }
}
