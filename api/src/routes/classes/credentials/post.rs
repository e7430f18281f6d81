use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::common::{IssueCredentialReq, PresentCredentialReq, RevokeResponse};
use crate::auth::{AuthUser, Device};
use crate::response::{ApiResponse, error_response, service_error};
use crate::routes::common::{JsonBody, format_validation_errors};
use crate::state::AppState;

/// POST /api/classes/{class_id}/sessions/{session_id}/credentials
///
/// Mints the session's first credential.
///
/// ### Request Body
/// ```json
/// { "validity_seconds": 35 }
/// ```
/// `validity_seconds` is optional; the configured lifetime applies otherwise.
///
/// ### Responses
/// - `201 Created` with `{credential_id, token, signature, session_id, class_id, expires_at, rotation_index}`
/// - `409 Conflict` if the session is not in progress, scanning is off, or the caller does not own it
pub async fn issue_credential(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
    JsonBody(req): JsonBody<IssueCredentialReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .credentials
        .issue(class_id, session_id, claims.sub, req.validity_seconds, &device)
        .await
    {
        Ok(payload) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(payload, "QR code generated")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/credentials/rotate
///
/// ### Responses
/// - `201 Created` with the new credential payload
/// - `409 Conflict` when no unexpired credential exists to rotate from
pub async fn rotate_credential(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
) -> Response {
    match state
        .core()
        .credentials
        .rotate(class_id, session_id, claims.sub, &device)
        .await
    {
        Ok(payload) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(payload, "QR code rotated")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/credentials/revoke
///
/// Expires every live credential of the session now.
pub async fn revoke_credentials(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Device(device): Device,
) -> Response {
    match state
        .core()
        .credentials
        .revoke(class_id, session_id, claims.sub, &device)
        .await
    {
        Ok(revoked) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                RevokeResponse { revoked },
                format!("Revoked {revoked} QR code(s)"),
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// POST /api/classes/{class_id}/sessions/{session_id}/credentials/validate
///
/// Checks a presented credential. A rejection is a normal outcome and is
/// reported with `200 OK`, `success: false` and the reason in `message`.
///
/// ### Request Body
/// ```json
/// { "token": "…", "signature": "…" }
/// ```
pub async fn validate_credential(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    JsonBody(req): JsonBody<PresentCredentialReq>,
) -> Response {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, format_validation_errors(&errors));
    }

    match state
        .core()
        .credentials
        .validate(&req.token, &req.signature, session_id, class_id)
        .await
    {
        Ok(validation) => {
            let message = validation
                .reason
                .clone()
                .unwrap_or_else(|| "QR code is valid".to_owned());
            (
                StatusCode::OK,
                Json(ApiResponse::outcome(validation.valid, validation, message)),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
