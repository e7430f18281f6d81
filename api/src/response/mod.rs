use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use services::ServiceError;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Session started"
/// }
/// ```
///
/// Error responses carry `success: false`, an empty `data` object and the
/// reason in `message`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

/// Empty payload for error responses.
#[derive(Serialize, Default)]
pub struct Empty {}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response with a default `data` payload.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }

    /// A response whose outcome is reported in `success` rather than by the
    /// status code, e.g. a bulk operation where some items failed.
    pub fn outcome(success: bool, data: T, message: impl Into<String>) -> Self {
        Self {
            success,
            data,
            message: message.into(),
        }
    }
}

/// Shorthand for an error reply with an empty payload.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<Empty>::error(message))).into_response()
}

/// Maps a core failure onto its HTTP status.
///
/// Database details are logged, never returned to the client.
pub fn service_error(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::SessionNotEligible(_)
        | ServiceError::NoActiveCredential
        | ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Database(e) => {
            tracing::error!(error = %e, "Database error while handling request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
        ServiceError::Serialization(e) => {
            tracing::error!(error = %e, "Failed to serialize response payload");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Serialization error");
        }
    };
    error_response(status, err.to_string())
}
