use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::auth::guards::require_class_lecturer;
use crate::state::AppState;

mod common;
mod get;
mod post;

pub use get::{active_credential, credential_history};
pub use post::{issue_credential, revoke_credentials, rotate_credential, validate_credential};

/// `/{class_id}/sessions/{session_id}/credentials` routes, lecturer only.
pub fn credential_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/{class_id}/sessions/{session_id}/credentials",
            get(credential_history).post(issue_credential),
        )
        .route(
            "/{class_id}/sessions/{session_id}/credentials/active",
            get(active_credential),
        )
        .route(
            "/{class_id}/sessions/{session_id}/credentials/rotate",
            post(rotate_credential),
        )
        .route(
            "/{class_id}/sessions/{session_id}/credentials/revoke",
            post(revoke_credentials),
        )
        .route(
            "/{class_id}/sessions/{session_id}/credentials/validate",
            post(validate_credential),
        )
        .route_layer(from_fn_with_state(app_state, require_class_lecturer))
}
