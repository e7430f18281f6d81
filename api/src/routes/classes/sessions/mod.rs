use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::auth::guards::require_class_lecturer;
use crate::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use common::SessionResponse;
pub use get::get_session;
pub use post::{cancel_session, delay_session, start_session};
pub use put::{change_room, toggle_scanning};

/// `/{class_id}/sessions/{session_id}` lifecycle routes, lecturer only.
pub fn session_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{class_id}/sessions/{session_id}", get(get_session))
        .route("/{class_id}/sessions/{session_id}/start", post(start_session))
        .route("/{class_id}/sessions/{session_id}/delay", post(delay_session))
        .route("/{class_id}/sessions/{session_id}/cancel", post(cancel_session))
        .route("/{class_id}/sessions/{session_id}/room", put(change_room))
        .route("/{class_id}/sessions/{session_id}/scanning", put(toggle_scanning))
        .route_layer(from_fn_with_state(app_state, require_class_lecturer))
}
