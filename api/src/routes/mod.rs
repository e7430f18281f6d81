//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness and database reachability (public)
//! - `/classes/{class_id}/...` → session lifecycle, credentials, attendance (authenticated)
//! - `/audit` → audit trail queries and dead-letter replay (admin-only)

use axum::{Router, middleware::from_fn};

use crate::auth::guards::allow_admin;
use crate::routes::{audit::audit_routes, classes::classes_routes, health::health_routes};
use crate::state::AppState;

pub mod audit;
pub mod classes;
pub mod common;
pub mod health;

/// Builds the complete application router for all HTTP endpoints, with
/// state applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/classes", classes_routes(app_state.clone()))
        .nest("/audit", audit_routes().route_layer(from_fn(allow_admin)))
        .with_state(app_state)
}
