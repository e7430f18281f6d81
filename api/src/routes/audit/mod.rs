//! Admin-only access to the audit trail.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod delete;
mod get;
mod post;

pub use delete::purge_audit_logs;
pub use get::{
    compliance_report, export_audit_logs, list_dead_letters, resource_trail, search_audit_logs,
};
pub use post::replay_dead_letters;

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_audit_logs).delete(purge_audit_logs))
        .route("/compliance", get(compliance_report))
        .route("/export", get(export_audit_logs))
        .route("/resources/{resource_type}/{resource_id}", get(resource_trail))
        .route("/dead-letters", get(list_dead_letters))
        .route("/dead-letters/replay", post(replay_dead_letters))
}
