use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use db::models::audit_log::{AuditAction, AuditFilter};
use serde::Deserialize;
use services::audit::ExportFormat;

use crate::response::{ApiResponse, error_response, service_error};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<i64>,
    /// Action name, e.g. `QR_ROTATED`. Case-insensitive.
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub class_id: Option<i64>,
    pub session_id: Option<i64>,
    /// `success` or `failure`.
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Export only: `json` (default) or `csv`.
    pub format: Option<String>,
}

impl AuditQuery {
    fn filter(&self) -> Result<AuditFilter, Response> {
        let action = match self.action.as_deref() {
            None => None,
            Some(raw) => Some(raw.parse::<AuditAction>().map_err(|_| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Unknown audit action: {raw}"),
                )
            })?),
        };
        Ok(AuditFilter {
            user_id: self.user_id,
            action,
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id,
            class_id: self.class_id,
            session_id: self.session_id,
            status: self.status.clone(),
            from: self.from,
            to: self.to,
        })
    }
}

/// GET /api/audit
///
/// Filtered, paginated audit entries, newest first.
///
/// ### Query Parameters
/// - `user_id`, `action`, `resource_type`, `resource_id`, `class_id`, `session_id`, `status`
/// - `from`, `to` (RFC 3339)
/// - `page` (default 1), `per_page` (default 20, max 100)
///
/// ### Responses
/// - `200 OK` with `{ entries, page, per_page, total }`
/// - `400 Bad Request` for an unknown action name
pub async fn search_audit_logs(
    State(state): State<AppState>,
    Query(q): Query<AuditQuery>,
) -> Response {
    let filter = match q.filter() {
        Ok(filter) => filter,
        Err(res) => return res,
    };

    match state
        .core()
        .audit
        .search(&filter, q.page.unwrap_or(1), q.per_page.unwrap_or(20))
        .await
    {
        Ok(page) => (
            StatusCode::OK,
            Json(ApiResponse::success(page, "Audit logs retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ComplianceQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// GET /api/audit/compliance?from=...&to=...
///
/// Totals, distinct actors, per-action counts and recent failures over a range.
///
/// ### Responses
/// - `200 OK` with the report
/// - `400 Bad Request` if `from` is after `to`
pub async fn compliance_report(
    State(state): State<AppState>,
    Query(q): Query<ComplianceQuery>,
) -> Response {
    match state.core().audit.compliance_report(q.from, q.to).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ApiResponse::success(report, "Compliance report generated")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/audit/export?format=csv
///
/// Downloads every entry matching the search filters as a JSON array or CSV
/// file. Pagination parameters are ignored.
///
/// ### Responses
/// - `200 OK` with the file body and a `Content-Disposition: attachment` header
/// - `400 Bad Request` for an unknown format or action name
pub async fn export_audit_logs(
    State(state): State<AppState>,
    Query(q): Query<AuditQuery>,
) -> Response {
    let format = match q.format.as_deref().unwrap_or("json").parse::<ExportFormat>() {
        Ok(format) => format,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "format must be json or csv",
            );
        }
    };
    let filter = match q.filter() {
        Ok(filter) => filter,
        Err(res) => return res,
    };

    match state.core().audit.export(&filter, format).await {
        Ok(export) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, export.format.content_type().to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export.filename),
                ),
            ],
            export.body,
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/audit/resources/{resource_type}/{resource_id}
///
/// Full trail of one resource in the order it happened.
pub async fn resource_trail(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, i64)>,
) -> Response {
    match state
        .core()
        .audit
        .for_resource(&resource_type, resource_id)
        .await
    {
        Ok(entries) => (
            StatusCode::OK,
            Json(ApiResponse::success(entries, "Audit trail retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/audit/dead-letters
///
/// Audit entries that could not be written and are waiting for replay.
pub async fn list_dead_letters(State(state): State<AppState>) -> Response {
    let letters = state.core().audit.dead_letters();
    let message = format!("{} pending audit entr(ies)", letters.len());
    (StatusCode::OK, Json(ApiResponse::success(letters, message))).into_response()
}
