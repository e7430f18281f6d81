use std::collections::HashMap;

use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::class;

use crate::auth::claims::AuthUser;
use crate::response::{ApiResponse, Empty};
use crate::state::AppState;

type GuardRejection = (StatusCode, Json<ApiResponse<Empty>>);

fn reject(status: StatusCode, message: &str) -> GuardRejection {
    (status, Json(ApiResponse::error(message)))
}

/// Decodes the bearer token and makes the caller available to handlers as
/// `Extension<AuthUser>`.
async fn authenticate(req: Request<Body>) -> Result<(Request<Body>, AuthUser), GuardRejection> {
    let (mut parts, body) = req.into_parts();
    let Ok(user) = AuthUser::from_request_parts(&mut parts, &()).await else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Authentication required"));
    };
    parts.extensions.insert(user.clone());
    Ok((Request::from_parts(parts, body), user))
}

/// Any valid token.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, _) = authenticate(req).await?;
    Ok(next.run(req).await)
}

/// Tokens carrying the `admin` claim.
pub async fn allow_admin(req: Request<Body>, next: Next) -> Result<Response, GuardRejection> {
    let (req, user) = authenticate(req).await?;
    if !user.0.admin {
        return Err(reject(StatusCode::FORBIDDEN, "Admin access required"));
    }
    Ok(next.run(req).await)
}

/// Whether `user` may manage the class: its lecturer, or an admin.
pub async fn is_class_lecturer(state: &AppState, user: &AuthUser, class_id: i64) -> bool {
    if user.0.admin {
        return true;
    }
    match class::Model::is_lecturer_of(state.db(), class_id, user.0.sub).await {
        Ok(owns) => owns,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id = user.0.sub,
                class_id,
                "DB error while checking class ownership; denying access"
            );
            false
        }
    }
}

/// Guard for routes under `/classes/{class_id}` that only the class's
/// lecturer (or an admin) may use.
pub async fn require_class_lecturer(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, user) = authenticate(req).await?;

    let Some(class_id) = params.get("class_id").and_then(|s| s.parse::<i64>().ok()) else {
        return Err(reject(StatusCode::BAD_REQUEST, "Missing or invalid class_id"));
    };

    if !is_class_lecturer(&app_state, &user, class_id).await {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "Lecturer access required for this class",
        ));
    }
    Ok(next.run(req).await)
}
