//! services/api/src/web/middleware.rs
//!
//! Identity middleware for the protected routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Name of the cookie set by `/auth/login`.
pub const USER_COOKIE: &str = "user";

/// Header accepted in place of the cookie, for scripted clients.
pub const USER_HEADER: &str = "x-user-id";

/// Reads the selected user id from the `user` cookie or the `x-user-id` header.
pub fn selected_user_id(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                c.trim()
                    .strip_prefix(USER_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            })
        });

    from_cookie.or_else(|| {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|id| !id.is_empty())
    })
}

/// Middleware that resolves the selected user against the directory.
///
/// The resolved `User` is inserted into request extensions for handlers to use.
/// A missing or unknown id returns 401 Unauthorized.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = selected_user_id(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let user = state.users.get_user(&user_id).await.map_err(|e| {
        warn!("Rejected request for unknown user '{}': {}", user_id, e);
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
