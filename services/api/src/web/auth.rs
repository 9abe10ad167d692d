//! services/api/src/web/auth.rs
//!
//! Login and logout. There are no credentials: logging in selects one of the
//! seeded users, exactly like picking a name from a dropdown.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use attendance_core::domain::UserRole;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::web::middleware::{selected_user_id, USER_COOKIE};
use crate::web::rest::UserResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user_id: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Select a seeded user
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Unknown user")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state.users.get_user(&req.user_id).await.map_err(|e| {
        warn!("Login for unknown user '{}': {}", req.user_id, e);
        (StatusCode::UNAUTHORIZED, "Unknown user".to_string())
    })?;

    info!("{} logged in as {}", user.name, user.role.as_str());
    let cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", USER_COOKIE, user.id);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/logout - Clear the selected user
///
/// A teacher logging out closes the session running for one of their classes.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No user selected")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = selected_user_id(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No user selected".to_string()))?;

    if let Ok(user) = state.users.get_user(&user_id).await {
        if user.role == UserRole::Teacher {
            stop_own_session(&state, &user.id).await;
        }
    }

    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", USER_COOKIE);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

async fn stop_own_session(state: &AppState, teacher_id: &str) {
    let class_id = match state.attendance.lock().await.active_session() {
        Some(session) => session.class_id.clone(),
        None => return,
    };
    let owns = state
        .classes
        .get_class(&class_id)
        .await
        .map(|class| class.teacher_id == teacher_id)
        .unwrap_or(false);
    if !owns {
        return;
    }

    let stopped = {
        let mut manager = state.attendance.lock().await;
        // Another request may have replaced the session while the lock was released.
        let unchanged = manager
            .active_session()
            .is_some_and(|session| session.class_id == class_id);
        if unchanged {
            manager.stop_session()
        } else {
            None
        }
    };
    if let Some(session) = stopped {
        info!("Session {} closed by teacher logout", session.id);
        state.announce_session_end(&session).await;
    }
}
