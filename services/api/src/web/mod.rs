pub mod auth;
pub mod check_in;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ticker;
pub mod ws_handler;

pub use middleware::require_user;
pub use ws_handler::ws_handler;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use state::AppState;

/// Builds the API router: public auth routes plus the identity-checked routes.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no user required)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/users", get(rest::list_users_handler));

    // Protected routes (a selected user is required)
    let protected_routes = Router::new()
        .route("/classes", get(rest::list_classes_handler))
        .route("/sessions", post(rest::start_session_handler))
        .route(
            "/sessions/active",
            get(rest::active_session_handler).delete(rest::stop_session_handler),
        )
        .route("/check-in", post(rest::check_in_handler))
        .route("/history", get(rest::history_handler))
        .route("/admin/stats", get(rest::stats_handler))
        .route(
            "/admin/classes/{id}/location",
            put(rest::update_location_handler),
        )
        .route("/notifications", get(rest::list_notifications_handler))
        .route(
            "/notifications/{id}",
            delete(rest::dismiss_notification_handler),
        )
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_user,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&app_state.config.cors_origin))
        .with_state(app_state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::USER_HEADER),
        ]);
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(e) => {
            warn!("Ignoring invalid CORS_ORIGIN '{}': {}", origin, e);
            cors
        }
    }
}
