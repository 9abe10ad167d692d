//! services/api/src/bin/api.rs

use api_lib::{
    adapters::SystemClock,
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState, ticker::session_ticker},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), Arc::new(SystemClock))?);
    info!("Seeded directory and attendance log loaded.");

    // --- 3. Start the Session Ticker ---
    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn(session_ticker(app_state.clone(), shutdown.clone()));

    // --- 4. Create the Web Router ---
    let app = router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Could not listen for the shutdown signal.");
            }
            info!("Shutdown signal received.");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = ticker.await {
        return Err(ApiError::Internal(format!("Session ticker panicked: {e}")));
    }
    Ok(())
}
