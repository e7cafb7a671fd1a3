//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{spawn_sweeper, InMemorySessionStore},
    config::Config,
    error::ApiError,
    web::{api_router, rest::ApiDoc, AppState},
};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
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

    // --- 2. Create the Conversation Store & Its Sweeper ---
    let shutdown = CancellationToken::new();
    let session_store = Arc::new(InMemorySessionStore::new(
        config.session_capacity,
        config.session_ttl,
    ));
    let sweeper = spawn_sweeper(
        session_store.clone(),
        config.session_sweep_interval,
        shutdown.clone(),
    );
    info!(
        capacity = config.session_capacity,
        ttl_secs = config.session_ttl.as_secs(),
        "Session store ready."
    );

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::with_mock_services(
        config.clone(),
        session_store.clone(),
    ));

    // --- 4. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state)?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received.");
        signal_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    // --- 6. Tear Down ---
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Session sweeper task failed: {}", e);
    }
    session_store.clear().await;
    info!("Session store cleared. Server stopped.");

    Ok(())
}
