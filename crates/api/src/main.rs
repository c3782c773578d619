//! Pump Alert API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pump_common::config::AppConfig;
use pump_engine::store::open_store;
use pump_engine::tracking::TrackingService;
use pump_feeds::MarketDataFetcher;

use pump_api::routes::create_router;
use pump_api::state::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("pump_api=debug,pump_engine=info,pump_feeds=info,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Pump Alert API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let api_key = config.require_api_key()?;

    // Token store and market data
    let store = open_store(&config).await?;
    let source = Arc::new(MarketDataFetcher::from_config(&config)?);
    let tracking = Arc::new(TrackingService::new(store, source));

    // Build application state
    let state = AppState::new(tracking, api_key);

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = config.api_bind_addr.parse()?;
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    Ok(())
}
