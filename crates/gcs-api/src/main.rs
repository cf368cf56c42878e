//! # GCS API Server
//!
//! Main entry point for the drone ground-control station backend.
//! Hosts the telemetry simulation engine behind a REST API, streams its
//! events over WebSocket and records flown missions.

mod config;
mod error;
mod handlers;
mod history;
mod routes;
mod state;

use crate::config::ApiConfig;
use crate::routes::create_router;
use crate::state::AppState;

use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("Starting GCS telemetry server v{}", env!("CARGO_PKG_VERSION"));

    let config = ApiConfig::load()?;
    info!("Configuration loaded");
    info!("   API Port: {}", config.api_port);
    info!("   WebSocket Port: {}", config.ws_port);
    info!("   Location label: {}", config.location_label);
    match config.home_position() {
        Some(home) => info!("   Operator position: ({}, {})", home.latitude, home.longitude),
        None => info!("   Operator position: not configured, missions use the fallback home"),
    }

    let state = AppState::new(config.clone())?;
    info!("Application state initialized");

    let forwarder = state.spawn_event_forwarder();

    let app = create_router(state.clone());
    info!("Routes configured");

    // WebSocket server in background
    let ws_hub = state.ws_hub.clone();
    let ws_port = config.ws_port;
    tokio::spawn(async move {
        if let Err(e) = gcs_websocket::start_server(ws_hub, ws_port).await {
            error!("WebSocket server error: {}", e);
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    info!("API server listening on http://{}", addr);
    info!("WebSocket server on ws://0.0.0.0:{}", config.ws_port);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(summary) = state.driver.end_mission() {
        warn!(
            "Mission still active at shutdown; discarded after {}",
            summary.flight_time
        );
    }
    forwarder.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gcs_api=debug,gcs_sim=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
