//! Server execution logic.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{health_check, now_playing_state, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// How many successive ports to try in total when `auto_port` is enabled.
const MAX_PORT_ATTEMPTS: u16 = 10;

/// Run the now-playing relay server
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "127.0.0.1")
/// * `port` - The port number to bind to (e.g., 8765)
/// * `auto_port` - Probe successive ports when `port` is already taken
/// * `port_file` - Sidecar file the bound port is published to, so a
///   collaborating process can discover it
pub async fn run_server(
    host: String,
    port: u16,
    auto_port: bool,
    port_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/now-playing", get(now_playing_state))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = bind_listener(&host, port, auto_port).await?;
    let bound_port = listener.local_addr()?.port();

    if let Some(path) = &port_file {
        std::fs::write(path, bound_port.to_string())?;
        tracing::info!("Published bound port {} to {}", bound_port, path.display());
    }

    tracing::info!("Now-playing relay listening on {}", listener.local_addr()?);
    tracing::info!("Connect to: ws://{}:{}/ws", host, bound_port);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &port_file {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove port file {}: {}", path.display(), e);
        }
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Bind the listener, probing successive ports when `auto_port` is set.
///
/// Each attempt binds the real listener rather than test-binding first,
/// so there is no window for another process to grab the probed port.
async fn bind_listener(
    host: &str,
    port: u16,
    auto_port: bool,
) -> Result<TcpListener, Box<dyn std::error::Error + Send + Sync>> {
    match TcpListener::bind((host, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if auto_port => {
            tracing::warn!("Port {} is in use ({}), probing for a free one", port, e);

            for offset in 1..MAX_PORT_ATTEMPTS {
                let Some(candidate) = port.checked_add(offset) else {
                    break;
                };
                if let Ok(listener) = TcpListener::bind((host, candidate)).await {
                    tracing::warn!("Port {} is in use, using port {} instead", port, candidate);
                    return Ok(listener);
                }
            }

            Err(format!(
                "could not find an available port after {} attempts starting at {}",
                MAX_PORT_ATTEMPTS, port
            )
            .into())
        }
        Err(e) => Err(format!("port {} is already in use: {}", port, e).into()),
    }
}
