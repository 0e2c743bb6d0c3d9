//! HTTP surface exposing the recommendation engine to collaborators.

mod routes;
mod state;

pub use routes::build_router;
pub use state::ServerState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the HTTP server until the shutdown token fires.
pub async fn run_server(
    state: ServerState,
    port: u16,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await
        .context("Server error")?;
    Ok(())
}
