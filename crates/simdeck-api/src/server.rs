//! Registry HTTP server lifecycle.
//!
//! [`start_server`] binds the listener described by the `server` section
//! of the configuration and serves the router until `Ctrl-C`.

use std::net::SocketAddr;
use std::sync::Arc;

use simdeck_core::config::HttpConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Start the registry HTTP server on `http.host:http.port`.
///
/// In-flight requests are drained after `Ctrl-C` before this returns
/// `Ok(())`.
///
/// # Errors
///
/// [`ServerError::Address`] if host and port do not form a socket
/// address, [`ServerError::Bind`] if the listener cannot bind, and
/// [`ServerError::Serve`] on a fatal I/O error while serving.
pub async fn start_server(http: &HttpConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = listen_addr(http)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Registry server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Registry server stopped");
    Ok(())
}

fn listen_addr(http: &HttpConfig) -> Result<SocketAddr, ServerError> {
    let raw = format!("{}:{}", http.host, http.port);
    raw.parse().map_err(|_| ServerError::Address(raw))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
}

/// Errors that can occur when starting or running the registry server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Host and port do not form a socket address.
    #[error("invalid listen address {0}")]
    Address(String),

    /// Failed to bind to the network address.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(#[source] std::io::Error),
}
