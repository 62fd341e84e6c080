//! Listener setup and the serve loop for one game.
//!
//! [`bind`] claims the port named in the `server` section of
//! `tharsis-config.yaml`, and [`serve`] answers the board API and `/ws`
//! viewers on it. Ctrl-C stops accepting new requests; the game and its
//! store are dropped only after in-flight board writes finish.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tharsis_core::config::HttpConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::AppState;

/// Where the game listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or address; names are resolved when binding.
    pub host: String,
    /// TCP port. `0` picks a free one.
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, as used in logs and errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for ServerConfig {
    fn from(config: &HttpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Why the game stopped serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The port could not be claimed.
    #[error("cannot listen on {address}: {source}")]
    Bind {
        /// `host:port` from the config.
        address: String,
        /// What the OS reported.
        source: io::Error,
    },

    /// Accepting connections failed after startup.
    #[error("listener failed: {0}")]
    Serve(#[source] io::Error),
}

/// Claim the configured port.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            address: config.address(),
            source,
        })
}

/// Serve the board API and viewer sockets on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    let players = state
        .game
        .active_players()
        .map(|players| players.len())
        .unwrap_or_default();
    info!(addr = ?local, players, "Accepting players and viewers");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(ctrl_c())
        .await
        .map_err(ServerError::Serve)?;

    info!("Game server stopped");
    Ok(())
}

/// [`bind`] then [`serve`].
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed.
        error!(error = %e, "cannot watch for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, finishing in-flight requests");
}
