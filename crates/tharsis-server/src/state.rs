//! Shared application state for the game server.
//!
//! [`AppState`] holds the running [`Game`]. Game operations take the store
//! lock and may write to disk, so handlers run them on the blocking pool
//! through [`AppState::run`].

use std::sync::Arc;

use tharsis_core::{Game, GameError};

use crate::error::ApiError;

/// State shared by every handler and connection.
#[derive(Debug)]
pub struct AppState {
    /// The game served by this process.
    pub game: Arc<Game>,
    /// Origin allowed by CORS. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl AppState {
    /// Serve `game` with CORS open to any origin.
    pub const fn new(game: Arc<Game>) -> Self {
        Self {
            game,
            cors_origin: None,
        }
    }

    /// Restrict CORS to `origin`.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }

    /// Run a game operation off the async executor.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Game) -> Result<T, GameError> + Send + 'static,
    {
        let game = Arc::clone(&self.game);
        tokio::task::spawn_blocking(move || op(&game))
            .await
            .map_err(|e| ApiError::Internal(format!("game task failed: {e}")))?
            .map_err(ApiError::from)
    }
}
