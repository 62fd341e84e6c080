//! Error types for game operations.

use tharsis_types::PlayerName;

use crate::store::StoreError;

/// Errors returned by [`Game`](crate::game::Game) operations and the
/// coordinators.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The player has no seat, or their seat holds no board.
    #[error("player not found: {player}")]
    NotFound {
        /// The player that was looked up.
        player: PlayerName,
    },

    /// The player already has a board.
    #[error("board already exists for {player}")]
    Conflict {
        /// The player whose board exists.
        player: PlayerName,
    },

    /// A partial update did not produce a valid board.
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] serde_json::Error),

    /// The board store failed. Nothing from the operation was persisted.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The generation counter cannot advance any further.
    #[error("generation counter overflow at {generation}")]
    GenerationOverflow {
        /// The counter value that could not be incremented.
        generation: u64,
    },

    /// Another subscriber reacting to the operation failed.
    #[error("subscriber failed: {0}")]
    Subscriber(String),
}

impl GameError {
    /// Shorthand for [`GameError::NotFound`].
    pub fn not_found(player: &PlayerName) -> Self {
        Self::NotFound {
            player: player.clone(),
        }
    }
}
