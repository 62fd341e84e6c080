//! Event topics, their payloads, and the viewer wire messages.
//!
//! Topic names match what the browser client already listens for, so
//! they stay camelCase strings rather than an enum.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::PlayerName;

/// Topic names published on the in-process event bus.
pub mod topics {
    /// A board changed. Payload: [`BoardUpdated`](super::BoardUpdated).
    pub const BOARD_UPDATED: &str = "boardUpdated";
    /// A player finished their generation. No payload.
    pub const PLAYER_FINISHED_GENERATION: &str = "playerFinishedGen";
    /// Production was resolved. Payload: [`GenerationEnded`](super::GenerationEnded).
    pub const GENERATION_ENDED: &str = "generationEnded";
    /// A player handed over the turn. Payload: [`TurnChanged`](super::TurnChanged).
    pub const TURN_ENDED: &str = "turnEnded";
    /// A player received the turn. Payload: [`TurnChanged`](super::TurnChanged).
    pub const TURN_STARTED: &str = "turnStarted";
}

/// Topic names pushed to viewers.
pub mod client_topics {
    /// Forwarded [`topics::BOARD_UPDATED`](super::topics::BOARD_UPDATED).
    pub const BOARD_UPDATED: &str = "boardUpdated";
    /// Forwarded [`topics::GENERATION_ENDED`](super::topics::GENERATION_ENDED).
    pub const NEW_GENERATION: &str = "newGeneration";
    /// Successful reply to a [`ClientCommand`](super::ClientCommand).
    pub const ACK: &str = "ack";
    /// Failed reply to a [`ClientCommand`](super::ClientCommand).
    pub const ERROR: &str = "error";
}

/// Payload of [`topics::BOARD_UPDATED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoardUpdated {
    /// Owner of the board that changed.
    pub user: PlayerName,
}

/// Payload of [`topics::GENERATION_ENDED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GenerationEnded {
    /// The generation that just started.
    #[ts(type = "number")]
    pub generation: u64,
}

/// Payload of [`topics::TURN_ENDED`] and [`topics::TURN_STARTED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TurnChanged {
    /// The player giving up or receiving the turn.
    pub player: PlayerName,
}

/// A frame pushed to a viewer connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PushMessage {
    /// Client-facing topic, see [`client_topics`].
    pub topic: String,
    /// Event payload, forwarded verbatim.
    pub payload: Value,
}

impl PushMessage {
    /// Build a frame.
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// A command sent by a viewer over its live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ClientCommand {
    /// Announce which player this viewer belongs to.
    Join {
        /// The joining player.
        player: PlayerName,
    },
    /// Mark the player's generation as finished.
    #[serde(rename = "finishGen")]
    FinishGeneration {
        /// The finishing player.
        player: PlayerName,
    },
    /// Pass the turn to the next player still playing.
    EndTurn {
        /// The player ending their turn.
        player: PlayerName,
    },
    /// Free-form chatter; answered with a greeting.
    Message {
        /// Whatever the client sent.
        #[serde(default)]
        data: Value,
    },
}
