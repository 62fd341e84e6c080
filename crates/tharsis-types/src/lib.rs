//! Shared type definitions for the Tharsis game coordinator.
//!
//! Every crate in the workspace speaks these types. The ones that cross the
//! wire derive `ts-rs` so the browser client gets matching `TypeScript`
//! definitions.
//!
//! # Modules
//!
//! - [`board`] -- [`Board`] and its [`Resource`] tracks
//! - [`roster`] -- the ordered [`Roster`] of seats and the persisted
//!   [`GameDocument`]
//! - [`events`] -- bus topics, event payloads, viewer wire messages
//! - [`ids`] -- [`PlayerName`] and [`ConnectionId`]

pub mod board;
pub mod events;
pub mod ids;
pub mod roster;

pub use board::{Board, Resource};
pub use events::{
    BoardUpdated, ClientCommand, GenerationEnded, PushMessage, TurnChanged, client_topics, topics,
};
pub use ids::{ConnectionId, PlayerName};
pub use roster::{FIRST_GENERATION, GameDocument, Roster, Seat};
