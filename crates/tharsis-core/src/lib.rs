//! Board storage, production, and turn coordination for one Tharsis game.
//!
//! This crate owns the game's state machine: who holds the turn, when a
//! generation is over, and what every board produces when it is.
//!
//! # Modules
//!
//! - [`config`] -- `tharsis-config.yaml` loading into typed structs.
//! - [`store`] -- the [`BoardStore`] trait, [`MemoryStore`], and the
//!   locked [`SharedStore`].
//! - [`json_store`] -- [`JsonFileStore`], the on-disk store.
//! - [`production`] -- resource production rules.
//! - [`generation`] -- [`GenerationCoordinator`], resolving a generation
//!   once everyone is done.
//! - [`turn`] -- [`TurnCoordinator`], passing the turn around the table.
//! - [`game`] -- [`Game`], the operation surface used by transports.
//!
//! [`BoardStore`]: store::BoardStore
//! [`MemoryStore`]: store::MemoryStore
//! [`SharedStore`]: store::SharedStore
//! [`JsonFileStore`]: json_store::JsonFileStore
//! [`GenerationCoordinator`]: generation::GenerationCoordinator
//! [`TurnCoordinator`]: turn::TurnCoordinator
//! [`Game`]: game::Game

pub mod config;
pub mod error;
pub mod game;
pub mod generation;
pub mod json_store;
pub mod production;
pub mod store;
pub mod turn;

pub use error::GameError;
pub use game::Game;
pub use generation::GenerationOutcome;
pub use turn::TurnOutcome;
