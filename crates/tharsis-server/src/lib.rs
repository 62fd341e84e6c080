//! HTTP and `WebSocket` server for a Tharsis game.
//!
//! This crate exposes one [`Game`](tharsis_core::Game) over:
//!
//! - **REST endpoints** for reading and writing boards, finishing a
//!   generation, and passing the turn
//! - **`WebSocket` endpoint** (`/ws`) that pushes board and generation
//!   changes to every connected viewer and accepts game commands
//!
//! Game operations are synchronous and run on the blocking pool; events
//! they publish reach viewers through per-connection queues fed by the
//! game's event bus.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
