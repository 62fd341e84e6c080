//! Axum router construction for the game API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the game server.
///
/// The router includes:
/// - `GET /currentGeneration` -- generation counter
/// - `GET /boards` -- joined players in turn order
/// - `GET|PUT|POST|PATCH /users/{user}/board` -- read, create, replace, merge
/// - `PUT /users/{user}/board/simple` -- create a hand-tracked board
/// - `POST /users/{user}/board/finishGen` -- finish the generation
/// - `POST /users/{user}/board/endTurn` -- pass the turn
/// - `GET /ws` -- live updates and commands
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.cors_origin.as_deref());

    Router::new()
        .route("/currentGeneration", get(handlers::current_generation))
        .route("/boards", get(handlers::list_boards))
        .route(
            "/users/{user}/board",
            get(handlers::get_board)
                .put(handlers::create_board)
                .post(handlers::replace_board)
                .patch(handlers::patch_board),
        )
        .route(
            "/users/{user}/board/simple",
            put(handlers::create_simple_board),
        )
        .route(
            "/users/{user}/board/finishGen",
            post(handlers::finish_generation),
        )
        .route("/users/{user}/board/endTurn", post(handlers::end_turn))
        .route("/ws", get(ws::ws_connect))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser client: `origin` only, or any origin when unset.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            warn!(error = %e, "invalid CORS origin, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods(Any)
        .allow_headers(Any)
}
