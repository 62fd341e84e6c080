//! REST handlers for board and game endpoints.
//!
//! Each handler extracts [`AppState`] from Axum state, runs the matching
//! [`Game`](tharsis_core::Game) operation, and returns JSON. Failures come
//! back as [`ApiError`] with the usual `{"error", "status"}` body.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{Map, Value};
use tharsis_core::{Game, TurnOutcome};
use tharsis_types::{Board, PlayerName};

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned by the end-of-turn endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TurnReport {
    /// The turn moved from `from` to `to`.
    Passed {
        /// The player that ended their turn.
        from: PlayerName,
        /// The player now holding the turn.
        to: PlayerName,
    },
    /// Nobody else can take the turn.
    NoEligiblePlayer,
}

impl From<TurnOutcome> for TurnReport {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Passed { from, to } => Self::Passed { from, to },
            TurnOutcome::NoEligiblePlayer => Self::NoEligiblePlayer,
        }
    }
}

/// What a seat holds on the wire: the board, or `{}` before the player
/// has joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeatBody {
    /// The player's board.
    Joined(Board),
    /// A never-joined seat.
    Empty {},
}

impl From<Option<Board>> for SeatBody {
    fn from(board: Option<Board>) -> Self {
        board.map_or(Self::Empty {}, Self::Joined)
    }
}

/// Current generation counter.
///
/// # Route
///
/// `GET /currentGeneration`
pub async fn current_generation(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let generation = state.run(Game::current_generation).await?;
    Ok(Json(serde_json::json!({ "gen": generation })))
}

/// Players that have joined, in turn order.
///
/// # Route
///
/// `GET /boards`
pub async fn list_boards(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let players = state.run(Game::active_players).await?;
    Ok(Json(players))
}

/// A player's board, or `{}` if they have a seat but have not joined.
///
/// # Route
///
/// `GET /users/{user}/board`
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = state.run(move |game| game.board(&player)).await?;
    Ok(Json(SeatBody::from(board)))
}

/// Create a board for a player without a seat.
///
/// Seeded players already have one and get `409`; they join with `POST`.
///
/// # Route
///
/// `PUT /users/{user}/board`
pub async fn create_board(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(board): Json<Board>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = state.run(move |game| game.create_board(&player, board)).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// Create a player's board with production tracked by hand.
///
/// # Route
///
/// `PUT /users/{user}/board/simple`
pub async fn create_simple_board(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(board): Json<Board>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = state
        .run(move |game| game.create_simple_board(&player, board))
        .await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// Replace what a player's seat holds. An empty object leaves the seat
/// unjoined.
///
/// # Route
///
/// `POST /users/{user}/board`
pub async fn replace_board(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = Board::from_fields(&fields)
        .map_err(|e| ApiError::BadRequest(format!("invalid board: {e}")))?;
    let board = state.run(move |game| game.replace_board(&player, board)).await?;
    Ok(Json(SeatBody::from(board)))
}

/// Merge fields into a player's board.
///
/// # Route
///
/// `PATCH /users/{user}/board`
pub async fn patch_board(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = state
        .run(move |game| game.patch_board(&player, &fields))
        .await?;
    Ok(Json(SeatBody::from(board)))
}

/// Mark a player's generation as finished.
///
/// # Route
///
/// `POST /users/{user}/board/finishGen`
pub async fn finish_generation(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let board = state
        .run(move |game| game.finish_generation(&player))
        .await?;
    Ok(Json(board))
}

/// End a player's turn.
///
/// # Route
///
/// `POST /users/{user}/board/endTurn`
pub async fn end_turn(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let player = PlayerName::new(user);
    let outcome = state.run(move |game| game.end_turn(&player)).await?;
    Ok(Json(TurnReport::from(outcome)))
}
