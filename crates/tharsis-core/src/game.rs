//! The per-game operation surface.
//!
//! [`Game`] owns the shared store, the event bus, and both coordinators.
//! Transports (HTTP handlers, the live connection loop) call these methods
//! and never touch the store directly.
//!
//! Every mutating method runs its read-modify-write under the store lock and
//! publishes only after the lock is released, so subscribers may call back
//! into the game.

use std::sync::Arc;

use serde_json::{Map, Value};
use tharsis_events::{EventBus, PublishReport, Subscription};
use tharsis_types::{Board, BoardUpdated, PlayerName, topics};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::generation::GenerationCoordinator;
use crate::store::SharedStore;
use crate::turn::{TurnCoordinator, TurnOutcome};

/// One running game.
#[derive(Debug)]
pub struct Game {
    store: SharedStore,
    bus: Arc<EventBus>,
    generation: Arc<GenerationCoordinator>,
    turns: TurnCoordinator,
    generation_subscription: Subscription,
}

impl Game {
    /// Build a game over `store`, announcing on `bus`.
    ///
    /// The generation coordinator is subscribed to
    /// [`topics::PLAYER_FINISHED_GENERATION`] for as long as the game lives.
    pub fn new(store: SharedStore, bus: Arc<EventBus>, config: &GameConfig) -> Self {
        let generation = Arc::new(GenerationCoordinator::new(store.clone(), Arc::clone(&bus)));
        let generation_subscription = generation.attach();
        let turns = TurnCoordinator::new(store.clone(), Arc::clone(&bus), config.turn_scan_limit);
        Self {
            store,
            bus,
            generation,
            turns,
            generation_subscription,
        }
    }

    /// The bus this game publishes on.
    pub const fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Current generation counter.
    pub fn current_generation(&self) -> Result<u64, GameError> {
        Ok(self.store.lock().generation()?)
    }

    /// Players that have a board, in turn order.
    pub fn active_players(&self) -> Result<Vec<PlayerName>, GameError> {
        Ok(self.store.lock().read()?.boards.active_players())
    }

    /// What `player`'s seat holds: `None` until they join.
    ///
    /// Fails with [`GameError::NotFound`] only if `player` has no seat.
    pub fn board(&self, player: &PlayerName) -> Result<Option<Board>, GameError> {
        self.store
            .lock()
            .seat(player)?
            .map(|seat| seat.board)
            .ok_or_else(|| GameError::not_found(player))
    }

    /// Give a new player a board at the end of the turn order.
    ///
    /// Fails with [`GameError::Conflict`] if `player` already has a seat,
    /// joined or not; seeded players join through
    /// [`replace_board`](Self::replace_board).
    pub fn create_board(&self, player: &PlayerName, board: Board) -> Result<Board, GameError> {
        let created = self.store.lock().create_board(player, board.clone())?;
        if !created {
            return Err(GameError::Conflict {
                player: player.clone(),
            });
        }
        info!(%player, simple = board.simple_board, "Board created");
        self.announce_board(player);
        Ok(board)
    }

    /// Give a new player a board with production tracked by hand.
    pub fn create_simple_board(&self, player: &PlayerName, board: Board) -> Result<Board, GameError> {
        self.create_board(player, board.into_simple())
    }

    /// Replace what `player`'s seat holds. `None` leaves the seat
    /// never-joined.
    pub fn replace_board(
        &self,
        player: &PlayerName,
        board: Option<Board>,
    ) -> Result<Option<Board>, GameError> {
        let updated = self.store.lock().update_board(player, board.clone())?;
        if !updated {
            return Err(GameError::not_found(player));
        }
        debug!(%player, joined = board.is_some(), "Board replaced");
        self.announce_board(player);
        Ok(board)
    }

    /// Merge `fields` over the top-level keys of `player`'s board.
    ///
    /// On a never-joined seat the fields alone become the board, so an
    /// empty patch leaves the seat empty.
    pub fn patch_board(
        &self,
        player: &PlayerName,
        fields: &Map<String, Value>,
    ) -> Result<Option<Board>, GameError> {
        let board = {
            let mut store = self.store.lock();
            let seat = store.seat(player)?.ok_or_else(|| GameError::not_found(player))?;
            let board = match seat.board {
                Some(board) => Some(board.merged(fields)?),
                None => Board::from_fields(fields)?,
            };
            store.update_board(player, board.clone())?;
            board
        };
        debug!(%player, fields = fields.len(), "Board patched");
        self.announce_board(player);
        Ok(board)
    }

    /// Mark `player`'s generation as finished.
    ///
    /// Publishes [`topics::BOARD_UPDATED`] and then
    /// [`topics::PLAYER_FINISHED_GENERATION`]; if that was the last player,
    /// the generation is resolved before this returns. The returned board
    /// reflects the resolution.
    ///
    /// The `doneGen` flag is persisted before resolution runs. If
    /// resolution then fails, its error is returned as is (a store failure
    /// stays [`GameError::Store`]) and the flag stays set, so finishing
    /// again retries the resolution.
    pub fn finish_generation(&self, player: &PlayerName) -> Result<Board, GameError> {
        {
            let mut store = self.store.lock();
            let mut board = store
                .seat(player)?
                .and_then(|seat| seat.board)
                .ok_or_else(|| GameError::not_found(player))?;
            board.done_generation = true;
            store.update_board(player, Some(board))?;
        }
        info!(%player, "Player finished generation");
        self.announce_board(player);

        let report = self
            .bus
            .publish(topics::PLAYER_FINISHED_GENERATION, &Value::Null);
        if let Some(error) = self.generation.take_failure() {
            return Err(error);
        }
        subscriber_result(&report)?;

        self.board(player)?.ok_or_else(|| GameError::not_found(player))
    }

    /// End `player`'s turn and pass it on.
    pub fn end_turn(&self, player: &PlayerName) -> Result<TurnOutcome, GameError> {
        self.turns.end_turn(player)
    }

    fn announce_board(&self, player: &PlayerName) {
        self.bus.publish_event(
            topics::BOARD_UPDATED,
            &BoardUpdated {
                user: player.clone(),
            },
        );
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.generation_subscription.unsubscribe();
    }
}

fn subscriber_result(report: &PublishReport) -> Result<(), GameError> {
    if report.is_clean() {
        return Ok(());
    }
    let message = report
        .failures
        .iter()
        .map(|failure| failure.error.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(GameError::Subscriber(message))
}
