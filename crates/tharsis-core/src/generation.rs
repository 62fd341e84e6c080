//! Generation resolution.
//!
//! When the last joined player marks their generation as finished, every
//! board produces, all `doneGen` flags are cleared, and the counter moves
//! on by one. The coordinator listens for
//! [`topics::PLAYER_FINISHED_GENERATION`] and re-reads the store each time,
//! so the signal needs no payload and redundant signals are harmless.
//!
//! The check and the resolution happen under the store lock, so two
//! "last player finished" signals racing each other resolve once.

use std::sync::{Arc, Mutex, PoisonError};

use tharsis_events::{EventBus, HandlerError, Subscription};
use tharsis_types::{GenerationEnded, PlayerName, topics};
use tracing::{debug, info};

use crate::error::GameError;
use crate::production;
use crate::store::SharedStore;

/// What a resolution attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Some players are still playing; nothing changed.
    Pending {
        /// Joined players whose `doneGen` is still `false`, in turn order.
        waiting: Vec<PlayerName>,
    },
    /// Nobody has joined; nothing changed.
    NoActivePlayers,
    /// Production ran and the counter advanced.
    Resolved {
        /// The new generation.
        generation: u64,
    },
}

/// Resolves production once every joined player has finished.
#[derive(Debug)]
pub struct GenerationCoordinator {
    store: SharedStore,
    bus: Arc<EventBus>,
    failure: Mutex<Option<GameError>>,
}

impl GenerationCoordinator {
    /// Create a coordinator over `store` that announces on `bus`.
    pub const fn new(store: SharedStore, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            failure: Mutex::new(None),
        }
    }

    /// The error from the last signal-triggered resolution that failed,
    /// if nobody has collected it yet.
    ///
    /// The bus only carries a message back to the publisher; this keeps
    /// the typed error so callers can tell a store failure from others.
    pub fn take_failure(&self) -> Option<GameError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Resolve the generation if everyone is done.
    ///
    /// On success the boards and the incremented counter are written in a
    /// single store write, then [`topics::GENERATION_ENDED`] is published.
    /// If the write fails nothing is published and the store is unchanged.
    pub fn resolve(&self) -> Result<GenerationOutcome, GameError> {
        let generation = {
            let mut store = self.store.lock();
            let mut document = store.read()?;

            if document.boards.active_boards().next().is_none() {
                debug!("No joined players, generation not resolved");
                return Ok(GenerationOutcome::NoActivePlayers);
            }

            let waiting: Vec<PlayerName> = document
                .boards
                .active_boards()
                .filter(|(_, board)| !board.done_generation)
                .map(|(player, _)| player.clone())
                .collect();
            if !waiting.is_empty() {
                debug!(waiting = waiting.len(), "Generation still in progress");
                return Ok(GenerationOutcome::Pending { waiting });
            }

            let generation =
                document
                    .generation
                    .checked_add(1)
                    .ok_or(GameError::GenerationOverflow {
                        generation: document.generation,
                    })?;
            production::close_generation(&mut document.boards);
            document.generation = generation;
            store.write_all(&document)?;
            generation
        };

        info!(generation, "Generation resolved");
        self.bus
            .publish_event(topics::GENERATION_ENDED, &GenerationEnded { generation });
        Ok(GenerationOutcome::Resolved { generation })
    }

    /// Subscribe this coordinator to [`topics::PLAYER_FINISHED_GENERATION`].
    ///
    /// The handler holds only a weak reference, so dropping the last
    /// [`Arc`] to the coordinator turns the subscription into a no-op.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let coordinator = Arc::downgrade(self);
        self.bus
            .subscribe(topics::PLAYER_FINISHED_GENERATION, move |_| {
                let Some(coordinator) = coordinator.upgrade() else {
                    return Ok(());
                };
                coordinator.resolve().map(drop).map_err(|error| {
                    let failed = HandlerError::failed(&error);
                    *coordinator
                        .failure
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(error);
                    failed
                })
            })
    }
}
