//! Turn rotation within a generation.
//!
//! Ending a turn hands the action token to the next seat, in turn order
//! and wrapping around, whose player has joined and has not finished the
//! generation. The finishing player never passes the turn to themselves.

use std::sync::Arc;

use tharsis_events::EventBus;
use tharsis_types::{BoardUpdated, PlayerName, Roster, TurnChanged, topics};
use tracing::{debug, info};

use crate::error::GameError;
use crate::store::SharedStore;

/// Default cap on seats inspected by one scan.
pub const DEFAULT_TURN_SCAN_LIMIT: usize = 20;

/// What an end-of-turn request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn moved.
    Passed {
        /// The player that ended their turn.
        from: PlayerName,
        /// The player now holding the turn.
        to: PlayerName,
    },
    /// Every other joined player has finished the generation. Nothing
    /// changed; the caller decides whether to keep the turn or close the
    /// generation.
    NoEligiblePlayer,
}

/// Index of the first seat after `current` whose board has not finished
/// the generation.
///
/// Looks at most at every other seat once, and never at more than `limit`
/// seats. Seats without a board are skipped.
pub fn next_eligible(roster: &Roster, current: usize, limit: usize) -> Option<usize> {
    let len = roster.len();
    let steps = len.saturating_sub(1).min(limit);
    (1..=steps).find_map(|offset| {
        let index = current.checked_add(offset)?.checked_rem(len)?;
        let board = roster.seat_at(index)?.board.as_ref()?;
        (!board.done_generation).then_some(index)
    })
}

/// Moves the action token between players.
#[derive(Debug)]
pub struct TurnCoordinator {
    store: SharedStore,
    bus: Arc<EventBus>,
    scan_limit: usize,
}

impl TurnCoordinator {
    /// Create a coordinator over `store` that announces on `bus`.
    ///
    /// A `scan_limit` of zero is raised to one so the next seat is always
    /// checked.
    pub const fn new(store: SharedStore, bus: Arc<EventBus>, scan_limit: usize) -> Self {
        Self {
            store,
            bus,
            scan_limit: if scan_limit == 0 { 1 } else { scan_limit },
        }
    }

    /// End `player`'s turn.
    ///
    /// The new holder's `ownTurn` is set and every other board's cleared
    /// in one store write. Afterwards [`topics::TURN_ENDED`],
    /// [`topics::TURN_STARTED`] and one [`topics::BOARD_UPDATED`] per
    /// affected board are published, finishing player first.
    pub fn end_turn(&self, player: &PlayerName) -> Result<TurnOutcome, GameError> {
        let (next, updated) = {
            let mut store = self.store.lock();
            let mut document = store.read()?;

            let current = document
                .boards
                .position(player)
                .filter(|_| document.boards.board(player).is_some())
                .ok_or_else(|| GameError::not_found(player))?;

            let Some(next_index) = next_eligible(&document.boards, current, self.scan_limit)
            else {
                debug!(%player, "No eligible player to pass the turn to");
                return Ok(TurnOutcome::NoEligiblePlayer);
            };
            let next = document
                .boards
                .seat_at(next_index)
                .map(|seat| seat.player.clone())
                .ok_or_else(|| GameError::not_found(player))?;

            let mut updated = vec![player.clone(), next.clone()];
            let mut dirty = false;
            for (name, board) in document.boards.active_boards_mut() {
                let holds = name == &next;
                if board.own_turn != holds {
                    board.own_turn = holds;
                    dirty = true;
                    if !updated.contains(name) {
                        updated.push(name.clone());
                    }
                }
            }
            if dirty {
                store.write_all(&document)?;
            }
            (next, updated)
        };

        info!(from = %player, to = %next, "Turn passed");
        self.bus.publish_event(
            topics::TURN_ENDED,
            &TurnChanged {
                player: player.clone(),
            },
        );
        self.bus
            .publish_event(topics::TURN_STARTED, &TurnChanged { player: next.clone() });
        for user in updated {
            self.bus
                .publish_event(topics::BOARD_UPDATED, &BoardUpdated { user });
        }

        Ok(TurnOutcome::Passed {
            from: player.clone(),
            to: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;
    use tharsis_types::{Board, GameDocument};

    use super::*;
    use crate::store::{BoardStore, MemoryStore, StoreError};

    fn board(done: bool, own_turn: bool) -> Board {
        Board {
            done_generation: done,
            own_turn,
            ..Board::default()
        }
    }

    fn roster(boards: Vec<(&str, Option<Board>)>) -> Roster {
        let mut roster = Roster::new();
        for (player, board) in boards {
            roster.insert(PlayerName::from(player), board);
        }
        roster
    }

    fn coordinator(roster: Roster) -> (TurnCoordinator, SharedStore, Arc<EventBus>) {
        let store = SharedStore::new(MemoryStore::new(GameDocument {
            generation: 1,
            boards: roster,
        }));
        let bus = Arc::new(EventBus::new());
        let turns = TurnCoordinator::new(store.clone(), Arc::clone(&bus), DEFAULT_TURN_SCAN_LIMIT);
        (turns, store, bus)
    }

    fn record_all(bus: &EventBus, names: &[&'static str]) -> Arc<Mutex<Vec<(String, Value)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for topic in names {
            let sink = Arc::clone(&log);
            let name = (*topic).to_owned();
            // Held by the bus for the test's lifetime.
            let _sub = bus.subscribe(topic, move |payload| {
                if let Ok(mut log) = sink.lock() {
                    log.push((name.clone(), payload.clone()));
                }
                Ok(())
            });
        }
        log
    }

    fn own_turn(store: &SharedStore, player: &str) -> bool {
        store
            .lock()
            .read()
            .ok()
            .and_then(|doc| doc.boards.board(&PlayerName::from(player)).map(|b| b.own_turn))
            .unwrap_or(false)
    }

    #[test]
    fn skips_finished_players() {
        let r = roster(vec![
            ("A", Some(board(true, true))),
            ("B", Some(board(false, false))),
            ("C", Some(board(true, false))),
        ]);
        assert_eq!(next_eligible(&r, 0, DEFAULT_TURN_SCAN_LIMIT), Some(1));
    }

    #[test]
    fn wraps_around_and_skips_empty_seats() {
        let r = roster(vec![
            ("A", Some(board(false, false))),
            ("empty", None),
            ("C", Some(board(true, true))),
        ]);
        assert_eq!(next_eligible(&r, 2, DEFAULT_TURN_SCAN_LIMIT), Some(0));
    }

    #[test]
    fn never_selects_self() {
        let r = roster(vec![
            ("A", Some(board(false, true))),
            ("B", Some(board(true, false))),
        ]);
        assert_eq!(next_eligible(&r, 0, DEFAULT_TURN_SCAN_LIMIT), None);
    }

    #[test]
    fn scan_respects_limit() {
        let r = roster(vec![
            ("A", Some(board(false, true))),
            ("B", Some(board(true, false))),
            ("C", Some(board(true, false))),
            ("D", Some(board(false, false))),
        ]);
        assert_eq!(next_eligible(&r, 0, 2), None);
        assert_eq!(next_eligible(&r, 0, 3), Some(3));
    }

    #[test]
    fn zero_scan_limit_still_reaches_next_seat() {
        let store = SharedStore::new(MemoryStore::new(GameDocument {
            generation: 1,
            boards: roster(vec![
                ("A", Some(board(false, true))),
                ("B", Some(board(false, false))),
            ]),
        }));
        let turns = TurnCoordinator::new(store.clone(), Arc::new(EventBus::new()), 0);

        assert!(matches!(
            turns.end_turn(&PlayerName::from("A")),
            Ok(TurnOutcome::Passed { ref to, .. }) if to.as_str() == "B"
        ));
        assert!(own_turn(&store, "B"));
    }

    #[test]
    fn passes_turn_to_next_unfinished_player() {
        let (turns, store, bus) = coordinator(roster(vec![
            ("A", Some(board(true, true))),
            ("B", Some(board(false, false))),
            ("C", Some(board(true, false))),
        ]));
        let log = record_all(
            &bus,
            &[topics::TURN_ENDED, topics::TURN_STARTED, topics::BOARD_UPDATED],
        );

        let outcome = turns.end_turn(&PlayerName::from("A"));

        assert!(matches!(
            outcome,
            Ok(TurnOutcome::Passed { ref from, ref to }) if from.as_str() == "A" && to.as_str() == "B"
        ));
        assert!(!own_turn(&store, "A"));
        assert!(own_turn(&store, "B"));
        assert!(!own_turn(&store, "C"));

        let log = log.lock().map(|l| l.clone()).unwrap_or_default();
        let expected = vec![
            (String::from("turnEnded"), serde_json::json!({ "player": "A" })),
            (String::from("turnStarted"), serde_json::json!({ "player": "B" })),
            (String::from("boardUpdated"), serde_json::json!({ "user": "A" })),
            (String::from("boardUpdated"), serde_json::json!({ "user": "B" })),
        ];
        assert_eq!(log, expected);
    }

    #[test]
    fn clears_stale_holders() {
        let (turns, store, _bus) = coordinator(roster(vec![
            ("A", Some(board(false, true))),
            ("B", Some(board(false, false))),
            ("C", Some(board(false, true))),
        ]));

        assert!(turns.end_turn(&PlayerName::from("A")).is_ok());

        assert!(!own_turn(&store, "A"));
        assert!(own_turn(&store, "B"));
        assert!(!own_turn(&store, "C"));
    }

    #[test]
    fn nobody_eligible_changes_nothing() {
        let (turns, store, bus) = coordinator(roster(vec![
            ("A", Some(board(false, true))),
            ("B", Some(board(true, false))),
            ("C", Some(board(true, false))),
        ]));
        let before = store.lock().read().unwrap_or_default();
        let log = record_all(&bus, &[topics::TURN_ENDED, topics::BOARD_UPDATED]);

        let outcome = turns.end_turn(&PlayerName::from("A"));

        assert!(matches!(outcome, Ok(TurnOutcome::NoEligiblePlayer)));
        assert_eq!(store.lock().read().unwrap_or_default(), before);
        assert!(log.lock().map(|l| l.is_empty()).unwrap_or(false));
    }

    #[test]
    fn unknown_player_is_not_found() {
        let (turns, _store, _bus) = coordinator(roster(vec![
            ("A", Some(board(false, true))),
            ("empty", None),
        ]));
        assert!(matches!(
            turns.end_turn(&PlayerName::from("Z")),
            Err(GameError::NotFound { .. })
        ));
        assert!(matches!(
            turns.end_turn(&PlayerName::from("empty")),
            Err(GameError::NotFound { .. })
        ));
    }

    struct BrokenStore(GameDocument);

    impl BoardStore for BrokenStore {
        fn read(&self) -> Result<GameDocument, StoreError> {
            Ok(self.0.clone())
        }

        fn write_all(&mut self, _document: &GameDocument) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(String::from("read-only")))
        }
    }

    #[test]
    fn failed_write_keeps_both_flags() {
        let document = GameDocument {
            generation: 1,
            boards: roster(vec![
                ("A", Some(board(false, true))),
                ("B", Some(board(false, false))),
            ]),
        };
        let store = SharedStore::new(BrokenStore(document.clone()));
        let bus = Arc::new(EventBus::new());
        let log = record_all(&bus, &[topics::TURN_STARTED]);
        let turns = TurnCoordinator::new(store.clone(), bus, DEFAULT_TURN_SCAN_LIMIT);

        assert!(matches!(
            turns.end_turn(&PlayerName::from("A")),
            Err(GameError::Store(_))
        ));
        assert_eq!(store.lock().read().unwrap_or_default(), document);
        assert!(log.lock().map(|l| l.is_empty()).unwrap_or(false));
    }
}
