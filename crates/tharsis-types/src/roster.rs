//! The ordered board collection and the persisted game document.
//!
//! Seat order is turn order, so the [`Roster`] is a `Vec` rather than a
//! map. On the wire it is still a JSON object keyed by player name, with
//! never-joined seats written as `{}`; (de)serialization walks the object
//! in document order so the order survives a save/load cycle.

use core::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::board::Board;
use crate::ids::PlayerName;

/// The generation every new game starts in.
pub const FIRST_GENERATION: u64 = 1;

/// One position in the turn order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Player sitting in this seat.
    pub player: PlayerName,
    /// The player's board, or `None` if they never joined.
    pub board: Option<Board>,
}

impl Seat {
    /// Whether this seat holds a board.
    pub const fn is_active(&self) -> bool {
        self.board.is_some()
    }
}

/// Seats in turn order, unique by player name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    seats: Vec<Seat>,
}

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self { seats: Vec::new() }
    }

    /// Create a roster of empty seats for the given players.
    ///
    /// Duplicate names collapse into the first occurrence.
    pub fn with_players<I, P>(players: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerName>,
    {
        let mut roster = Self::new();
        for player in players {
            let player = player.into();
            if roster.position(&player).is_none() {
                roster.seats.push(Seat {
                    player,
                    board: None,
                });
            }
        }
        roster
    }

    /// All seats in turn order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Number of seats, joined or not.
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the roster has no seats at all.
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Index of `player`'s seat in turn order.
    pub fn position(&self, player: &PlayerName) -> Option<usize> {
        self.seats.iter().position(|seat| &seat.player == player)
    }

    /// The seat at `index`, if any.
    pub fn seat_at(&self, index: usize) -> Option<&Seat> {
        self.seats.get(index)
    }

    /// `player`'s seat, if they have one.
    pub fn seat(&self, player: &PlayerName) -> Option<&Seat> {
        self.seats.iter().find(|seat| &seat.player == player)
    }

    /// `player`'s board, if they have joined.
    pub fn board(&self, player: &PlayerName) -> Option<&Board> {
        self.seat(player).and_then(|seat| seat.board.as_ref())
    }

    /// Put `board` in `player`'s seat, appending a new seat at the end of
    /// the turn order when the player is unknown.
    pub fn insert(&mut self, player: PlayerName, board: Option<Board>) {
        if let Some(seat) = self.seats.iter_mut().find(|seat| seat.player == player) {
            seat.board = board;
        } else {
            self.seats.push(Seat { player, board });
        }
    }

    /// Players that have joined, in turn order.
    pub fn active_players(&self) -> Vec<PlayerName> {
        self.active_boards()
            .map(|(player, _)| player.clone())
            .collect()
    }

    /// Joined players and their boards, in turn order.
    pub fn active_boards(&self) -> impl Iterator<Item = (&PlayerName, &Board)> {
        self.seats
            .iter()
            .filter_map(|seat| seat.board.as_ref().map(|board| (&seat.player, board)))
    }

    /// Joined players and mutable boards, in turn order.
    pub fn active_boards_mut(&mut self) -> impl Iterator<Item = (&PlayerName, &mut Board)> {
        self.seats
            .iter_mut()
            .filter_map(|seat| seat.board.as_mut().map(|board| (&seat.player, board)))
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let empty = Map::new();
        let mut map = serializer.serialize_map(Some(self.seats.len()))?;
        for seat in &self.seats {
            match &seat.board {
                Some(board) => map.serialize_entry(&seat.player, board)?,
                None => map.serialize_entry(&seat.player, &empty)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RosterVisitor)
    }
}

struct RosterVisitor;

impl<'de> Visitor<'de> for RosterVisitor {
    type Value = Roster;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping player names to boards")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut roster = Roster::new();
        while let Some((player, value)) = access.next_entry::<PlayerName, Value>()? {
            let board = match value {
                Value::Object(ref object) if object.is_empty() => None,
                Value::Null => None,
                other => Some(Board::deserialize(other).map_err(serde::de::Error::custom)?),
            };
            roster.insert(player, board);
        }
        Ok(roster)
    }
}

/// Everything the store persists for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDocument {
    /// Current generation counter.
    #[serde(default = "first_generation")]
    pub generation: u64,
    /// Seats in turn order.
    #[serde(default)]
    pub boards: Roster,
}

const fn first_generation() -> u64 {
    FIRST_GENERATION
}

impl GameDocument {
    /// A fresh game in the first generation with an empty seat for each
    /// player.
    pub fn seeded<I, P>(players: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerName>,
    {
        Self {
            generation: FIRST_GENERATION,
            boards: Roster::with_players(players),
        }
    }
}

impl Default for GameDocument {
    fn default() -> Self {
        Self {
            generation: FIRST_GENERATION,
            boards: Roster::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Resource;

    fn name(s: &str) -> PlayerName {
        PlayerName::from(s)
    }

    #[test]
    fn preserves_document_order() {
        let json = r#"{
            "generation": 4,
            "users": ["javier", "ivan"],
            "boards": {
                "Zed": {},
                "Ivan": { "MONEY": { "ammount": 3, "generation": 1 } },
                "Alex": {}
            }
        }"#;

        let doc: GameDocument = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(doc.generation, 4);
        let order: Vec<&str> = doc
            .boards
            .seats()
            .iter()
            .map(|seat| seat.player.as_str())
            .collect();
        assert_eq!(order, vec!["Zed", "Ivan", "Alex"]);
        assert_eq!(doc.boards.active_players(), vec![name("Ivan")]);
        assert_eq!(
            doc.boards.board(&name("Ivan")).map(|b| b.money),
            Some(Resource::new(3, 1))
        );
    }

    #[test]
    fn empty_seats_serialize_as_empty_objects() {
        let mut roster = Roster::with_players(["Marc", "Sergi"]);
        roster.insert(name("Sergi"), Some(Board::default()));

        let value = serde_json::to_value(&roster).unwrap_or(Value::Null);
        assert_eq!(value["Marc"], serde_json::json!({}));
        assert_eq!(value["Sergi"]["doneGen"], false);
    }

    #[test]
    fn insert_fills_existing_seat_in_place() {
        let mut roster = Roster::with_players(["A", "B", "C"]);
        roster.insert(name("B"), Some(Board::default()));
        roster.insert(name("D"), Some(Board::default()));

        assert_eq!(roster.len(), 4);
        assert_eq!(roster.position(&name("B")), Some(1));
        assert_eq!(roster.position(&name("D")), Some(3));
        assert_eq!(roster.active_players(), vec![name("B"), name("D")]);
    }

    #[test]
    fn with_players_drops_duplicates() {
        let roster = Roster::with_players(["A", "B", "A"]);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn default_document_starts_at_first_generation() {
        let doc: GameDocument = serde_json::from_str("{}").unwrap_or_else(|_| GameDocument {
            generation: 0,
            boards: Roster::new(),
        });
        assert_eq!(doc.generation, FIRST_GENERATION);
        assert!(doc.boards.is_empty());
    }
}
