//! Player boards and their production resources.
//!
//! A [`Board`] carries the six resource tracks the coordinator knows how to
//! produce, plus three flags that drive the generation and turn state
//! machines. Anything else a client stores on its board (steel, cards,
//! notes) is kept in [`Board::extra`] and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// A single resource track: the stock on hand and the per-generation
/// production rate.
///
/// Amounts are signed and never clamped; some card effects drive
/// production below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "bindings/")]
pub struct Resource {
    /// Units currently held. Older clients spell this `ammount`.
    #[serde(alias = "ammount")]
    #[ts(type = "number")]
    pub amount: i64,
    /// Units produced at the end of every generation.
    #[ts(type = "number")]
    pub generation: i64,
}

impl Resource {
    /// Create a resource track.
    pub const fn new(amount: i64, generation: i64) -> Self {
        Self { amount, generation }
    }

    /// Add one generation's worth of production to the stock.
    pub const fn produce(&mut self) {
        self.amount = self.amount.saturating_add(self.generation);
    }
}

/// One player's board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Board {
    /// Terraform rating. Its amount is paid out as income each generation.
    #[serde(rename = "TERRAFORMATION", default)]
    pub terraformation: Resource,
    /// Mega-credits.
    #[serde(rename = "MONEY", default)]
    pub money: Resource,
    /// Titanium.
    #[serde(rename = "TITANIUM", default)]
    pub titanium: Resource,
    /// Plants.
    #[serde(rename = "PLANTS", default)]
    pub plants: Resource,
    /// Energy. Leftover energy turns into heat at the end of a generation.
    #[serde(rename = "ENERGY", default)]
    pub energy: Resource,
    /// Heat.
    #[serde(rename = "HEAT", default)]
    pub heat: Resource,
    /// The player has finished their actions for the current generation.
    #[serde(rename = "doneGen", default)]
    pub done_generation: bool,
    /// The player currently holds the action turn.
    #[serde(rename = "ownTurn", default)]
    pub own_turn: bool,
    /// Production is tracked by hand; the coordinator only resets flags.
    #[serde(rename = "simpleBoard", default)]
    pub simple_board: bool,
    /// Client-owned fields the coordinator does not interpret.
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Board {
    /// Mark this board as a simple board.
    #[must_use]
    pub const fn into_simple(mut self) -> Self {
        self.simple_board = true;
        self
    }

    /// Return a copy of this board with `fields` merged over its top-level
    /// keys.
    ///
    /// Keys present in `fields` replace the whole value under that key;
    /// nested objects are not merged.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged object is no longer a valid board,
    /// e.g. `"doneGen": "yes"`.
    pub fn merged(&self, fields: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(object))
    }

    /// Read a board from a client body.
    ///
    /// An empty object is "no board": a seat written with `{}` stays, or
    /// becomes, a never-joined seat.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty body is not a valid board.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Option<Self>, serde_json::Error> {
        if fields.is_empty() {
            return Ok(None);
        }
        serde_json::from_value(Value::Object(fields.clone())).map(Some)
    }
}
