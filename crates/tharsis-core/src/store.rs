//! Board storage.
//!
//! [`BoardStore`] is the persistence seam. Implementations only need to
//! read and atomically replace the whole [`GameDocument`]; the keyed
//! helpers have default implementations on top of those two.
//!
//! Stores are synchronous and not internally locked. The game wraps its
//! store in a [`SharedStore`] so that every read-modify-write sequence runs
//! under one mutex.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tharsis_types::{Board, GameDocument, PlayerName, Roster, Seat};

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store of player → board plus the generation counter.
pub trait BoardStore: Send {
    /// Read the whole document.
    fn read(&self) -> Result<GameDocument, StoreError>;

    /// Replace the whole document. Either everything is persisted or the
    /// store is left as it was.
    fn write_all(&mut self, document: &GameDocument) -> Result<(), StoreError>;

    /// Current generation counter.
    fn generation(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.generation)
    }

    /// `player`'s seat, if they have one.
    fn seat(&self, player: &PlayerName) -> Result<Option<Seat>, StoreError> {
        Ok(self.read()?.boards.seat(player).cloned())
    }

    /// Replace only the seats.
    fn write_seats(&mut self, seats: &Roster) -> Result<(), StoreError> {
        let mut document = self.read()?;
        document.boards = seats.clone();
        self.write_all(&document)
    }

    /// Replace only the generation counter.
    fn write_generation(&mut self, generation: u64) -> Result<(), StoreError> {
        let mut document = self.read()?;
        document.generation = generation;
        self.write_all(&document)
    }

    /// Give `owner` a board unless they already have a seat.
    ///
    /// A seeded seat counts as existing even before its player joins; an
    /// unknown player gets a new seat at the end of the turn order. Returns
    /// `false` and writes nothing if the seat exists.
    fn create_board(&mut self, owner: &PlayerName, board: Board) -> Result<bool, StoreError> {
        let mut document = self.read()?;
        if document.boards.seat(owner).is_some() {
            return Ok(false);
        }
        document.boards.insert(owner.clone(), Some(board));
        self.write_all(&document)?;
        Ok(true)
    }

    /// Replace what `owner`'s seat holds; `None` empties it. Returns
    /// `false` and writes nothing if `owner` has no seat.
    fn update_board(&mut self, owner: &PlayerName, board: Option<Board>) -> Result<bool, StoreError> {
        let mut document = self.read()?;
        if document.boards.seat(owner).is_none() {
            return Ok(false);
        }
        document.boards.insert(owner.clone(), board);
        self.write_all(&document)?;
        Ok(true)
    }
}

/// A store that lives only in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: GameDocument,
}

impl MemoryStore {
    /// Create a store holding `document`.
    pub const fn new(document: GameDocument) -> Self {
        Self { document }
    }
}

impl BoardStore for MemoryStore {
    fn read(&self) -> Result<GameDocument, StoreError> {
        Ok(self.document.clone())
    }

    fn write_all(&mut self, document: &GameDocument) -> Result<(), StoreError> {
        self.document = document.clone();
        Ok(())
    }
}

/// A [`BoardStore`] behind the game-wide mutex.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Box<dyn BoardStore>>>,
}

impl core::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedStore").finish_non_exhaustive()
    }
}

impl SharedStore {
    /// Wrap `store`.
    pub fn new<S: BoardStore + 'static>(store: S) -> Self {
        Self::from_box(Box::new(store))
    }

    /// Wrap a store chosen at runtime.
    pub fn from_box(store: Box<dyn BoardStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Take exclusive access to the store for one read-modify-write
    /// sequence.
    ///
    /// Stores only mutate their state after a successful write, so a guard
    /// poisoned by a panicking holder still protects a consistent store.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn BoardStore>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
