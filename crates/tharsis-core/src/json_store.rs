//! JSON-file board store.
//!
//! The whole game lives in one pretty-printed JSON document. The store
//! keeps the document in memory and rewrites the file on every mutation:
//! the new content goes to a sibling temp file which is then renamed over
//! the target, so a crash mid-write leaves the previous version intact.
//! The in-memory copy only changes after the rename succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use tharsis_types::GameDocument;
use tracing::{debug, info};

use crate::store::{BoardStore, StoreError};

/// A [`BoardStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: GameDocument,
}

impl JsonFileStore {
    /// Open the document at `path`.
    ///
    /// When the file does not exist a new game is written there, with an
    /// empty seat for each of `players`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read or created, or
    /// [`StoreError::Serialization`] if it does not hold a game document.
    pub fn open<I, P>(path: impl Into<PathBuf>, players: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = P>,
        P: Into<tharsis_types::PlayerName>,
    {
        let path = path.into();
        if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let document: GameDocument = serde_json::from_str(&contents)?;
            info!(
                path = %path.display(),
                generation = document.generation,
                seats = document.boards.len(),
                "Loaded game document"
            );
            return Ok(Self { path, document });
        }

        let document = GameDocument::seeded(players);
        write_atomically(&path, &document)?;
        info!(
            path = %path.display(),
            seats = document.boards.len(),
            "Initialized new game document"
        );
        Ok(Self { path, document })
    }
}

impl BoardStore for JsonFileStore {
    fn read(&self) -> Result<GameDocument, StoreError> {
        Ok(self.document.clone())
    }

    fn write_all(&mut self, document: &GameDocument) -> Result<(), StoreError> {
        write_atomically(&self.path, document)?;
        self.document = document.clone();
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, document: &GameDocument) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(document)?;
    let tmp = temp_path(path);
    fs::write(&tmp, json).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), generation = document.generation, "Game document written");
    Ok(())
}
