//! Game server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tharsis-config.yaml` (or `$THARSIS_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the board store
//! 4. Build the game, which attaches generation resolution to its bus
//! 5. Serve HTTP and `WebSocket` clients until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tharsis_core::Game;
use tharsis_core::config::{LoggingConfig, StorageBackend, StorageConfig, TharsisConfig};
use tharsis_core::json_store::JsonFileStore;
use tharsis_core::store::{MemoryStore, SharedStore};
use tharsis_events::EventBus;
use tharsis_server::{AppState, ServerConfig, start_server};
use tharsis_types::GameDocument;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "tharsis-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("THARSIS_CONFIG")
        .map_or_else(|_unset| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = TharsisConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_logging(&config.logging);
    info!(config = %config_path.display(), "tharsis-server starting");

    let store = open_store(&config.storage, &config.game.players)?;
    let bus = Arc::new(EventBus::new());
    let game = Game::new(store, bus, &config.game);
    info!(
        generation = game.current_generation().unwrap_or_default(),
        players = game.active_players().map(|players| players.len()).unwrap_or_default(),
        "Game ready"
    );

    let state = AppState::new(Arc::new(game)).with_cors_origin(config.server.cors_origin.clone());
    start_server(&ServerConfig::from(&config.server), Arc::new(state))
        .await
        .context("running server")?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_unset| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn open_store(storage: &StorageConfig, players: &[String]) -> anyhow::Result<SharedStore> {
    match storage.backend {
        StorageBackend::Json => {
            let store = JsonFileStore::open(storage.path.clone(), players.iter().cloned())
                .with_context(|| format!("opening {}", storage.path.display()))?;
            Ok(SharedStore::new(store))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; boards are lost on restart");
            Ok(SharedStore::new(MemoryStore::new(GameDocument::seeded(
                players.iter().cloned(),
            ))))
        }
    }
}
