//! Configuration loading and typed config structures.
//!
//! The server reads `tharsis-config.yaml` from the working directory. Every
//! field has a default, so a missing file or an empty document yields a
//! usable configuration. A few settings can be overridden from the
//! environment for container deployments.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::turn::DEFAULT_TURN_SCAN_LIMIT;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `tharsis-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TharsisConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Where boards are kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Game rules and seating.
    #[serde(default)]
    pub game: GameConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TharsisConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// Environment variables override file values:
    /// - `THARSIS_HOST` overrides `server.host`
    /// - `THARSIS_PORT` overrides `server.port`
    /// - `THARSIS_DB_PATH` overrides `storage.path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yml::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.normalize();
        Ok(config)
    }

    /// Raise out-of-range settings to their smallest usable value.
    fn normalize(&mut self) {
        if self.game.turn_scan_limit == 0 {
            warn!("game.turn_scan_limit of 0 would never pass the turn, using 1");
            self.game.turn_scan_limit = 1;
        }
    }

    /// Override settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("THARSIS_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("THARSIS_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!(value = %val, error = %e, "ignoring invalid THARSIS_PORT"),
            }
        }
        if let Ok(val) = std::env::var("THARSIS_DB_PATH") {
            self.storage.path = PathBuf::from(val);
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed by CORS. `None` allows any origin.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Which [`BoardStore`](crate::store::BoardStore) backs the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A JSON document on disk.
    #[default]
    Json,
    /// Process memory only; everything is lost on restart.
    Memory,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the JSON document (ignored by the memory backend).
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_db_path(),
        }
    }
}

/// Game rules and seating.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Seats created for a brand new game, in turn order.
    #[serde(default)]
    pub players: Vec<String>,

    /// Upper bound on seats inspected when passing the turn.
    #[serde(default = "default_turn_scan_limit")]
    pub turn_scan_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            turn_scan_limit: default_turn_scan_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> Option<String> {
    Some("http://localhost:3000".to_owned())
}

fn default_db_path() -> PathBuf {
    PathBuf::from("db.json")
}

const fn default_turn_scan_limit() -> usize {
    DEFAULT_TURN_SCAN_LIMIT
}

fn default_log_level() -> String {
    "info".to_owned()
}
