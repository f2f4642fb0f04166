//! Server configuration: one JSON file, every field optional.
//!
//! ```json
//! {
//!   "connection": { "bind_addr": "0.0.0.0:12345", "max_clients": 30 },
//!   "maze": { "mode": "random", "width": 60, "height": 40 },
//!   "bots": { "auto_launch": ["dummy"] },
//!   "game": { "initial_speed": "fast", "events": { "enabled": true } }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use mazegame_engine::{EngineConfig, GameConfig, SpecialBots};
use mazegame_maze::MazeConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::MazeGameError;

const MIN_LOGIN_TIMEOUT_MS: u64 = 1_000;

// ---------------------------------------------------------------------------
// ConnectionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub bind_addr: String,
    /// Logged-in clients allowed at once.
    pub max_clients: usize,
    pub login_timeout_ms: u64,
    /// Flush after every line instead of after every batch.
    pub instant_flush: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bind_addr: String::from("127.0.0.1:12345"),
            max_clients: 20,
            login_timeout_ms: 30_000,
            instant_flush: false,
        }
    }
}

impl ConnectionConfig {
    pub fn validated(mut self) -> Self {
        if self.max_clients == 0 {
            warn!(field = "connection.max_clients", value = 0, clamped = 1, "value out of range, clamping");
            self.max_clients = 1;
        }
        if self.login_timeout_ms < MIN_LOGIN_TIMEOUT_MS {
            warn!(
                field = "connection.login_timeout_ms",
                value = self.login_timeout_ms,
                clamped = MIN_LOGIN_TIMEOUT_MS,
                "value out of range, clamping"
            );
            self.login_timeout_ms = MIN_LOGIN_TIMEOUT_MS;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// BotsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    /// Bots started together with the server.
    pub auto_launch: Vec<String>,
    pub special: SpecialBots,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// The whole configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub connection: ConnectionConfig,
    pub maze: MazeConfig,
    pub bots: BotsConfig,
    pub game: GameConfig,
}

impl ServerConfig {
    /// Reads the configuration file at `path`.
    ///
    /// `None` or a file that does not exist yields the defaults. The result
    /// is not validated yet.
    pub fn load(path: Option<&Path>) -> Result<Self, MazeGameError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(MazeGameError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config = serde_json::from_str(&text).map_err(|source| MazeGameError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validated(mut self) -> Self {
        self.connection = self.connection.validated();
        self.maze = self.maze.validated();
        self.game = self.game.validated();
        self
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.login_timeout_ms)
    }

    /// The part the game pipeline needs. The maze seed seeds the game too.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            game: self.game.clone(),
            special: self.bots.special.clone(),
            max_clients: self.connection.max_clients,
            login_timeout: self.login_timeout(),
            seed: self.maze.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mazegame_maze::GeneratorMode;
    use mazegame_protocol::GameSpeed;

    use super::*;

    #[test]
    fn test_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.connection.bind_addr, "127.0.0.1:12345");
        assert_eq!(config.connection.max_clients, 20);
        assert_eq!(config.login_timeout(), Duration::from_secs(30));
        assert!(!config.connection.instant_flush);
        assert!(config.bots.auto_launch.is_empty());
        assert_eq!(config.bots.special.trapeater, "trapeater");
        assert_eq!(config.maze.mode, GeneratorMode::Random);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "connection": { "max_clients": 5 },
                "bots": { "auto_launch": ["dummy"] },
                "game": { "initial_speed": "ultra-slow", "events": { "enabled": true } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.connection.max_clients, 5);
        assert_eq!(config.connection.login_timeout_ms, 30_000);
        assert_eq!(config.bots.auto_launch, vec![String::from("dummy")]);
        assert_eq!(config.game.initial_speed, GameSpeed::UltraSlow);
        assert!(config.game.events.enabled);
        assert_eq!(config.game.bait_generator.object_divisor, 26);
    }

    #[test]
    fn test_validated_clamps_connection() {
        let config = ConnectionConfig {
            max_clients: 0,
            login_timeout_ms: 10,
            ..ConnectionConfig::default()
        }
        .validated();
        assert_eq!(config.max_clients, 1);
        assert_eq!(config.login_timeout_ms, MIN_LOGIN_TIMEOUT_MS);
    }

    #[test]
    fn test_validated_clamps_maze_size() {
        let mut config = ServerConfig::default();
        config.maze.width = 500;
        config.maze.height = 3;
        let config = config.validated();
        assert_eq!((config.maze.width, config.maze.height), (120, 15));
    }

    #[test]
    fn test_engine_config_carries_fields() {
        let mut config = ServerConfig::default();
        config.connection.max_clients = 7;
        config.connection.login_timeout_ms = 5_000;
        config.maze.seed = Some(3);
        config.bots.special.dummy = String::from("walker");
        let engine = config.engine_config();
        assert_eq!(engine.max_clients, 7);
        assert_eq!(engine.login_timeout, Duration::from_secs(5));
        assert_eq!(engine.seed, Some(3));
        assert_eq!(engine.special.dummy, "walker");
    }

    // =====================================================================
    // load
    // =====================================================================

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.connection.max_clients, 20);
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "connection": {{ "bind_addr": "0.0.0.0:4000" }} }}"#).unwrap();
        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.connection.bind_addr, "0.0.0.0:4000");
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = ServerConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, MazeGameError::Config { .. }));
    }
}
