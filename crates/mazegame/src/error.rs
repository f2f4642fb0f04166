//! Unified error type for the maze game server.

use std::path::PathBuf;

use mazegame_engine::GameError;
use mazegame_maze::MazeError;
use mazegame_protocol::ProtocolError;
use mazegame_session::SessionError;
use mazegame_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each wrapping variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MazeGameError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Maze(#[from] MazeError),

    #[error(transparent)]
    Game(#[from] GameError),

    /// The configuration file is not valid JSON for a [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration file exists but could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let top: MazeGameError = err.into();
        assert!(matches!(top, MazeGameError::Transport(_)));
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let top: MazeGameError = err.into();
        assert!(matches!(top, MazeGameError::Protocol(_)));
    }

    #[test]
    fn test_from_game_error() {
        let top: MazeGameError = GameError::Unavailable.into();
        assert!(matches!(top, MazeGameError::Game(_)));
        assert_eq!(top.to_string(), "game pipeline is unavailable");
    }

    #[test]
    fn test_from_maze_error() {
        let top: MazeGameError = MazeError::NoMapFile.into();
        assert!(matches!(top, MazeGameError::Maze(_)));
    }

    #[test]
    fn test_config_error_names_file() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = MazeGameError::Config {
            path: PathBuf::from("server.json"),
            source,
        };
        assert!(err.to_string().starts_with("invalid config file server.json"));
    }
}
