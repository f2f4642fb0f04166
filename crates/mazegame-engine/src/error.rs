//! Error types for the game engine.

use mazegame_protocol::PlayerId;
use mazegame_session::SessionError;

/// Errors that can occur when talking to the game pipeline.
///
/// Mistakes made by clients never show up here: they are answered with an
/// `INFO` code on the client's own connection.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The pipeline task has stopped (after shutdown, or it never started).
    #[error("game pipeline is unavailable")]
    Unavailable,

    /// No logged-in player has this id.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// A connection was driven through an illegal status change.
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazegame_session::ConnectionStatus;

    #[test]
    fn test_unknown_player_display() {
        let err = GameError::UnknownPlayer(PlayerId(4));
        assert_eq!(err.to_string(), "unknown player P-4");
    }

    #[test]
    fn test_from_session_error() {
        let err: GameError = SessionError::InvalidTransition {
            from: ConnectionStatus::Dead,
            to: ConnectionStatus::Playing,
        }
        .into();
        assert!(matches!(err, GameError::Session(_)));
    }
}
