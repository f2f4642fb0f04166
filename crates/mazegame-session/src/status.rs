//! The connection status state machine.

use std::fmt;

use crate::SessionError;

/// How far a connection got through the login/play sequence.
///
/// ```text
///   NotConnected ──accept──→ Connected ──HELO──→ LoggedIn ──MAZ?──→ Playing
///                                                    │                 ↕
///                                                    └──────MAZ?────→ Spectating
///
///   any live state ──teardown──→ Dying ──→ Dead
/// ```
///
/// The order of the variants matters: every status from `LoggedIn` up to
/// `Playing` counts as logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connected,
    LoggedIn,
    Spectating,
    Playing,
    Dying,
    Dead,
}

impl ConnectionStatus {
    /// Returns `true` if the state machine allows going from `self` to
    /// `next`.
    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, next),
            (NotConnected, Connected)
                | (Connected, LoggedIn)
                | (LoggedIn, Playing)
                | (LoggedIn, Spectating)
                | (Playing, Spectating)
                | (Spectating, Playing)
                | (NotConnected | Connected | LoggedIn | Spectating | Playing, Dying)
                | (Dying, Dead)
        )
    }

    /// Performs a checked transition.
    ///
    /// # Errors
    /// Returns [`SessionError::Dead`] when `self` is already dead and
    /// [`SessionError::InvalidTransition`] for any other illegal move.
    pub fn transition(self, next: ConnectionStatus) -> Result<ConnectionStatus, SessionError> {
        if self == ConnectionStatus::Dead {
            return Err(SessionError::Dead);
        }
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition { from: self, to: next });
        }
        Ok(next)
    }

    /// `LoggedIn`, `Spectating` or `Playing`.
    pub fn is_logged_in(self) -> bool {
        self >= ConnectionStatus::LoggedIn && self <= ConnectionStatus::Playing
    }

    pub fn is_playing(self) -> bool {
        self == ConnectionStatus::Playing
    }

    pub fn is_spectating(self) -> bool {
        self == ConnectionStatus::Spectating
    }

    /// Receives broadcasts: playing or spectating.
    pub fn is_in_game(self) -> bool {
        self.is_playing() || self.is_spectating()
    }

    /// `Dying` or `Dead`: teardown has started.
    pub fn is_terminating(self) -> bool {
        self >= ConnectionStatus::Dying
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotConnected | Self::Dead => "Disconnected",
            Self::Connected => "Logging in...",
            Self::LoggedIn => "Logged in",
            Self::Spectating => "Spectating",
            Self::Playing => "Playing",
            Self::Dying => "Logging out...",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionStatus::*;

    // =====================================================================
    // transitions
    // =====================================================================

    #[test]
    fn test_transition_full_happy_path() {
        let mut status = NotConnected;
        for next in [Connected, LoggedIn, Playing, Spectating, Playing, Dying, Dead] {
            status = status.transition(next).unwrap();
        }
        assert_eq!(status, Dead);
    }

    #[test]
    fn test_transition_skipping_login_is_rejected() {
        let result = Connected.transition(Playing);
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { from: Connected, to: Playing })
        ));
    }

    #[test]
    fn test_transition_from_dead_is_dead_error() {
        assert!(matches!(Dead.transition(Dying), Err(SessionError::Dead)));
    }

    #[test]
    fn test_any_live_state_can_start_dying() {
        for status in [NotConnected, Connected, LoggedIn, Spectating, Playing] {
            assert!(status.can_transition_to(Dying), "{status:?}");
        }
        assert!(!Dying.can_transition_to(Dying));
    }

    // =====================================================================
    // predicates
    // =====================================================================

    #[test]
    fn test_is_logged_in_range() {
        assert!(!Connected.is_logged_in());
        assert!(LoggedIn.is_logged_in());
        assert!(Spectating.is_logged_in());
        assert!(Playing.is_logged_in());
        assert!(!Dying.is_logged_in());
    }

    #[test]
    fn test_is_in_game_and_terminating() {
        assert!(Playing.is_in_game());
        assert!(Spectating.is_in_game());
        assert!(!LoggedIn.is_in_game());
        assert!(Dying.is_terminating());
        assert!(Dead.is_terminating());
        assert!(!Playing.is_terminating());
    }

    #[test]
    fn test_display_texts() {
        assert_eq!(Connected.to_string(), "Logging in...");
        assert_eq!(Dead.to_string(), "Disconnected");
    }
}
