//! Error types for the session layer.

use crate::ConnectionStatus;

/// Errors that can occur while driving a connection's session state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The requested status change is not part of the state machine.
    ///
    /// This is a server bug, not a client mistake: clients are validated
    /// with INFO codes before any transition is attempted.
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConnectionStatus,
        to: ConnectionStatus,
    },

    /// The connection is already torn down.
    #[error("connection is dead")]
    Dead,
}
