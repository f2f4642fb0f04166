//! Per-connection session state for the maze game.
//!
//! This crate holds the parts of a client connection that are pure state,
//! with no sockets and no game world attached:
//!
//! 1. **Connection status** ([`ConnectionStatus`]): how far a connection
//!    got through the login/play sequence, with its legal transitions.
//! 2. **Chat control** ([`ChatControl`]): a token bucket that limits chat
//!    spam and makes every chat line cost a move.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)  ← owns one ConnectionStatus + ChatControl per client
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← provides the INFO messages sent to clients
//! ```

mod chat;
mod error;
mod status;

pub use chat::ChatControl;
pub use error::SessionError;
pub use status::ConnectionStatus;
