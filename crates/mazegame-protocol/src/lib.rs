//! Wire protocol for the maze game.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`PlayerId`], [`BaitType`], [`InfoCode`], [`GameSpeed`], ...)
//!   the vocabulary every line is made of.
//! - **Messages** ([`Message`] and the builders in [`messages`]) what the
//!   server sends.
//! - **Commands** ([`ClientCommand`]) what a client sends, decoded into a
//!   typed verdict.
//! - **Codec** ([`Codec`] trait, [`LineCodec`]) how lines become bytes.
//! - **Client side** ([`ServerMessage`], [`MazeReceiver`]) decoding of
//!   server lines, used by bots and tests.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw lines) and the engine
//! (game state). It doesn't know about connections or players; it only
//! knows how lines look.
//!
//! ```text
//! Transport (lines) → Protocol (ClientCommand / Message) → Engine
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod command;
mod error;
mod maze_receiver;
mod message;
pub mod messages;
mod server_message;
pub mod text;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, LineCodec, PROTOCOL_VERSION, SEPARATOR, split};
pub use command::{ChatRequest, ClientCommand, Parsed};
pub use error::ProtocolError;
pub use maze_receiver::{MazeData, MazeReceiver, Received, ReceiverState};
pub use message::Message;
pub use server_message::{ServerMessage, is_maze_row};
pub use types::{
    BaitPositionChange, BaitType, GameSpeed, InfoCode, PlayerId, PositionChangeReason,
    TeleportType, TurnDirection, ViewDirection,
};
