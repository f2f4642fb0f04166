//! # Mazegame
//!
//! A real-time multiplayer maze game server.
//!
//! Clients connect over TCP and speak a line-based text protocol: they log
//! in, receive the maze and then race each other for baits, one `STEP` or
//! `TURN` per server tick. The server is authoritative; every move runs
//! through a single game pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mazegame::prelude::*;
//!
//! # async fn start() -> Result<(), MazeGameError> {
//! let config = ServerConfig::load(None)?;
//! let server = MazeGameServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

pub mod bots;
pub mod config;
mod error;
mod handler;
mod server;

pub use config::{BotsConfig, ConnectionConfig, ServerConfig};
pub use error::MazeGameError;
pub use handler::{ConnectionOptions, handle_connection};
pub use server::{MazeGameServer, MazeGameServerBuilder};

/// The types needed to run and administer a server.
pub mod prelude {
    pub use crate::bots::BotRegistry;
    pub use crate::{MazeGameError, MazeGameServer, MazeGameServerBuilder, ServerConfig};
    pub use mazegame_engine::{
        ContestConfig, ContestEvent, ContestEventKind, GameHandle, OccupationResult, PlayerInfo,
        PutBait, ServerInfo,
    };
    pub use mazegame_maze::{Maze, MazeConfig};
    pub use mazegame_protocol::{BaitType, GameSpeed, PlayerId};
}
