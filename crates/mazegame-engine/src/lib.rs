//! Game engine for the maze game server.
//!
//! One task owns the whole game: the maze with its occupancy map, every
//! connected client, the baits, the random events and the contest
//! controller. Everything else talks to it through a [`GameHandle`], which
//! queues commands that the task executes one at a time.
//!
//! ```text
//! connection handler ──┐
//! ready/login timers ──┤
//! contest schedule ────┼──▶ command queue ──▶ pipeline task ──▶ per-client queues
//! operators / bots ────┘
//! ```

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

mod admin;
pub mod bait;
pub mod bots;
mod client;
pub mod config;
pub mod contest;
mod error;
mod events;
pub mod info;
mod pipeline;
pub mod player;
mod play;
mod special;
mod world;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use admin::PutBait;
pub use bait::Bait;
pub use bots::{BotHandle, BotSpawner, NoBots};
pub use config::{BaitGeneratorConfig, EngineConfig, EventsConfig, GameConfig, SpecialBots};
pub use contest::{ContestConfig, ContestEvent, ContestEventKind, format_duration};
pub use error::GameError;
pub use info::{BaitInfo, PlayerInfo, ServerInfo};
pub use pipeline::{GameHandle, spawn_game};
pub use player::Player;
pub use world::OccupationResult;
