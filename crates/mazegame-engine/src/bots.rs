//! The seam between the game pipeline and whoever runs server-side bots.
//!
//! The engine never drives a bot itself. It asks a [`BotSpawner`] to start
//! one; the bot then logs in through an ordinary connection like any other
//! client. What comes back is a [`BotHandle`] that can stop the bot and
//! that exposes the one piece of bot state the engine cares about: whether
//! a frenzy bot is currently in frenzy mode.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::AbortHandle;

use crate::GameHandle;

/// Launches server-side bots by name.
pub trait BotSpawner: Send + Sync + 'static {
    /// Names that [`spawn`](Self::spawn) understands.
    fn names(&self) -> Vec<String>;

    /// Starts the bot called `name`, connected to `game`. Returns `None`
    /// for an unknown name.
    fn spawn(&self, name: &str, game: GameHandle) -> Option<BotHandle>;
}

/// A spawner without bots.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBots;

impl BotSpawner for NoBots {
    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    fn spawn(&self, _name: &str, _game: GameHandle) -> Option<BotHandle> {
        None
    }
}

/// Control over one running bot.
///
/// Dropping the handle leaves the bot running.
#[derive(Debug, Clone)]
pub struct BotHandle {
    special_mode: Arc<AtomicBool>,
    task: AbortHandle,
}

impl BotHandle {
    pub fn new(special_mode: Arc<AtomicBool>, task: AbortHandle) -> Self {
        Self { special_mode, task }
    }

    pub fn special_mode_active(&self) -> bool {
        self.special_mode.load(Ordering::Relaxed)
    }

    /// Stops the bot. Its connection closes and the pipeline tears the
    /// client down like any other disconnect.
    pub fn terminate(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
