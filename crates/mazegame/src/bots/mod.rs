//! Server-side bots.
//!
//! A bot is an ordinary protocol client living in the server process. Its
//! connection is an in-memory pair: the server end is served by
//! [`handle_connection`](crate::handle_connection) like any TCP client,
//! the bot end is driven by a [`Strategy`].
//!
//! Three strategies are built in, registered under the special names from
//! the configuration:
//!
//! | Name | Strategy |
//! |---|---|
//! | `dummy` | [`RandomWalker`], any number of them (`dummy1`, `dummy2`, ...) |
//! | `trapeater` | [`Greedy::trapeater`], launched by the engine when traps pile up |
//! | `frenzy` | [`Greedy::frenzy`], frenzied near food |

mod runner;
mod strategy;
mod view;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mazegame_engine::{BotHandle, BotSpawner, GameHandle, SpecialBots};
use mazegame_transport::duplex_pair;
use tracing::debug;

pub use strategy::{BotMove, Greedy, RandomWalker, Strategy};
pub use view::BotView;

use crate::handler::{ConnectionOptions, handle_connection};
use runner::BotRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    Dummy,
    Trapeater,
    Frenzy,
}

impl BotKind {
    fn strategy(self) -> Box<dyn Strategy> {
        match self {
            Self::Dummy => Box::new(RandomWalker),
            Self::Trapeater => Box::new(Greedy::trapeater()),
            Self::Frenzy => Box::new(Greedy::frenzy()),
        }
    }
}

/// The built-in bots, by name.
pub struct BotRegistry {
    special: SpecialBots,
    seed: Option<u64>,
    launched: AtomicU64,
}

impl BotRegistry {
    /// `seed` makes bot moves reproducible; each launched bot gets its own
    /// offset from it.
    pub fn new(special: SpecialBots, seed: Option<u64>) -> Self {
        Self {
            special,
            seed,
            launched: AtomicU64::new(0),
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<BotKind> {
        if name == self.special.trapeater {
            Some(BotKind::Trapeater)
        } else if name == self.special.frenzy {
            Some(BotKind::Frenzy)
        } else if self.special.is_dummy(name) {
            Some(BotKind::Dummy)
        } else {
            None
        }
    }
}

impl BotSpawner for BotRegistry {
    fn names(&self) -> Vec<String> {
        vec![
            self.special.dummy.clone(),
            self.special.trapeater.clone(),
            self.special.frenzy.clone(),
        ]
    }

    fn spawn(&self, name: &str, game: GameHandle) -> Option<BotHandle> {
        let kind = self.kind_of(name)?;
        let serial = self.launched.fetch_add(1, Ordering::Relaxed) + 1;
        // Plain `dummy` would clash with the previous one.
        let nick = if name == self.special.dummy {
            format!("{name}{serial}")
        } else {
            name.to_string()
        };
        debug!(nick = %nick, kind = ?kind, "spawning bot");

        let (server_end, bot_end) = duplex_pair();
        let options = ConnectionOptions {
            instant_flush: false,
            server_side: true,
        };
        tokio::spawn(async move {
            if let Err(e) = handle_connection(server_end, game, options).await {
                debug!(error = %e, "bot connection failed");
            }
        });

        let special_mode = Arc::new(AtomicBool::new(false));
        let runner = BotRunner::new(
            nick,
            kind.strategy(),
            Arc::clone(&special_mode),
            self.seed.map(|seed| seed.wrapping_add(serial)),
        );
        let task = tokio::spawn(runner.run(bot_end));
        Some(BotHandle::new(special_mode, task.abort_handle()))
    }
}
