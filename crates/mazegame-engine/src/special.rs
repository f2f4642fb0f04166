//! The two bots the game itself manages: the frenzy bot, which is sped up
//! while it is in frenzy mode, and the auto trapeater, which comes and goes
//! with the number of traps in the maze.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{error, info};

use crate::bots::BotHandle;
use crate::world::World;

/// Penalty fraction of the trapeater with no visible trap around.
const TRAPEATER_PENALTY_FRACTION: f64 = 1.4;
/// Penalty fraction taken off per visible trap.
const TRAPEATER_REDUCTION_PER_TRAP: f64 = 0.2;
const TRAPEATER_SPAWN_COOLDOWN: Duration = Duration::from_secs(2 * 60);
const TRAPEATER_DESPAWN_COOLDOWN: Duration = Duration::from_secs(5 * 60);
const TRAPEATER_CHANCE: f64 = 0.1;

// ---------------------------------------------------------------------------
// SpecialBot
// ---------------------------------------------------------------------------

/// A bot the engine may start and stop on its own.
#[derive(Debug)]
pub(crate) struct SpecialBot {
    pub(crate) name: String,
    bot: Option<BotHandle>,
}

impl SpecialBot {
    pub(crate) fn new(name: String) -> Self {
        Self { name, bot: None }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.bot.is_some()
    }

    pub(crate) fn special_mode_active(&self) -> bool {
        self.bot.as_ref().is_some_and(BotHandle::special_mode_active)
    }

    /// Stops the bot. Its teardown follows once its connection closes.
    pub(crate) fn terminate(&mut self) -> bool {
        match self.bot.take() {
            Some(bot) => {
                bot.terminate();
                true
            }
            None => false,
        }
    }

    /// The bot left on its own.
    pub(crate) fn forget(&mut self) {
        self.bot = None;
    }
}

/// The trapeater and its spawn and despawn cooldowns.
#[derive(Debug)]
pub(crate) struct AutoTrapeater {
    pub(crate) enabled: bool,
    pub(crate) bot: SpecialBot,
    do_not_spawn_before: Instant,
    do_not_despawn_before: Instant,
}

impl AutoTrapeater {
    pub(crate) fn new(name: String, enabled: bool, now: Instant) -> Self {
        Self {
            enabled,
            bot: SpecialBot::new(name),
            do_not_spawn_before: now + TRAPEATER_SPAWN_COOLDOWN,
            do_not_despawn_before: now + TRAPEATER_DESPAWN_COOLDOWN,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.bot.is_active()
    }

    /// Whether the trapeater should come now. The roll is only taken when
    /// everything else agrees.
    pub(crate) fn wants_spawn<R: Rng + ?Sized>(
        &self,
        now: Instant,
        traps: usize,
        max_traps: usize,
        rng: &mut R,
    ) -> bool {
        !self.is_active()
            && now > self.do_not_spawn_before
            && traps >= max_traps
            && rng.random::<f64>() < TRAPEATER_CHANCE
    }

    pub(crate) fn wants_despawn<R: Rng + ?Sized>(
        &self,
        now: Instant,
        visible_traps: usize,
        max_traps: usize,
        rng: &mut R,
    ) -> bool {
        self.is_active()
            && now > self.do_not_despawn_before
            && visible_traps <= max_traps / 3
            && rng.random::<f64>() < TRAPEATER_CHANCE
    }

    fn spawned(&mut self, bot: Option<BotHandle>) {
        self.do_not_despawn_before = Instant::now() + TRAPEATER_DESPAWN_COOLDOWN;
        self.bot.bot = bot;
    }

    fn despawned(&mut self) {
        self.do_not_spawn_before = Instant::now() + TRAPEATER_SPAWN_COOLDOWN;
    }

    /// `round(delay * 1.4) - round(delay * 0.2) * visible_traps`.
    pub(crate) fn penalty(delay_ms: u64, visible_traps: usize) -> i64 {
        let delay = delay_ms as f64;
        let base = (delay * TRAPEATER_PENALTY_FRACTION).round() as i64;
        let per_trap = (delay * TRAPEATER_REDUCTION_PER_TRAP).round() as i64;
        base - per_trap * visible_traps as i64
    }
}

/// `-(delay - delay / 2)` while in frenzy mode, zero otherwise.
pub(crate) fn frenzy_penalty(delay_ms: u64, special_mode: bool) -> i64 {
    if special_mode {
        let delay = delay_ms as i64;
        -(delay - delay / 2)
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// World integration
// ---------------------------------------------------------------------------

impl World {
    fn spawn_special(&self, name: &str) -> Option<BotHandle> {
        let game = self.scheduler.handle()?;
        self.bots.spawn(name, game)
    }

    /// Sets `penalty` on the server-side connection whose nick starts with
    /// `name`.
    fn set_bot_penalty(&mut self, name: &str, penalty: i64) {
        let delay = self.speed.delay_ms();
        if let Some(client) = self
            .clients
            .values_mut()
            .find(|c| c.server_side && c.nick().starts_with(name))
        {
            client.compensator.set_penalty(penalty, delay);
        }
    }

    pub(crate) fn spawn_frenzy(&mut self) -> bool {
        if self.frenzy.is_active() {
            return true;
        }
        let name = self.frenzy.name.clone();
        self.frenzy.bot = self.spawn_special(&name);
        if self.frenzy.is_active() {
            info!(name = %name, "frenzy bot spawned");
        } else {
            error!(name = %name, "frenzy bot could not be spawned");
        }
        self.frenzy.is_active()
    }

    pub(crate) fn despawn_frenzy(&mut self) {
        if self.frenzy.terminate() {
            info!(name = %self.frenzy.name, "frenzy bot despawned");
        }
    }

    pub(crate) fn apply_frenzy_penalty(&mut self) {
        let penalty = frenzy_penalty(self.speed.delay_ms(), self.frenzy.special_mode_active());
        let name = self.frenzy.name.clone();
        self.set_bot_penalty(&name, penalty);
    }

    pub(crate) fn spawn_trapeater(&mut self) {
        if self.trapeater.is_active() {
            return;
        }
        let name = self.trapeater.bot.name.clone();
        let bot = self.spawn_special(&name);
        if bot.is_some() {
            info!(name = %name, "trapeater spawned");
        } else {
            error!(name = %name, "trapeater could not be spawned, disabling the auto trapeater");
            self.trapeater.enabled = false;
        }
        self.trapeater.spawned(bot);
    }

    pub(crate) fn despawn_trapeater(&mut self) {
        if self.trapeater.bot.terminate() {
            info!(name = %self.trapeater.bot.name, "trapeater despawned");
            self.trapeater.despawned();
        }
    }

    /// The trapeater's connection is gone.
    pub(crate) fn trapeater_left(&mut self) {
        if self.trapeater.is_active() {
            self.trapeater.bot.forget();
            self.trapeater.despawned();
        }
    }

    /// Runs on every bait replacement while the auto trapeater is enabled.
    pub(crate) fn handle_auto_trapeater(&mut self) {
        let now = Instant::now();
        let traps = self.trap_count();
        let visible_traps = self.visible_trap_count();
        let max_traps = self.max_trap_count;
        if self.trapeater.wants_spawn(now, traps, max_traps, &mut self.rng) {
            self.spawn_trapeater();
        } else if self
            .trapeater
            .wants_despawn(now, visible_traps, max_traps, &mut self.rng)
        {
            self.despawn_trapeater();
        }
        if self.trapeater.is_active() {
            let penalty = AutoTrapeater::penalty(self.speed.delay_ms(), visible_traps);
            let name = self.trapeater.bot.name.clone();
            self.set_bot_penalty(&name, penalty);
        }
    }
}
