//! Engine configuration: game rules, bait generation, random events and the
//! names of the special server-side bots.

use std::time::Duration;

use mazegame_protocol::GameSpeed;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// BaitGeneratorConfig
// ---------------------------------------------------------------------------

/// How many baits a maze holds.
///
/// `base = walkable / object_divisor`, `max_traps = max(1, base / trap_divisor)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaitGeneratorConfig {
    pub object_divisor: usize,
    pub trap_divisor: usize,
}

impl Default for BaitGeneratorConfig {
    fn default() -> Self {
        Self {
            object_divisor: 26,
            trap_divisor: 4,
        }
    }
}

impl BaitGeneratorConfig {
    pub fn validated(mut self) -> Self {
        if self.object_divisor == 0 {
            warn!(field = "object_divisor", value = 0, clamped = 1, "value out of range, clamping");
            self.object_divisor = 1;
        }
        if self.trap_divisor == 0 {
            warn!(field = "trap_divisor", value = 0, clamped = 1, "value out of range, clamping");
            self.trap_divisor = 1;
        }
        self
    }

    pub fn base_bait_count(&self, walkable: usize) -> usize {
        walkable / self.object_divisor.max(1)
    }

    pub fn max_trap_count(&self, base: usize) -> usize {
        (base / self.trap_divisor.max(1)).max(1)
    }
}

// ---------------------------------------------------------------------------
// EventsConfig
// ---------------------------------------------------------------------------

/// Random game events and their probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    /// Minimum time between two triggered events.
    pub cooldown_ms: u64,
    pub all_trap: f64,
    pub all_food: f64,
    pub all_coffee: f64,
    pub all_gem: f64,
    pub bait_rush: f64,
    pub lose_bait: f64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown_ms: 90_000,
            all_trap: 0.01,
            all_food: 0.01,
            all_coffee: 0.01,
            all_gem: 0.005,
            bait_rush: 0.05,
            lose_bait: 0.20,
        }
    }
}

impl EventsConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Clamps every probability into `[0, 1]`.
    pub fn validated(mut self) -> Self {
        for (field, value) in [
            ("all_trap", &mut self.all_trap),
            ("all_food", &mut self.all_food),
            ("all_coffee", &mut self.all_coffee),
            ("all_gem", &mut self.all_gem),
            ("bait_rush", &mut self.bait_rush),
            ("lose_bait", &mut self.lose_bait),
        ] {
            let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            if clamped != *value {
                warn!(field, value = *value, clamped, "value out of range, clamping");
                *value = clamped;
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Game section of the server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub initial_speed: GameSpeed,
    pub generate_baits_at_start: bool,
    pub auto_trapeater: bool,
    pub allow_spectator: bool,
    pub delay_compensation: bool,
    pub bait_generator: BaitGeneratorConfig,
    pub events: EventsConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_speed: GameSpeed::Normal,
            generate_baits_at_start: true,
            auto_trapeater: true,
            allow_spectator: true,
            delay_compensation: true,
            bait_generator: BaitGeneratorConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn validated(mut self) -> Self {
        self.bait_generator = self.bait_generator.validated();
        self.events = self.events.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// SpecialBots
// ---------------------------------------------------------------------------

/// Names with a special meaning. Nicks are matched by prefix, so `dummy2`
/// is a dummy too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialBots {
    pub dummy: String,
    pub trapeater: String,
    pub frenzy: String,
    pub spectator: String,
}

impl Default for SpecialBots {
    fn default() -> Self {
        Self {
            dummy: String::from("dummy"),
            trapeater: String::from("trapeater"),
            frenzy: String::from("frenzy"),
            spectator: String::from("spectator"),
        }
    }
}

impl SpecialBots {
    pub fn is_dummy(&self, nick: &str) -> bool {
        nick.starts_with(&self.dummy)
    }

    pub fn is_trapeater(&self, nick: &str) -> bool {
        nick.starts_with(&self.trapeater)
    }

    pub fn is_frenzy(&self, nick: &str) -> bool {
        nick.starts_with(&self.frenzy)
    }

    pub fn is_spectator(&self, nick: &str) -> bool {
        nick.starts_with(&self.spectator)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Everything the game pipeline needs besides the maze.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub game: GameConfig,
    pub special: SpecialBots,
    /// Logged-in clients allowed at once, not counting the trapeater and
    /// frenzy bots.
    pub max_clients: usize,
    /// Time a fresh connection gets to send a valid `HELO`.
    pub login_timeout: Duration,
    /// Seeds the game's random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            special: SpecialBots::default(),
            max_clients: 20,
            login_timeout: Duration::from_secs(30),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn validated(mut self) -> Self {
        self.game = self.game.validated();
        if self.max_clients == 0 {
            warn!(field = "max_clients", value = 0, clamped = 1, "value out of range, clamping");
            self.max_clients = 1;
        }
        self
    }
}
