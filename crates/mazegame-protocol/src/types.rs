//! Core vocabulary of the maze game wire format.
//!
//! Every value in this module has a short textual form that appears on the
//! wire (`n`, `food`, `app`, `450`, ...). The enums own that mapping in both
//! directions so that no other part of the workspace ever deals with raw
//! protocol strings.

use std::fmt;

use rand::Rng;
// Serde derives are used for the configuration file and the admin snapshots,
// not for the wire itself (the wire is plain `;`-separated text).
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a logged-in player.
///
/// Ids are handed out monotonically by the server on successful login and
/// are never reused during the lifetime of a server instance. On the wire the
/// id is the bare number; `Display` adds a `P-` prefix so log lines are easy
/// to grep.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ViewDirection
// ---------------------------------------------------------------------------

/// The direction a player is facing. A `STEP` always moves one cell in
/// this direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewDirection {
    North,
    East,
    South,
    West,
}

impl ViewDirection {
    /// All four directions, clockwise starting at north.
    pub const ALL: [ViewDirection; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// The one-letter wire form (`n`, `e`, `s`, `w`).
    pub fn short_name(self) -> &'static str {
        match self {
            Self::North => "n",
            Self::East => "e",
            Self::South => "s",
            Self::West => "w",
        }
    }

    /// Parses the one-letter wire form.
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "n" => Some(Self::North),
            "e" => Some(Self::East),
            "s" => Some(Self::South),
            "w" => Some(Self::West),
            _ => None,
        }
    }

    pub fn turn_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    pub fn turn_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::East => Self::North,
            Self::South => Self::East,
            Self::West => Self::South,
        }
    }

    /// Grid offset of one step in this direction. `y` grows southwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Picks one of the four directions uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for ViewDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// The argument of a `TURN` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Left => "l",
            Self::Right => "r",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "l" => Some(Self::Left),
            "r" => Some(Self::Right),
            _ => None,
        }
    }

    /// Applies this turn to a view direction.
    pub fn apply(self, direction: ViewDirection) -> ViewDirection {
        match self {
            Self::Left => direction.turn_left(),
            Self::Right => direction.turn_right(),
        }
    }
}

// ---------------------------------------------------------------------------
// Baits
// ---------------------------------------------------------------------------

/// The kind of a collectible object lying on a path cell.
///
/// Food, coffee and gems are worth points. Traps cost points and teleport
/// whoever steps on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaitType {
    Food,
    Coffee,
    Gem,
    Trap,
}

impl BaitType {
    pub const ALL: [BaitType; 4] = [Self::Food, Self::Coffee, Self::Gem, Self::Trap];

    /// The wire name used in `BPOS` lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Coffee => "coffee",
            Self::Gem => "gem",
            Self::Trap => "trap",
        }
    }

    /// Score change applied to the collecting player.
    pub fn score(self) -> i32 {
        match self {
            Self::Food => 13,
            Self::Coffee => 42,
            Self::Gem => 314,
            Self::Trap => -128,
        }
    }

    /// Single-letter abbreviation used by compact map renderings.
    pub fn short_char(self) -> char {
        match self {
            Self::Food => 'f',
            Self::Coffee => 'c',
            Self::Gem => 'g',
            Self::Trap => 't',
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.short_char() == c)
    }
}

impl fmt::Display for BaitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a bait appeared (`app`) or vanished (`van`) in a `BPOS` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaitPositionChange {
    Generated,
    Collected,
}

impl BaitPositionChange {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Generated => "app",
            Self::Collected => "van",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "app" => Some(Self::Generated),
            "van" => Some(Self::Collected),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Player position changes
// ---------------------------------------------------------------------------

/// Why a `PPOS` line was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChangeReason {
    Teleport,
    Appear,
    Vanish,
    Move,
    Turn,
}

impl PositionChangeReason {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Teleport => "tel",
            Self::Appear => "app",
            Self::Vanish => "van",
            Self::Move => "mov",
            Self::Turn => "trn",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "tel" => Some(Self::Teleport),
            "app" => Some(Self::Appear),
            "van" => Some(Self::Vanish),
            "mov" => Some(Self::Move),
            "trn" => Some(Self::Turn),
            _ => None,
        }
    }
}

/// What caused a teleport. Appended to `PPOS ...;tel` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportType {
    Trap,
    Collision,
}

impl TeleportType {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Trap => "t",
            Self::Collision => "c",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "t" => Some(Self::Trap),
            "c" => Some(Self::Collision),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InfoCode
// ---------------------------------------------------------------------------

/// Numeric codes carried by `INFO` lines.
///
/// Codes 2xx/3xx carry a payload (chat text, new speed), 4xx/5xx report a
/// mistake made by the receiving client. Every decoded code that is not
/// listed here collapses into [`InfoCode::CompletelyUnknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoCode {
    Ok,
    ServerMessage,
    ClientMessage,
    ClientWhisper,
    SpeedChange,
    WrongParameterValue,
    TooManyClients,
    DuplicateNick,
    WallCrash,
    ActionWithoutReady,
    AlreadyLoggedIn,
    CommandBeforeLogin,
    LoginTimeout,
    UnknownCommand,
    ParameterCountIncorrect,
    CompletelyUnknown,
}

impl InfoCode {
    const TABLE: [(InfoCode, u16); 16] = [
        (Self::Ok, 0),
        (Self::ServerMessage, 200),
        (Self::ClientMessage, 201),
        (Self::ClientWhisper, 202),
        (Self::SpeedChange, 300),
        (Self::WrongParameterValue, 450),
        (Self::TooManyClients, 451),
        (Self::DuplicateNick, 452),
        (Self::WallCrash, 453),
        (Self::ActionWithoutReady, 454),
        (Self::AlreadyLoggedIn, 455),
        (Self::CommandBeforeLogin, 456),
        (Self::LoginTimeout, 457),
        (Self::UnknownCommand, 500),
        (Self::ParameterCountIncorrect, 501),
        (Self::CompletelyUnknown, 999),
    ];

    /// The numeric wire value.
    pub fn code(self) -> u16 {
        Self::TABLE
            .iter()
            .find(|(info, _)| *info == self)
            .map(|(_, code)| *code)
            .unwrap_or(999)
    }

    /// Maps a numeric value back to a code, falling back to
    /// [`InfoCode::CompletelyUnknown`].
    pub fn from_code(code: i64) -> Self {
        Self::TABLE
            .iter()
            .find(|(_, c)| i64::from(*c) == code)
            .map(|(info, _)| *info)
            .unwrap_or(Self::CompletelyUnknown)
    }

    /// `true` for the codes that report a client mistake.
    pub fn is_error(self) -> bool {
        self.code() >= 400
    }
}

impl fmt::Display for InfoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// GameSpeed
// ---------------------------------------------------------------------------

/// The server-wide tick: the delay between a move and the next `RDY.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameSpeed {
    Unlimited,
    Ultra,
    Fast,
    #[default]
    Normal,
    Slow,
    UltraSlow,
}

impl GameSpeed {
    pub const ALL: [GameSpeed; 6] = [
        Self::Unlimited,
        Self::Ultra,
        Self::Fast,
        Self::Normal,
        Self::Slow,
        Self::UltraSlow,
    ];

    /// Delay in milliseconds.
    pub fn delay_ms(self) -> u64 {
        match self {
            Self::Unlimited => 1,
            Self::Ultra => 50,
            Self::Fast => 100,
            Self::Normal => 150,
            Self::Slow => 200,
            Self::UltraSlow => 300,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unlimited => "unlimited",
            Self::Ultra => "ultra",
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
            Self::UltraSlow => "ultra-slow",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// One step faster, saturating at `Unlimited`.
    pub fn speed_up(self) -> Self {
        match self {
            Self::Unlimited | Self::Ultra => Self::Unlimited,
            Self::Fast => Self::Ultra,
            Self::Normal => Self::Fast,
            Self::Slow => Self::Normal,
            Self::UltraSlow => Self::Slow,
        }
    }

    /// One step slower, saturating at `UltraSlow`.
    pub fn slow_down(self) -> Self {
        match self {
            Self::Unlimited => Self::Ultra,
            Self::Ultra => Self::Fast,
            Self::Fast => Self::Normal,
            Self::Normal => Self::Slow,
            Self::Slow | Self::UltraSlow => Self::UltraSlow,
        }
    }
}

impl fmt::Display for GameSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ms)", self.name(), self.delay_ms())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
