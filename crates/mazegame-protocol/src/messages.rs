//! Builders for every line the server sends.
//!
//! Each function returns a [`Message`] flagged as `last`; callers that batch
//! several lines call [`Message::there_is_more`] on all but the final one or
//! append [`Message::empty_last`].

use crate::codec::{PROTOCOL_VERSION, SEPARATOR};
use crate::types::{
    BaitPositionChange, BaitType, GameSpeed, InfoCode, PlayerId, PositionChangeReason,
    TeleportType, TurnDirection, ViewDirection,
};
use crate::Message;

fn join<I, S>(parts: I) -> Message
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
        }
        line.push_str(part.as_ref());
    }
    Message::new(line)
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

pub fn server_version() -> Message {
    join(["MSRV", &PROTOCOL_VERSION.to_string()])
}

pub fn welcome(id: PlayerId) -> Message {
    join(["WELC", &id.0.to_string()])
}

pub fn maze_header(width: usize, height: usize) -> Message {
    join(["MAZE", &width.to_string(), &height.to_string()])
}

/// `JOIN;id;nick[;flavor]`. A blank flavor is left out.
pub fn join_game(id: PlayerId, nick: &str, flavor: Option<&str>) -> Message {
    let mut parts = vec![String::from("JOIN"), id.0.to_string(), nick.to_string()];
    if let Some(flavor) = flavor.filter(|f| !f.trim().is_empty()) {
        parts.push(flavor.to_string());
    }
    join(parts)
}

pub fn leave(id: PlayerId) -> Message {
    join(["LEAV", &id.0.to_string()])
}

/// Logout confirmation.
pub fn quit() -> Message {
    Message::new("QUIT")
}

/// Server-side termination.
pub fn term() -> Message {
    Message::new("TERM")
}

// ---------------------------------------------------------------------------
// INFO
// ---------------------------------------------------------------------------

pub fn error_info(code: InfoCode) -> Message {
    join(["INFO", &code.code().to_string()])
}

pub fn server_info(text: &str) -> Message {
    join(["INFO", &InfoCode::ServerMessage.code().to_string(), text])
}

pub fn client_info(text: &str, source: PlayerId) -> Message {
    join([
        "INFO",
        &InfoCode::ClientMessage.code().to_string(),
        text,
        &source.0.to_string(),
    ])
}

pub fn client_whisper(text: &str, source: PlayerId) -> Message {
    join([
        "INFO",
        &InfoCode::ClientWhisper.code().to_string(),
        text,
        &source.0.to_string(),
    ])
}

pub fn speed_change(speed: GameSpeed) -> Message {
    join([
        "INFO",
        &InfoCode::SpeedChange.code().to_string(),
        &speed.delay_ms().to_string(),
    ])
}

// ---------------------------------------------------------------------------
// Positions and scores
// ---------------------------------------------------------------------------

fn position_parts(
    id: PlayerId,
    x: i32,
    y: i32,
    direction: ViewDirection,
    reason: PositionChangeReason,
) -> Vec<String> {
    vec![
        String::from("PPOS"),
        id.0.to_string(),
        x.to_string(),
        y.to_string(),
        direction.short_name().to_string(),
        reason.short_name().to_string(),
    ]
}

pub fn player_position(
    id: PlayerId,
    x: i32,
    y: i32,
    direction: ViewDirection,
    reason: PositionChangeReason,
) -> Message {
    join(position_parts(id, x, y, direction, reason))
}

pub fn trap_teleport(id: PlayerId, x: i32, y: i32, direction: ViewDirection) -> Message {
    let mut parts = position_parts(id, x, y, direction, PositionChangeReason::Teleport);
    parts.push(TeleportType::Trap.short_name().to_string());
    join(parts)
}

pub fn collision_teleport(
    id: PlayerId,
    x: i32,
    y: i32,
    direction: ViewDirection,
    causing: PlayerId,
) -> Message {
    let mut parts = position_parts(id, x, y, direction, PositionChangeReason::Teleport);
    parts.push(TeleportType::Collision.short_name().to_string());
    parts.push(causing.0.to_string());
    join(parts)
}

pub fn player_score(id: PlayerId, score: i32) -> Message {
    join(["PSCO", &id.0.to_string(), &score.to_string()])
}

// ---------------------------------------------------------------------------
// Baits and readiness
// ---------------------------------------------------------------------------

pub fn bait_position(x: i32, y: i32, bait_type: BaitType, change: BaitPositionChange) -> Message {
    join([
        "BPOS",
        &x.to_string(),
        &y.to_string(),
        bait_type.name(),
        change.short_name(),
    ])
}

pub fn ready() -> Message {
    Message::new("RDY.")
}

// ---------------------------------------------------------------------------
// Client requests
// ---------------------------------------------------------------------------

// The lines below are what a client sends. The server never builds them;
// the in-process bots and the tests do.

pub fn hello(nick: &str) -> Message {
    join(["HELO", nick])
}

pub fn maze_query() -> Message {
    Message::new("MAZ?")
}

pub fn step() -> Message {
    Message::new("STEP")
}

pub fn turn(direction: TurnDirection) -> Message {
    join(["TURN", direction.short_name()])
}

pub fn chat(text: &str) -> Message {
    join(["INFO", &InfoCode::ClientMessage.code().to_string(), text])
}

pub fn whisper(text: &str, target: PlayerId) -> Message {
    join([
        "INFO",
        &InfoCode::ClientWhisper.code().to_string(),
        text,
        &target.0.to_string(),
    ])
}

pub fn bye() -> Message {
    Message::new("BYE!")
}
