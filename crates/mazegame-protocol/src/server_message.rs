//! Decoding of the lines a server sends, for clients.
//!
//! The server itself never parses these. They exist for the in-process
//! bots, which are ordinary protocol clients, and for the integration tests
//! that drive a server over real sockets.

use crate::codec::split;
use crate::types::{
    BaitPositionChange, BaitType, InfoCode, PlayerId, PositionChangeReason, TeleportType,
    ViewDirection,
};
use crate::ProtocolError;

/// One decoded server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    ServerVersion(u32),
    Welcome(PlayerId),
    MazeHeader {
        width: usize,
        height: usize,
    },
    /// A line made of `-#.?` only: one row of a maze transfer.
    MazeRow(String),
    Join {
        id: PlayerId,
        nick: String,
        flavor: Option<String>,
    },
    Leave(PlayerId),
    Quit,
    Term,
    /// `INFO;code` without payload, usually an error report.
    Info(InfoCode),
    ServerText(String),
    ClientChat {
        text: String,
        source: PlayerId,
    },
    Whisper {
        text: String,
        source: PlayerId,
    },
    SpeedChange {
        delay_ms: u64,
    },
    PlayerPosition {
        id: PlayerId,
        x: i32,
        y: i32,
        direction: ViewDirection,
        reason: PositionChangeReason,
        teleport: Option<TeleportType>,
        causing: Option<PlayerId>,
    },
    PlayerScore {
        id: PlayerId,
        score: i32,
    },
    BaitPosition {
        x: i32,
        y: i32,
        bait_type: BaitType,
        change: BaitPositionChange,
    },
    Ready,
    /// The flush-only empty line is never written, but a blank line may
    /// still show up from a hand-typed session.
    Empty,
}

fn invalid(line: &str) -> ProtocolError {
    ProtocolError::InvalidMessage(format!("malformed server line: {line}"))
}

fn num<T: std::str::FromStr>(token: Option<&&str>, line: &str) -> Result<T, ProtocolError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| invalid(line))
}

fn field<'a>(token: Option<&&'a str>, line: &str) -> Result<&'a str, ProtocolError> {
    token.copied().ok_or_else(|| invalid(line))
}

/// `true` when the line can only be a maze row.
pub fn is_maze_row(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| matches!(c, '-' | '#' | '.' | '?'))
}

impl ServerMessage {
    /// Decodes one line (without terminator).
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` for an unknown verb or a
    /// known verb with missing or unparseable fields.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        if is_maze_row(line) {
            return Ok(Self::MazeRow(line.to_string()));
        }
        let tokens = split(line);
        let t = |i: usize| tokens.get(i);
        let message = match tokens[0] {
            "MSRV" => Self::ServerVersion(num(t(1), line)?),
            "WELC" => Self::Welcome(PlayerId(num(t(1), line)?)),
            "MAZE" => Self::MazeHeader {
                width: num(t(1), line)?,
                height: num(t(2), line)?,
            },
            "JOIN" => Self::Join {
                id: PlayerId(num(t(1), line)?),
                nick: field(t(2), line)?.to_string(),
                flavor: t(3).map(|f| f.to_string()),
            },
            "LEAV" => Self::Leave(PlayerId(num(t(1), line)?)),
            "QUIT" => Self::Quit,
            "TERM" => Self::Term,
            "RDY." => Self::Ready,
            "INFO" => Self::decode_info(&tokens, line)?,
            "PPOS" => Self::PlayerPosition {
                id: PlayerId(num(t(1), line)?),
                x: num(t(2), line)?,
                y: num(t(3), line)?,
                direction: ViewDirection::from_short_name(field(t(4), line)?)
                    .ok_or_else(|| invalid(line))?,
                reason: PositionChangeReason::from_short_name(field(t(5), line)?)
                    .ok_or_else(|| invalid(line))?,
                teleport: t(6).and_then(|s| TeleportType::from_short_name(s)),
                causing: t(7).and_then(|s| s.parse().ok()).map(PlayerId),
            },
            "PSCO" => Self::PlayerScore {
                id: PlayerId(num(t(1), line)?),
                score: num(t(2), line)?,
            },
            "BPOS" => Self::BaitPosition {
                x: num(t(1), line)?,
                y: num(t(2), line)?,
                bait_type: BaitType::from_name(field(t(3), line)?).ok_or_else(|| invalid(line))?,
                change: BaitPositionChange::from_short_name(field(t(4), line)?)
                    .ok_or_else(|| invalid(line))?,
            },
            _ => return Err(invalid(line)),
        };
        Ok(message)
    }

    fn decode_info(tokens: &[&str], line: &str) -> Result<Self, ProtocolError> {
        let code = InfoCode::from_code(num(tokens.get(1), line)?);
        let message = match code {
            InfoCode::ServerMessage => Self::ServerText(field(tokens.get(2), line)?.to_string()),
            InfoCode::ClientMessage => Self::ClientChat {
                text: field(tokens.get(2), line)?.to_string(),
                source: PlayerId(num(tokens.get(3), line)?),
            },
            InfoCode::ClientWhisper => Self::Whisper {
                text: field(tokens.get(2), line)?.to_string(),
                source: PlayerId(num(tokens.get(3), line)?),
            },
            InfoCode::SpeedChange => Self::SpeedChange {
                delay_ms: num(tokens.get(2), line)?,
            },
            other => Self::Info(other),
        };
        Ok(message)
    }
}
