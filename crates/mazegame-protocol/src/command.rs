//! Decoding of the lines a client sends to the server.
//!
//! Decoding is purely syntactic. It answers "which command is this and are
//! its parameters well formed?" but never "is this client allowed to do
//! that right now?". Login state, readiness and nick uniqueness live in the
//! engine, which applies its own checks first and only then looks at the
//! syntactic verdict stored here.
//!
//! A malformed line never becomes a Rust error: every verdict is an
//! [`InfoCode`] that the engine sends back to the client.

use crate::codec::split;
use crate::text::is_nick_valid;
use crate::types::{InfoCode, PlayerId, TurnDirection};

/// Either the parsed parameters of a command, or the code to report.
pub type Parsed<T> = Result<T, InfoCode>;

/// A chat or whisper request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub text: String,
    /// `None` for a public chat (`INFO;201`), the receiver for a whisper
    /// (`INFO;202`).
    pub target: Option<PlayerId>,
}

/// One decoded client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `HELO;nick`. Fails with 501 on a wrong token count and 450 on a
    /// syntactically invalid nick.
    Hello(Parsed<String>),
    /// `MAZ?`. Fails with 501 when parameters are present.
    MazeQuery(Parsed<()>),
    /// `STEP`. Fails with 450 when parameters are present.
    Step(Parsed<()>),
    /// `TURN;l|r`. The outer result fails with 450 on a wrong token count.
    /// An unknown direction is `Ok(None)`: it is only reported after the
    /// move has been consumed.
    Turn(Parsed<Option<TurnDirection>>),
    /// `INFO;201;text` or `INFO;202;text;target`.
    Chat(Parsed<ChatRequest>),
    /// `BYE!`. Fails with 501 when parameters are present.
    Bye(Parsed<()>),
    /// Anything else, including non-numeric fields where a number is
    /// expected. Always answered with 500.
    Unknown,
}

impl ClientCommand {
    /// Classifies one line (without its terminator).
    pub fn decode(line: &str) -> Self {
        let tokens = split(line);
        match tokens[0] {
            "HELO" => Self::Hello(decode_hello(&tokens)),
            "MAZ?" => Self::MazeQuery(exact(&tokens, 1, InfoCode::ParameterCountIncorrect)),
            "STEP" => Self::Step(exact(&tokens, 1, InfoCode::WrongParameterValue)),
            "TURN" => Self::Turn(decode_turn(&tokens)),
            "INFO" => decode_chat(&tokens).map_or(Self::Unknown, Self::Chat),
            "BYE!" => Self::Bye(exact(&tokens, 1, InfoCode::ParameterCountIncorrect)),
            _ => Self::Unknown,
        }
    }

    /// The verb as it appears on the wire, for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Hello(_) => "HELO",
            Self::MazeQuery(_) => "MAZ?",
            Self::Step(_) => "STEP",
            Self::Turn(_) => "TURN",
            Self::Chat(_) => "INFO",
            Self::Bye(_) => "BYE!",
            Self::Unknown => "????",
        }
    }

    /// `true` for the two commands that consume the player's move.
    pub fn is_movement(&self) -> bool {
        matches!(self, Self::Step(_) | Self::Turn(_))
    }
}

fn exact(tokens: &[&str], count: usize, code: InfoCode) -> Parsed<()> {
    if tokens.len() == count { Ok(()) } else { Err(code) }
}

fn decode_hello(tokens: &[&str]) -> Parsed<String> {
    if tokens.len() != 2 {
        return Err(InfoCode::ParameterCountIncorrect);
    }
    let nick = tokens[1];
    if !is_nick_valid(nick) {
        return Err(InfoCode::WrongParameterValue);
    }
    Ok(nick.to_string())
}

fn decode_turn(tokens: &[&str]) -> Parsed<Option<TurnDirection>> {
    if tokens.len() != 2 {
        return Err(InfoCode::WrongParameterValue);
    }
    Ok(TurnDirection::from_short_name(tokens[1]))
}

/// Returns `None` when a numeric field does not parse, which turns the
/// whole line into [`ClientCommand::Unknown`].
fn decode_chat(tokens: &[&str]) -> Option<Parsed<ChatRequest>> {
    if tokens.len() < 2 {
        return Some(Err(InfoCode::ParameterCountIncorrect));
    }
    let code: i64 = tokens[1].parse().ok()?;
    if tokens.len() < 3 {
        return Some(Err(InfoCode::ParameterCountIncorrect));
    }
    let text = tokens[2].to_string();
    let parsed = match InfoCode::from_code(code) {
        InfoCode::ClientMessage if tokens.len() > 3 => Err(InfoCode::ParameterCountIncorrect),
        InfoCode::ClientMessage => Ok(ChatRequest { text, target: None }),
        InfoCode::ClientWhisper if tokens.len() < 4 => Err(InfoCode::ParameterCountIncorrect),
        InfoCode::ClientWhisper => {
            let target: u32 = tokens[3].parse().ok()?;
            Ok(ChatRequest {
                text,
                target: Some(PlayerId(target)),
            })
        }
        _ => Err(InfoCode::WrongParameterValue),
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // HELO
    // =====================================================================

    #[test]
    fn test_decode_hello_valid_nick() {
        assert_eq!(
            ClientCommand::decode("HELO;bob"),
            ClientCommand::Hello(Ok("bob".into()))
        );
    }

    #[test]
    fn test_decode_hello_wrong_count_is_501() {
        assert_eq!(
            ClientCommand::decode("HELO"),
            ClientCommand::Hello(Err(InfoCode::ParameterCountIncorrect))
        );
        assert_eq!(
            ClientCommand::decode("HELO;a;b"),
            ClientCommand::Hello(Err(InfoCode::ParameterCountIncorrect))
        );
    }

    #[test]
    fn test_decode_hello_invalid_nick_is_450() {
        assert_eq!(
            ClientCommand::decode("HELO;9lives"),
            ClientCommand::Hello(Err(InfoCode::WrongParameterValue))
        );
    }

    // =====================================================================
    // Movement
    // =====================================================================

    #[test]
    fn test_decode_step_with_parameter_is_450() {
        assert_eq!(ClientCommand::decode("STEP"), ClientCommand::Step(Ok(())));
        assert_eq!(
            ClientCommand::decode("STEP;now"),
            ClientCommand::Step(Err(InfoCode::WrongParameterValue))
        );
    }

    #[test]
    fn test_decode_turn_variants() {
        assert_eq!(
            ClientCommand::decode("TURN;l"),
            ClientCommand::Turn(Ok(Some(TurnDirection::Left)))
        );
        assert_eq!(ClientCommand::decode("TURN;x"), ClientCommand::Turn(Ok(None)));
        assert_eq!(
            ClientCommand::decode("TURN"),
            ClientCommand::Turn(Err(InfoCode::WrongParameterValue))
        );
        assert!(ClientCommand::decode("TURN;r").is_movement());
    }

    // =====================================================================
    // Chat
    // =====================================================================

    #[test]
    fn test_decode_chat_public() {
        assert_eq!(
            ClientCommand::decode("INFO;201;hello all"),
            ClientCommand::Chat(Ok(ChatRequest {
                text: "hello all".into(),
                target: None
            }))
        );
    }

    #[test]
    fn test_decode_chat_whisper() {
        assert_eq!(
            ClientCommand::decode("INFO;202;psst;4"),
            ClientCommand::Chat(Ok(ChatRequest {
                text: "psst".into(),
                target: Some(PlayerId(4))
            }))
        );
    }

    #[test]
    fn test_decode_chat_parameter_count_errors() {
        assert_eq!(
            ClientCommand::decode("INFO;201"),
            ClientCommand::Chat(Err(InfoCode::ParameterCountIncorrect))
        );
        assert_eq!(
            ClientCommand::decode("INFO;201;a;b"),
            ClientCommand::Chat(Err(InfoCode::ParameterCountIncorrect))
        );
        assert_eq!(
            ClientCommand::decode("INFO;202;a"),
            ClientCommand::Chat(Err(InfoCode::ParameterCountIncorrect))
        );
    }

    #[test]
    fn test_decode_chat_other_code_is_450() {
        assert_eq!(
            ClientCommand::decode("INFO;300;fast"),
            ClientCommand::Chat(Err(InfoCode::WrongParameterValue))
        );
    }

    #[test]
    fn test_decode_chat_non_numeric_is_unknown() {
        assert_eq!(ClientCommand::decode("INFO;abc;x"), ClientCommand::Unknown);
        assert_eq!(ClientCommand::decode("INFO;202;x;bob"), ClientCommand::Unknown);
    }

    // =====================================================================
    // Other
    // =====================================================================

    #[test]
    fn test_decode_bye_and_maze_query() {
        assert_eq!(ClientCommand::decode("BYE!"), ClientCommand::Bye(Ok(())));
        assert_eq!(
            ClientCommand::decode("BYE!;now"),
            ClientCommand::Bye(Err(InfoCode::ParameterCountIncorrect))
        );
        assert_eq!(
            ClientCommand::decode("MAZ?;1"),
            ClientCommand::MazeQuery(Err(InfoCode::ParameterCountIncorrect))
        );
    }

    #[test]
    fn test_decode_unknown_lines() {
        assert_eq!(ClientCommand::decode(""), ClientCommand::Unknown);
        assert_eq!(ClientCommand::decode("JUMP"), ClientCommand::Unknown);
        assert_eq!(ClientCommand::decode("step"), ClientCommand::Unknown);
    }
}
