//! Codec trait and the line codec used on the wire.
//!
//! A "codec" converts between protocol values and raw bytes. The maze game
//! speaks newline-terminated UTF-8 text, so the only implementation is
//! [`LineCodec`]. Keeping the trait means the transport and the bots never
//! hard-code the framing: they are handed a codec and use it.

use crate::{Message, ProtocolError};

/// Field separator inside one line.
pub const SEPARATOR: char = ';';

/// Version announced in the `MSRV` greeting.
pub const PROTOCOL_VERSION: u32 = 1;

/// Encodes outbound messages and decodes inbound lines.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the codec is shared by the read and write actors,
///   which Tokio may run on different worker threads.
/// - `'static` → it owns everything it needs and can live inside a spawned
///   task.
pub trait Codec: Send + Sync + 'static {
    /// Turns a message into the bytes that go on the socket, including the
    /// line terminator.
    fn encode(&self, message: &Message) -> Vec<u8>;

    /// Turns one received line (with or without its terminator) into text.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are not UTF-8.
    fn decode(&self, data: &[u8]) -> Result<String, ProtocolError>;
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] for `\n`-terminated UTF-8 lines.
///
/// Decoding strips a trailing `\n` and an optional `\r` before it, so
/// clients that send CRLF are accepted too.
///
/// ## Example
///
/// ```rust
/// use mazegame_protocol::{Codec, LineCodec, Message};
///
/// let codec = LineCodec;
/// let bytes = codec.encode(&Message::new("RDY."));
/// assert_eq!(bytes, b"RDY.\n");
///
/// let text = codec.decode(b"STEP\r\n").unwrap();
/// assert_eq!(text, "STEP");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode(&self, message: &Message) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(message.text.len() + 1);
        bytes.extend_from_slice(message.text.as_bytes());
        bytes.push(b'\n');
        bytes
    }

    fn decode(&self, data: &[u8]) -> Result<String, ProtocolError> {
        let mut end = data.len();
        if end > 0 && data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
        // `String::from_utf8` takes ownership of the buffer, so copy just
        // the slice we keep. The `?` converts `FromUtf8Error` through the
        // `#[from]` impl on `ProtocolError::Decode`.
        Ok(String::from_utf8(data[..end].to_vec())?)
    }
}

/// Splits a decoded line into its `;`-separated tokens.
pub fn split(line: &str) -> Vec<&str> {
    line.split(SEPARATOR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // encode
    // =====================================================================

    #[test]
    fn test_encode_appends_newline() {
        let bytes = LineCodec.encode(&Message::new("PSCO;1;13"));
        assert_eq!(bytes, b"PSCO;1;13\n");
    }

    #[test]
    fn test_encode_empty_message_is_bare_newline() {
        // The writer skips empty messages; the codec itself stays dumb.
        assert_eq!(LineCodec.encode(&Message::empty_last()), b"\n");
    }

    // =====================================================================
    // decode
    // =====================================================================

    #[test]
    fn test_decode_strips_lf_and_crlf() {
        assert_eq!(LineCodec.decode(b"HELO;bob\n").unwrap(), "HELO;bob");
        assert_eq!(LineCodec.decode(b"HELO;bob\r\n").unwrap(), "HELO;bob");
        assert_eq!(LineCodec.decode(b"HELO;bob").unwrap(), "HELO;bob");
    }

    #[test]
    fn test_decode_invalid_utf8_fails() {
        let result = LineCodec.decode(&[0xff, 0xfe, b'\n']);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_split_keeps_empty_fields() {
        assert_eq!(split("INFO;201;;"), vec!["INFO", "201", "", ""]);
        assert_eq!(split("STEP"), vec!["STEP"]);
    }
}
