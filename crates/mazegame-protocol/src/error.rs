//! Error types for the protocol layer.
//!
//! The wire format is plain text, so almost everything that can go wrong
//! here is either a line that is not valid UTF-8, or a line that is valid
//! text but breaks a protocol rule (an unknown verb on the client side, a
//! maze row arriving at the wrong time, ...).

/// Errors that can occur while encoding, decoding or interpreting lines.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The received bytes were not valid UTF-8.
    ///
    /// Servers never produce such lines, so seeing this on the client side
    /// means the stream is corrupt.
    #[error("decode failed: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// The line decoded fine but violates a protocol rule.
    ///
    /// The string describes the rule, e.g. "unexpected maze row".
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A maze transfer (`MAZE` header followed by rows) was malformed.
    #[error("maze transfer failed: {0}")]
    MazeTransfer(String),
}
