//! The outbound unit of the protocol: one line plus a flush hint.

/// A single line queued for a client.
///
/// `last` marks the end of a logical update. The write actor buffers lines
/// until it sees a message with `last == true` and only then flushes the
/// socket, so that a burst like "bait vanished, score changed, player moved"
/// reaches the client in one piece.
///
/// An empty text with `last == true` writes nothing and only flushes; the
/// engine appends one after every batch it broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub last: bool,
}

impl Message {
    /// A line that ends its batch.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            last: true,
        }
    }

    /// Marks this message as "more lines follow", so the writer does not
    /// flush after it.
    pub fn there_is_more(mut self) -> Self {
        self.last = false;
        self
    }

    /// The flush-only message.
    pub fn empty_last() -> Self {
        Self::new(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
