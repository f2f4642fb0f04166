//! Chat spam control.
//!
//! Every connection gets a small bucket of chat tokens. Sending a chat line
//! costs a token and also blocks the sender's next move: the move command
//! is consumed, the player stays where they are. Tokens trickle back in as
//! the player keeps moving.

use std::time::Duration;

use mazegame_protocol::{Message, messages};
use tokio::time::Instant;
use tracing::trace;

const INITIAL_CHAT_TOKENS: u32 = 5;
const MAX_CHAT_TOKENS: u32 = 20;
const NEW_TOKEN_PERIOD: Duration = Duration::from_millis(2500);

/// Per-connection token bucket for chat and whisper lines.
#[derive(Debug)]
pub struct ChatControl {
    tokens: u32,
    /// Chats sent but not yet paid for with a move.
    sent_messages: u32,
    last_token_update: Instant,
}

impl Default for ChatControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatControl {
    pub fn new() -> Self {
        Self {
            tokens: INITIAL_CHAT_TOKENS,
            sent_messages: 0,
            last_token_update: Instant::now(),
        }
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// Called for every accepted move. May grant a token.
    ///
    /// Returns `false` while unpaid chats are pending; the move is then
    /// used up without moving.
    pub fn on_move(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_token_update) > NEW_TOKEN_PERIOD
            && self.tokens < MAX_CHAT_TOKENS
        {
            self.tokens += 1;
            self.last_token_update = now;
            trace!(tokens = self.tokens, "chat token granted");
        }
        if self.sent_messages > 0 {
            self.sent_messages -= 1;
            return false;
        }
        true
    }

    /// Tries to spend a token. Resets the refill clock either way, so
    /// spamming while empty delays the next token.
    pub fn on_send_message(&mut self) -> bool {
        let allowed = self.tokens > 0;
        if allowed {
            self.tokens -= 1;
            self.sent_messages += 1;
        }
        self.last_token_update = Instant::now();
        allowed
    }

    /// Takes every token away.
    pub fn on_penalty(&mut self) {
        trace!(lost = self.tokens, "chat tokens revoked");
        self.tokens = 0;
        self.last_token_update = Instant::now();
    }

    /// Told to a sender whose bucket is empty.
    pub fn failure_message() -> Message {
        messages::server_info(&format!(
            "Your chat tokens have all been consumed. You have to wait for {} milliseconds to get a new one.",
            NEW_TOKEN_PERIOD.as_millis()
        ))
    }

    /// Told to a sender whose line exceeded the chat limit.
    pub fn too_long_message() -> Message {
        messages::server_info(&format!(
            "Your message was longer than {} characters. That cost you all your chat tokens.",
            mazegame_protocol::text::MAX_CHAT_LENGTH
        ))
    }

    /// Sent once when a player enters the maze.
    pub fn first_chat_hint() -> Message {
        messages::server_info(
            "Be aware: every chat and whisper message costs you a move. Use that power wisely!",
        )
    }
}
