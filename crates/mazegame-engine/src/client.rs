//! Per-connection state held by the pipeline.

use mazegame_protocol::{Message, PlayerId};
use mazegame_session::{ChatControl, ConnectionStatus, SessionError};
use mazegame_tick::DelayCompensator;
use mazegame_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::player::Player;

/// One connection as seen by the game.
///
/// The outbound sender feeds the connection's writer task. Dropping it is
/// how the pipeline closes a client's queue.
#[derive(Debug)]
pub(crate) struct Client {
    pub(crate) conn_id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
    pub(crate) status: ConnectionStatus,
    pub(crate) ready: bool,
    pub(crate) server_side: bool,
    pub(crate) was_logged_in: bool,
    pub(crate) compensator: DelayCompensator,
    pub(crate) chat: ChatControl,
    pub(crate) player: Option<Player>,
}

impl Client {
    pub(crate) fn new(
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<Message>,
        server_side: bool,
    ) -> Self {
        Self {
            conn_id,
            outbound,
            status: ConnectionStatus::Connected,
            ready: false,
            server_side,
            was_logged_in: false,
            compensator: DelayCompensator::new(),
            chat: ChatControl::new(),
            player: None,
        }
    }

    /// Queues a line for this client. A closed queue is ignored; the
    /// connection handler reports the disconnect on its own.
    pub(crate) fn send(&self, message: Message) {
        let _ = self.outbound.send(message);
    }

    pub(crate) fn send_all(&self, messages: &[Message]) {
        for message in messages {
            self.send(message.clone());
        }
    }

    pub(crate) fn is_queue_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    pub(crate) fn transition(&mut self, next: ConnectionStatus) -> Result<(), SessionError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    pub(crate) fn nick(&self) -> &str {
        self.player.as_ref().map_or("", |p| p.nick.as_str())
    }

    pub(crate) fn player_id(&self) -> Option<PlayerId> {
        self.player.as_ref().map(|p| p.id)
    }

    /// A nick with the spectator prefix watches instead of playing.
    pub(crate) fn starts_as_spectator(&self, config: &EngineConfig) -> bool {
        config.game.allow_spectator && config.special.is_spectator(self.nick())
    }

    /// The trapeater and frenzy bots, when they run on the server.
    pub(crate) fn is_special_bot(&self, config: &EngineConfig) -> bool {
        self.server_side
            && (config.special.is_trapeater(self.nick()) || config.special.is_frenzy(self.nick()))
    }

    /// Special bots are timed by their penalty alone.
    pub(crate) fn compensates_delay(&self, config: &EngineConfig) -> bool {
        config.game.delay_compensation && !self.is_special_bot(config)
    }

    /// Milliseconds added to the tick before this client's next `RDY.`.
    pub(crate) fn turn_time_offset(&self, config: &EngineConfig, delay_ms: u64) -> i64 {
        if self.compensates_delay(config) {
            self.compensator.turn_time_offset(delay_ms)
        } else {
            self.compensator.penalty()
        }
    }
}
