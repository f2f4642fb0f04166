//! The protocol client every server-side bot runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mazegame_protocol::{Codec, LineCodec, MazeReceiver, Message, Received, ServerMessage};
use mazegame_transport::DuplexConnection;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, trace};

use super::strategy::Strategy;
use super::view::BotView;
use crate::MazeGameError;

/// One bot: a nick, a strategy and the client end of its connection.
pub(crate) struct BotRunner {
    nick: String,
    strategy: Box<dyn Strategy>,
    special_mode: Arc<AtomicBool>,
    view: BotView,
    receiver: MazeReceiver,
    rng: StdRng,
}

impl BotRunner {
    pub(crate) fn new(
        nick: String,
        strategy: Box<dyn Strategy>,
        special_mode: Arc<AtomicBool>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            nick,
            strategy,
            special_mode,
            view: BotView::default(),
            receiver: MazeReceiver::new(),
            rng,
        }
    }

    /// Plays until the server says goodbye or the connection drops.
    pub(crate) async fn run(mut self, conn: DuplexConnection) {
        info!(nick = %self.nick, "bot started");
        match self.play(&conn).await {
            Ok(()) => info!(nick = %self.nick, "bot stopped"),
            Err(e) => debug!(nick = %self.nick, error = %e, "bot stopped with error"),
        }
        self.special_mode.store(false, Ordering::Relaxed);
    }

    async fn play(&mut self, conn: &DuplexConnection) -> Result<(), MazeGameError> {
        while let Some(bytes) = conn.recv_line().await? {
            let line = LineCodec.decode(&bytes)?;
            trace!(nick = %self.nick, line = %line, "bot received");
            let decoded = match ServerMessage::decode(&line) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!(nick = %self.nick, error = %e, "bot ignoring line");
                    continue;
                }
            };
            let Some(received) = self.receiver.accept(decoded)? else {
                continue;
            };
            let message = match received {
                Received::Maze(data) => {
                    self.view.set_maze(&data);
                    continue;
                }
                Received::Message(message) => message,
            };
            self.view.apply(&message);
            match message {
                ServerMessage::ServerVersion(_) => {
                    send(conn, &format!("HELO;{}", self.nick)).await?;
                }
                ServerMessage::Welcome(_) => send(conn, "MAZ?").await?,
                ServerMessage::Ready => {
                    let next = self.strategy.next_move(&self.view, &mut self.rng);
                    send(conn, &next.line()).await?;
                    let special = self.strategy.special_mode(&self.view);
                    self.special_mode.store(special, Ordering::Relaxed);
                }
                ServerMessage::Quit | ServerMessage::Term => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }
}

async fn send(conn: &DuplexConnection, line: &str) -> Result<(), MazeGameError> {
    conn.send_bytes(&LineCodec.encode(&Message::new(line))).await?;
    conn.flush_bytes().await?;
    Ok(())
}
