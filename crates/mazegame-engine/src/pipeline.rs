//! The command execution pipeline.
//!
//! All game state lives in one task. Connections, timers, the contest
//! controller and operators talk to it through an unbounded queue of
//! [`Command`]s, and the task executes them strictly one after another.
//! That single consumer is what keeps bait collection, collisions and
//! teleports free of races: two players stepping onto the same bait in the
//! same tick are simply two commands in a row.

use std::sync::Arc;
use std::time::Duration;

use mazegame_maze::Maze;
use mazegame_protocol::{BaitType, GameSpeed, Message, PlayerId};
use mazegame_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::admin::PutBait;
use crate::bots::BotSpawner;
use crate::config::EngineConfig;
use crate::contest::{ContestConfig, ContestEventKind};
use crate::info::{PlayerInfo, ServerInfo};
use crate::world::{OccupationResult, World};
use crate::GameError;

/// Optional reply channel. Commands queued by the engine itself carry none.
pub(crate) type Reply<T> = Option<oneshot::Sender<T>>;

pub(crate) fn reply<T>(reply: Reply<T>, value: T) {
    if let Some(tx) = reply {
        let _ = tx.send(value);
    }
}

/// Everything the pipeline can be asked to do.
pub(crate) enum Command {
    Connect {
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<Message>,
        server_side: bool,
        reply: oneshot::Sender<bool>,
    },
    Line {
        conn_id: ConnectionId,
        line: String,
        received_at: Instant,
    },
    Disconnect {
        conn_id: ConnectionId,
        reply: Reply<()>,
    },
    Ready(ConnectionId),
    LoginTimeout(ConnectionId),

    ClearScores {
        reply: Reply<()>,
    },
    Go {
        reply: Reply<()>,
    },
    Stop {
        now: bool,
        reply: Reply<()>,
    },
    Kill {
        player: PlayerId,
        reply: Reply<bool>,
    },
    PutBait {
        request: PutBait,
        reply: Reply<OccupationResult>,
    },
    Teleport {
        player: PlayerId,
        x: i32,
        y: i32,
        reply: Reply<Option<OccupationResult>>,
    },
    BaitRush {
        cause: Option<PlayerId>,
        reply: Reply<()>,
    },
    TransformBaits {
        bait_type: BaitType,
        cause: Option<PlayerId>,
        reply: Reply<()>,
    },
    ChangeSpeed {
        speed: GameSpeed,
        reply: Reply<()>,
    },
    SpawnBot {
        name: String,
        reply: Reply<bool>,
    },
    ServerInfo {
        reply: oneshot::Sender<ServerInfo>,
    },
    PlayerInfos {
        reply: oneshot::Sender<Vec<PlayerInfo>>,
    },

    StartContest {
        config: ContestConfig,
        reply: Reply<bool>,
    },
    StopContest {
        reply: Reply<bool>,
    },
    ContestReport {
        reply: Reply<bool>,
    },
    ContestEvent {
        serial: u64,
        kind: ContestEventKind,
    },

    Shutdown {
        reply: Reply<()>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Line { .. } => "line",
            Self::Disconnect { .. } => "disconnect",
            Self::Ready(_) => "ready",
            Self::LoginTimeout(_) => "login_timeout",
            Self::ClearScores { .. } => "clear_scores",
            Self::Go { .. } => "go",
            Self::Stop { .. } => "stop",
            Self::Kill { .. } => "kill",
            Self::PutBait { .. } => "put_bait",
            Self::Teleport { .. } => "teleport",
            Self::BaitRush { .. } => "bait_rush",
            Self::TransformBaits { .. } => "transform_baits",
            Self::ChangeSpeed { .. } => "change_speed",
            Self::SpawnBot { .. } => "spawn_bot",
            Self::ServerInfo { .. } => "server_info",
            Self::PlayerInfos { .. } => "player_infos",
            Self::StartContest { .. } => "start_contest",
            Self::StopContest { .. } => "stop_contest",
            Self::ContestReport { .. } => "contest_report",
            Self::ContestEvent { .. } => "contest_event",
            Self::Shutdown { .. } => "shutdown",
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Queues commands from inside the pipeline, now or after a delay.
///
/// Holds only a weak sender so that pending timers never keep a stopped
/// pipeline's queue alive.
#[derive(Clone)]
pub(crate) struct Scheduler {
    sender: mpsc::WeakUnboundedSender<Command>,
}

impl Scheduler {
    fn new(sender: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self { sender }
    }

    pub(crate) fn enqueue(&self, command: Command) {
        if let Some(sender) = self.sender.upgrade() {
            let _ = sender.send(command);
        }
    }

    pub(crate) fn after(&self, delay: Duration, command: Command) -> AbortHandle {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(command);
            }
        })
        .abort_handle()
    }

    /// A handle for bots started from inside the pipeline.
    pub(crate) fn handle(&self) -> Option<GameHandle> {
        self.sender.upgrade().map(|sender| GameHandle { sender })
    }
}

// ---------------------------------------------------------------------------
// GameHandle
// ---------------------------------------------------------------------------

/// Handle to a running game pipeline.
///
/// Cheap to clone. Every method queues one command; the `async` ones wait
/// for its result.
#[derive(Clone)]
pub struct GameHandle {
    sender: mpsc::UnboundedSender<Command>,
}

impl GameHandle {
    fn send(&self, command: Command) -> Result<(), GameError> {
        self.sender.send(command).map_err(|_| GameError::Unavailable)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx))?;
        rx.await.map_err(|_| GameError::Unavailable)
    }

    /// `true` once the pipeline has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the pipeline has stopped.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }

    // -- Connections ---------------------------------------------------------

    /// Registers a new connection. Lines for it go to `outbound`.
    ///
    /// Returns `false` when the server is full; `outbound` has then
    /// received `INFO;451` and been dropped.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<Message>,
        server_side: bool,
    ) -> Result<bool, GameError> {
        self.request(|reply| Command::Connect {
            conn_id,
            outbound,
            server_side,
            reply,
        })
        .await
    }

    /// Queues one line received from a connection, stamped with the time of
    /// the call.
    pub fn submit_line(&self, conn_id: ConnectionId, line: String) -> Result<(), GameError> {
        self.send(Command::Line {
            conn_id,
            line,
            received_at: Instant::now(),
        })
    }

    /// Tears a connection down. Returns once it is gone from the game.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), GameError> {
        self.request(|reply| Command::Disconnect {
            conn_id,
            reply: Some(reply),
        })
        .await
    }

    // -- Administration ------------------------------------------------------

    pub async fn clear_scores(&self) -> Result<(), GameError> {
        self.request(|reply| Command::ClearScores { reply: Some(reply) })
            .await
    }

    /// Brings the bait count back to its base value.
    pub async fn go(&self) -> Result<(), GameError> {
        self.request(|reply| Command::Go { reply: Some(reply) }).await
    }

    /// Stops generating baits. With `now` every bait is withdrawn, otherwise
    /// only the traps.
    pub async fn stop(&self, now: bool) -> Result<(), GameError> {
        self.request(|reply| Command::Stop {
            now,
            reply: Some(reply),
        })
        .await
    }

    /// Disconnects a player. Returns `false` for an unknown id.
    pub async fn kill(&self, player: PlayerId) -> Result<bool, GameError> {
        self.request(|reply| Command::Kill {
            player,
            reply: Some(reply),
        })
        .await
    }

    pub async fn put_bait(&self, request: PutBait) -> Result<OccupationResult, GameError> {
        self.request(|reply| Command::PutBait {
            request,
            reply: Some(reply),
        })
        .await
    }

    pub async fn teleport(
        &self,
        player: PlayerId,
        x: i32,
        y: i32,
    ) -> Result<OccupationResult, GameError> {
        self.request(|reply| Command::Teleport {
            player,
            x,
            y,
            reply: Some(reply),
        })
        .await?
        .ok_or(GameError::UnknownPlayer(player))
    }

    pub async fn bait_rush(&self) -> Result<(), GameError> {
        self.request(|reply| Command::BaitRush {
            cause: None,
            reply: Some(reply),
        })
        .await
    }

    pub async fn transform_baits(&self, bait_type: BaitType) -> Result<(), GameError> {
        self.request(|reply| Command::TransformBaits {
            bait_type,
            cause: None,
            reply: Some(reply),
        })
        .await
    }

    pub async fn change_speed(&self, speed: GameSpeed) -> Result<(), GameError> {
        self.request(|reply| Command::ChangeSpeed {
            speed,
            reply: Some(reply),
        })
        .await
    }

    /// Launches a server-side bot. Returns whether one was started.
    pub async fn spawn_bot(&self, name: impl Into<String>) -> Result<bool, GameError> {
        let name = name.into();
        self.request(|reply| Command::SpawnBot {
            name,
            reply: Some(reply),
        })
        .await
    }

    pub async fn server_info(&self) -> Result<ServerInfo, GameError> {
        self.request(|reply| Command::ServerInfo { reply }).await
    }

    pub async fn player_infos(&self) -> Result<Vec<PlayerInfo>, GameError> {
        self.request(|reply| Command::PlayerInfos { reply }).await
    }

    // -- Contest -------------------------------------------------------------

    /// Schedules a contest. Returns `false` while another one is running.
    pub async fn start_contest(&self, config: ContestConfig) -> Result<bool, GameError> {
        self.request(|reply| Command::StartContest {
            config,
            reply: Some(reply),
        })
        .await
    }

    pub async fn stop_contest(&self) -> Result<bool, GameError> {
        self.request(|reply| Command::StopContest { reply: Some(reply) })
            .await
    }

    pub async fn contest_report(&self) -> Result<bool, GameError> {
        self.request(|reply| Command::ContestReport { reply: Some(reply) })
            .await
    }

    /// Disconnects everybody and stops the pipeline.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.request(|reply| Command::Shutdown { reply: Some(reply) })
            .await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Shutdown,
}

struct GameActor {
    world: World,
    receiver: mpsc::UnboundedReceiver<Command>,
}

impl GameActor {
    async fn run(mut self) {
        info!("game pipeline started");

        while let Some(command) = self.receiver.recv().await {
            let name = command.name();
            match self.execute(command) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => break,
                Err(e) => warn!(command = name, error = %e, "command failed"),
            }
        }

        info!("game pipeline stopped");
    }

    fn execute(&mut self, command: Command) -> Result<Flow, GameError> {
        let world = &mut self.world;
        match command {
            Command::Connect {
                conn_id,
                outbound,
                server_side,
                reply,
            } => {
                let accepted = world.connect(conn_id, outbound, server_side);
                let _ = reply.send(accepted);
            }
            Command::Line {
                conn_id,
                line,
                received_at,
            } => world.handle_line(conn_id, &line, received_at)?,
            Command::Disconnect { conn_id, reply: tx } => {
                let result = world.teardown(conn_id);
                reply(tx, ());
                result?;
            }
            Command::Ready(conn_id) => world.ready(conn_id),
            Command::LoginTimeout(conn_id) => world.login_timeout(conn_id)?,

            Command::ClearScores { reply: tx } => {
                world.clear_scores();
                reply(tx, ());
            }
            Command::Go { reply: tx } => {
                world.go();
                reply(tx, ());
            }
            Command::Stop { now, reply: tx } => {
                world.stop(now);
                reply(tx, ());
            }
            Command::Kill { player, reply: tx } => {
                let result = world.kill(player);
                reply(tx, result.as_ref().is_ok_and(|killed| *killed));
                result?;
            }
            Command::PutBait { request, reply: tx } => reply(tx, world.put_bait(request)),
            Command::Teleport {
                player,
                x,
                y,
                reply: tx,
            } => reply(tx, world.teleport(player, x, y)),
            Command::BaitRush { cause, reply: tx } => {
                world.bait_rush(cause);
                reply(tx, ());
            }
            Command::TransformBaits {
                bait_type,
                cause,
                reply: tx,
            } => {
                world.transform_baits(bait_type, cause);
                reply(tx, ());
            }
            Command::ChangeSpeed { speed, reply: tx } => {
                world.change_speed(speed);
                reply(tx, ());
            }
            Command::SpawnBot { name, reply: tx } => reply(tx, world.spawn_bot(&name)),
            Command::ServerInfo { reply: tx } => {
                let _ = tx.send(world.server_info());
            }
            Command::PlayerInfos { reply: tx } => {
                let _ = tx.send(world.player_infos());
            }

            Command::StartContest { config, reply: tx } => reply(tx, world.start_contest(config)),
            Command::StopContest { reply: tx } => reply(tx, world.stop_contest()),
            Command::ContestReport { reply: tx } => reply(tx, world.contest_report()),
            Command::ContestEvent { serial, kind } => world.contest_event(serial, kind),

            Command::Shutdown { reply: tx } => {
                world.shutdown();
                reply(tx, ());
                return Ok(Flow::Shutdown);
            }
        }
        Ok(Flow::Continue)
    }
}

/// Starts the game pipeline for `maze` and returns its handle.
///
/// When the initial configuration asks for baits, the first fill is queued
/// right away.
pub fn spawn_game(maze: Maze, config: EngineConfig, bots: Arc<dyn BotSpawner>) -> GameHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let world = World::new(maze, config, bots, Scheduler::new(tx.downgrade()));
    if world.desired_bait_count > 0 {
        debug!(desired = world.desired_bait_count, "queueing initial bait fill");
        let _ = tx.send(Command::Go { reply: None });
    }
    tokio::spawn(GameActor { world, receiver: rx }.run());
    GameHandle { sender: tx }
}
