//! Client commands: login, maze query, movement, chat and logout, plus the
//! ready cycle and teardown.

use std::time::Duration;

use mazegame_protocol::text::{MAX_CHAT_LENGTH, sanitize_chat};
use mazegame_protocol::{
    BaitType, ChatRequest, ClientCommand, InfoCode, Message, Parsed, PlayerId, TurnDirection,
    ViewDirection, messages,
};
use mazegame_session::{ChatControl, ConnectionStatus};
use mazegame_tick::StopOutcome;
use mazegame_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::GameError;
use crate::client::Client;
use crate::events::GameEvent;
use crate::pipeline::Command;
use crate::player::Player;
use crate::world::World;

impl World {
    // -- Connection lifecycle ------------------------------------------------

    pub(crate) fn connect(
        &mut self,
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<Message>,
        server_side: bool,
    ) -> bool {
        let client = Client::new(conn_id, outbound, server_side);
        let special_bots = usize::from(self.frenzy.is_active()) + usize::from(self.trapeater.is_active());
        let connected = self.logged_in_count().saturating_sub(special_bots);
        if connected >= self.config.max_clients {
            warn!(%conn_id, max_clients = self.config.max_clients, "server full, rejecting connection");
            client.send(messages::error_info(InfoCode::TooManyClients));
            return false;
        }
        client.send(messages::server_version());
        self.clients.insert(conn_id, client);
        self.scheduler
            .after(self.config.login_timeout, Command::LoginTimeout(conn_id));
        debug!(%conn_id, server_side, "client connected");
        true
    }

    pub(crate) fn login_timeout(&mut self, conn_id: ConnectionId) -> Result<(), GameError> {
        let Some(client) = self.clients.get(&conn_id) else {
            return Ok(());
        };
        if client.was_logged_in {
            return Ok(());
        }
        info!(%conn_id, "login timed out");
        client.send(messages::error_info(InfoCode::LoginTimeout));
        self.teardown(conn_id)
    }

    /// Removes a connection from the game. Unknown connections are ignored,
    /// so calling this twice is harmless.
    pub(crate) fn teardown(&mut self, conn_id: ConnectionId) -> Result<(), GameError> {
        let Some(mut client) = self.clients.remove(&conn_id) else {
            return Ok(());
        };
        if client.status.is_playing() {
            self.active_players = self.active_players.saturating_sub(1);
        }
        let spectating = client.status.is_spectating();
        client.transition(ConnectionStatus::Dying)?;

        if let Some(player) = client.player.as_ref() {
            if !spectating && self.maze.in_bounds(player.x, player.y) {
                self.maze.release(player.x, player.y);
                let farewell = if self.announces_presence(&client) {
                    messages::server_info(&format!("{} left the game.", player.nick))
                } else {
                    Message::empty_last()
                };
                self.broadcast(&[
                    player.vanish_message().there_is_more(),
                    messages::leave(player.id).there_is_more(),
                    farewell,
                ]);
            }
        }

        if client.server_side && client.was_logged_in {
            let nick = client.nick().to_string();
            if self.config.special.is_trapeater(&nick) {
                self.trapeater_left();
            } else if self.config.special.is_frenzy(&nick) {
                self.frenzy.forget();
            }
        }

        if !client.is_queue_closed() {
            client.send(messages::quit());
        }
        if client.was_logged_in {
            info!(%conn_id, nick = %client.nick(), "client logged out");
        }
        client.transition(ConnectionStatus::Dead)?;
        Ok(())
    }

    // -- Dispatch ------------------------------------------------------------

    pub(crate) fn handle_line(
        &mut self,
        conn_id: ConnectionId,
        line: &str,
        received_at: Instant,
    ) -> Result<(), GameError> {
        if !self.clients.contains_key(&conn_id) {
            debug!(%conn_id, "line for unknown connection, ignoring");
            return Ok(());
        }
        let command = ClientCommand::decode(line);
        trace!(%conn_id, verb = command.verb(), "client command");
        match command {
            ClientCommand::Hello(nick) => self.hello(conn_id, nick)?,
            ClientCommand::MazeQuery(parsed) => {
                if self.admit(conn_id, parsed).is_some() {
                    self.maze_query(conn_id)?;
                }
            }
            ClientCommand::Step(parsed) => {
                if self.admit(conn_id, parsed).is_some() && self.check_ready(conn_id) {
                    self.step(conn_id, received_at);
                }
            }
            ClientCommand::Turn(parsed) => {
                if let Some(direction) = self.admit(conn_id, parsed) {
                    if self.check_ready(conn_id) {
                        self.turn(conn_id, direction, received_at);
                    }
                }
            }
            ClientCommand::Chat(parsed) => {
                if let Some(request) = self.admit(conn_id, parsed) {
                    self.chat(conn_id, request);
                }
            }
            ClientCommand::Bye(parsed) => {
                if self.admit(conn_id, parsed).is_some() {
                    self.teardown(conn_id)?;
                }
            }
            ClientCommand::Unknown => {
                self.send_to(conn_id, messages::error_info(InfoCode::UnknownCommand));
            }
        }
        Ok(())
    }

    /// Login check first, then the syntactic verdict. The first failure is
    /// reported to the client.
    fn admit<T>(&self, conn_id: ConnectionId, parsed: Parsed<T>) -> Option<T> {
        let client = self.clients.get(&conn_id)?;
        let verdict = if client.status.is_logged_in() {
            parsed
        } else {
            Err(InfoCode::CommandBeforeLogin)
        };
        verdict.map_err(|code| client.send(messages::error_info(code))).ok()
    }

    fn check_ready(&self, conn_id: ConnectionId) -> bool {
        let Some(client) = self.clients.get(&conn_id) else {
            return false;
        };
        if !client.ready {
            client.send(messages::error_info(InfoCode::ActionWithoutReady));
        }
        client.ready
    }

    // -- Login ---------------------------------------------------------------

    fn hello(&mut self, conn_id: ConnectionId, parsed: Parsed<String>) -> Result<(), GameError> {
        let Some(client) = self.clients.get(&conn_id) else {
            return Ok(());
        };
        let verdict = if client.status.is_logged_in() {
            Err(InfoCode::AlreadyLoggedIn)
        } else {
            parsed.and_then(|nick| {
                if !self.nick_taken(&nick) {
                    Ok(nick)
                } else if nick == self.config.special.trapeater || nick == self.config.special.frenzy {
                    Err(InfoCode::WrongParameterValue)
                } else {
                    Err(InfoCode::DuplicateNick)
                }
            })
        };
        match verdict {
            Ok(nick) => self.register(conn_id, nick),
            Err(code) => {
                client.send(messages::error_info(code));
                Ok(())
            }
        }
    }

    fn register(&mut self, conn_id: ConnectionId, nick: String) -> Result<(), GameError> {
        self.last_player_id += 1;
        let id = PlayerId(self.last_player_id);
        let direction = ViewDirection::random(&mut self.rng);
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return Ok(());
        };
        client.transition(ConnectionStatus::LoggedIn)?;
        client.was_logged_in = true;
        client.player = Some(Player::new(id, nick, direction));
        client.send(messages::welcome(id));
        info!(%conn_id, player_id = %id, nick = %client.nick(), "client logged in");

        if client.starts_as_spectator(&self.config) {
            return Ok(());
        }

        let Some(position) = self.positions.random_free(&self.maze, &mut self.rng) else {
            warn!(%conn_id, "no free cell left for a new player");
            self.send_to(conn_id, messages::error_info(InfoCode::TooManyClients));
            return self.teardown(conn_id);
        };
        self.maze.occupy(position.x, position.y);
        let announce = self
            .clients
            .get(&conn_id)
            .is_some_and(|c| self.announces_presence(c));
        let Some(player) = self.player_mut(conn_id) else {
            return Ok(());
        };
        player.set_coords(position.coords());

        let mut batch = Vec::with_capacity(4);
        if announce {
            batch.push(messages::server_info(&format!("{} joined the game.", player.nick)).there_is_more());
        }
        batch.push(player.join_message().there_is_more());
        batch.push(player.appear_message().there_is_more());
        batch.push(player.score_message());
        self.broadcast(&batch);
        Ok(())
    }

    // -- Maze query ----------------------------------------------------------

    fn maze_query(&mut self, conn_id: ConnectionId) -> Result<(), GameError> {
        let Some(client) = self.clients.get(&conn_id) else {
            return Ok(());
        };

        client.send(messages::maze_header(self.maze.width(), self.maze.height()).there_is_more());
        for row in self.maze.to_lines() {
            client.send(Message::new(row).there_is_more());
        }
        client.send(Message::empty_last());

        for other in self.clients.values() {
            let visible = other.conn_id == conn_id || other.status.is_playing();
            if !visible || other.starts_as_spectator(&self.config) {
                continue;
            }
            if let Some(player) = other.player.as_ref() {
                client.send(player.join_message().there_is_more());
                client.send(player.appear_message().there_is_more());
                client.send(player.score_message().there_is_more());
            }
        }
        client.send(Message::empty_last());

        for bait in self.baits.values().filter(|b| b.is_visible()) {
            client.send(bait.appear_message().there_is_more());
        }
        client.send(Message::empty_last());

        client.send(messages::speed_change(self.speed).there_is_more());

        if client.starts_as_spectator(&self.config) {
            self.spectate(conn_id)
        } else {
            self.play(conn_id)
        }
    }

    fn spectate(&mut self, conn_id: ConnectionId) -> Result<(), GameError> {
        let active = self.active_players;
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return Ok(());
        };
        match client.status {
            ConnectionStatus::Playing => {
                client.transition(ConnectionStatus::Spectating)?;
                self.active_players = self.active_players.saturating_sub(1);
            }
            ConnectionStatus::LoggedIn => client.transition(ConnectionStatus::Spectating)?,
            _ => {}
        }
        let count = match active {
            0 => String::from("There is nobody to spectate!"),
            1 => String::from("There is one player playing."),
            n => format!("There are {n} players playing."),
        };
        client.send(messages::server_info("Welcome to this amazing maze!").there_is_more());
        client.send(messages::server_info("You are spectating.").there_is_more());
        client.send(messages::server_info(&count));
        Ok(())
    }

    fn play(&mut self, conn_id: ConnectionId) -> Result<(), GameError> {
        let others = self.active_players;
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return Ok(());
        };
        if matches!(client.status, ConnectionStatus::LoggedIn | ConnectionStatus::Spectating) {
            client.transition(ConnectionStatus::Playing)?;
            if let Some(player) = client.player.as_mut() {
                player.reset_score();
            }
            self.active_players += 1;
        }
        self.ready(conn_id);

        let company = match others {
            0 => String::from("You are alone ... for now!"),
            1 => String::from("One other player is already having fun."),
            n => format!("{n} players are already having fun."),
        };
        let welcome = [
            messages::server_info("Welcome to this amazing maze!").there_is_more(),
            messages::server_info(&format!(
                "The dimensions are {} x {}.",
                self.maze.width(),
                self.maze.height()
            ))
            .there_is_more(),
            messages::server_info(&format!(
                "The number of walkable fields is {}.",
                self.positions.walkable_count()
            ))
            .there_is_more(),
            messages::server_info(&company).there_is_more(),
            ChatControl::first_chat_hint(),
        ];
        if let Some(client) = self.clients.get(&conn_id) {
            client.send_all(&welcome);
        }
        Ok(())
    }

    // -- Ready cycle ---------------------------------------------------------

    /// Opens the next move for a playing client.
    pub(crate) fn ready(&mut self, conn_id: ConnectionId) {
        let compensate = self
            .clients
            .get(&conn_id)
            .is_some_and(|c| c.compensates_delay(&self.config));
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return;
        };
        client.ready = true;
        if !client.status.is_playing() {
            return;
        }
        if compensate {
            client.compensator.start_timer(Instant::now());
        }
        client.send(messages::ready());
    }

    /// Consumes the move and schedules the next `RDY.`. Returns `false` when
    /// a pending chat swallows the move.
    fn unready(&mut self, conn_id: ConnectionId, received_at: Instant) -> bool {
        let delay = self.speed.delay_ms();
        let compensate = self
            .clients
            .get(&conn_id)
            .is_some_and(|c| c.compensates_delay(&self.config));
        let quiet = self
            .clients
            .get(&conn_id)
            .is_some_and(|c| self.config.special.is_dummy(c.nick()));
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return false;
        };
        client.ready = false;
        if compensate {
            if let StopOutcome::Reset {
                notify,
                average_command_delta,
            } = client.compensator.stop_timer(received_at, delay)
            {
                if !quiet {
                    warn!(
                        %conn_id,
                        nick = %client.nick(),
                        average_command_delta,
                        "commands arrive faster than the tick, delay compensation reset"
                    );
                }
                if notify {
                    client.send(messages::server_info(
                        "Your last command was received too quickly. Your delay compensation has been reset.",
                    ));
                }
            }
        }
        let allowed = client.chat.on_move();

        if self.frenzy.is_active() {
            self.apply_frenzy_penalty();
        }

        let offset = self
            .clients
            .get(&conn_id)
            .map_or(0, |c| c.turn_time_offset(&self.config, delay));
        let wait = (delay as i64 + offset).max(0) as u64;
        self.scheduler
            .after(Duration::from_millis(wait), Command::Ready(conn_id));
        allowed
    }

    // -- Movement ------------------------------------------------------------

    fn step(&mut self, conn_id: ConnectionId, received_at: Instant) {
        if !self.unready(conn_id, received_at) {
            return;
        }
        let Some(player) = self.player(conn_id) else {
            return;
        };
        let (id, x, y, direction) = (player.id, player.x, player.y, player.direction);
        if !self.maze.is_walkable(x, y, direction) {
            self.send_to(conn_id, messages::error_info(InfoCode::WallCrash));
            return;
        }
        let (dx, dy) = direction.delta();
        let target = (x + dx, y + dy);

        let mut batch = Vec::new();
        let mut event = None;
        if !self.maze.is_occupied(target.0, target.1) {
            batch.push(self.move_player(conn_id, target));
        } else if let Some(bait) = self.remove_bait_at(target) {
            event = Some(GameEvent::BaitCollected {
                player: id,
                bait_type: bait.bait_type,
                was_visible: bait.is_visible(),
            });
            if bait.is_visible() {
                batch.push(bait.vanish_message().there_is_more());
            }
            if let Some(player) = self.player_mut(conn_id) {
                player.score += bait.bait_type.score();
                batch.push(player.score_message().there_is_more());
                if !bait.is_visible() && bait.bait_type != BaitType::Trap {
                    let text = format!("{} found an invisible {}.", player.nick, bait.bait_type.name());
                    batch.push(messages::server_info(&text).there_is_more());
                }
            }
            if bait.bait_type == BaitType::Trap {
                batch.extend(self.teleport_randomly(conn_id, None));
            } else {
                batch.push(self.move_player(conn_id, target));
            }
            batch.extend(self.replace_baits());
        } else if let Some(other) = self.occupant_at(target) {
            let other_id = self.player(other).map(|p| p.id);
            if let Some(other_id) = other_id {
                event = Some(GameEvent::Collision {
                    causing: id,
                    other: other_id,
                    x: target.0,
                    y: target.1,
                });
            }
            batch.extend(self.teleport_randomly(conn_id, Some(id)));
            batch.extend(self.teleport_randomly(other, Some(id)));
        } else {
            warn!(x = target.0, y = target.1, "occupied cell without bait or player");
            batch.push(self.move_player(conn_id, target));
        }
        batch.push(Message::empty_last());
        self.broadcast(&batch);

        if let Some(event) = event {
            if self.config.game.events.enabled {
                self.handle_event(event);
            }
        }
    }

    /// Moves onto a free cell and returns the `PPOS mov` line.
    fn move_player(&mut self, conn_id: ConnectionId, target: (i32, i32)) -> Message {
        let Some(player) = self.player_mut(conn_id) else {
            return Message::empty_last();
        };
        let from = player.coords();
        player.set_coords(target);
        player.move_counter += 1;
        let message = player.step_message().there_is_more();
        self.maze.move_occupant(from, target);
        message
    }

    /// Trap teleports (`causing == None`) and collision teleports. Returns
    /// `None` when the maze has no free cell left.
    pub(crate) fn teleport_randomly(
        &mut self,
        conn_id: ConnectionId,
        causing: Option<PlayerId>,
    ) -> Option<Message> {
        let destination = self.positions.for_teleport(&self.maze, &mut self.rng)?;
        let direction = ViewDirection::random(&mut self.rng);
        let player = self.player_mut(conn_id)?;
        let from = player.coords();
        player.set_coords(destination.coords());
        player.direction = direction;
        let message = match causing {
            None => player.trap_teleport_message(),
            Some(causing) => player.collision_teleport_message(causing),
        };
        self.maze.move_occupant(from, destination.coords());
        Some(message.there_is_more())
    }

    fn turn(&mut self, conn_id: ConnectionId, direction: Option<TurnDirection>, received_at: Instant) {
        if !self.unready(conn_id, received_at) {
            return;
        }
        let Some(direction) = direction else {
            self.send_to(conn_id, messages::error_info(InfoCode::WrongParameterValue));
            return;
        };
        let Some(player) = self.player_mut(conn_id) else {
            return;
        };
        player.direction = direction.apply(player.direction);
        player.move_counter += 1;
        let message = player.turn_message();
        self.broadcast(&[message]);
    }

    // -- Chat ----------------------------------------------------------------

    fn chat(&mut self, conn_id: ConnectionId, request: ChatRequest) {
        let target = request.target.and_then(|id| self.conn_of(id));
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return;
        };
        let Some(source) = client.player_id() else {
            return;
        };
        if request.text.chars().count() > MAX_CHAT_LENGTH {
            client.chat.on_penalty();
            client.send(ChatControl::too_long_message());
            return;
        }
        if !client.chat.on_send_message() {
            client.send(ChatControl::failure_message());
            return;
        }
        let text = sanitize_chat(&request.text);
        match (request.target, target) {
            (None, _) => self.broadcast(&[messages::client_info(&text, source)]),
            (Some(_), Some(target)) => self.send_to(target, messages::client_whisper(&text, source)),
            (Some(id), None) => debug!(%conn_id, target = %id, "whisper to unknown player dropped"),
        }
    }
}
