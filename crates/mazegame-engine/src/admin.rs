//! Operator commands. They run through the pipeline like client commands,
//! so they never race with a move.

use std::time::Duration;

use mazegame_protocol::{BaitType, GameSpeed, Message, PlayerId, messages};
use tracing::{info, warn};

use crate::GameError;
use crate::world::{OccupationResult, World};

/// A bait to be placed on a given cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PutBait {
    pub bait_type: BaitType,
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    /// How long a hidden bait stays hidden.
    pub reappear_offset: Duration,
    /// Broadcast along with the bait.
    pub message: Option<String>,
}

impl PutBait {
    pub fn visible(bait_type: BaitType, x: i32, y: i32) -> Self {
        Self {
            bait_type,
            x,
            y,
            visible: true,
            reappear_offset: Duration::ZERO,
            message: None,
        }
    }

    pub fn hidden(bait_type: BaitType, x: i32, y: i32, reappear_offset: Duration) -> Self {
        Self {
            visible: false,
            reappear_offset,
            ..Self::visible(bait_type, x, y)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl World {
    fn nick_or_someone(&self, player: Option<PlayerId>) -> String {
        player
            .and_then(|id| self.conn_of(id))
            .and_then(|conn| self.player(conn))
            .map_or_else(|| String::from("someone"), |p| p.nick.clone())
    }

    pub(crate) fn clear_scores(&mut self) {
        let batch = self.reset_scores();
        self.broadcast(&batch);
        info!("scores cleared");
    }

    pub(crate) fn go(&mut self) {
        self.desired_bait_count = self.base_bait_count;
        if self.baits.len() < self.desired_bait_count {
            let batch = self.fill_baits();
            self.broadcast(&batch);
        }
    }

    pub(crate) fn stop(&mut self, now: bool) {
        self.desired_bait_count = 0;
        let batch = if now {
            self.withdraw_baits(|_| true)
        } else {
            self.withdraw_baits(|b| b.bait_type == BaitType::Trap)
        };
        self.broadcast(&batch);
        self.despawn_trapeater();
        info!(now, "bait generation stopped");
    }

    pub(crate) fn kill(&mut self, id: PlayerId) -> Result<bool, GameError> {
        let Some(conn_id) = self.conn_of(id) else {
            return Ok(false);
        };
        let (nick, server_side) = match self.clients.get(&conn_id) {
            Some(client) => (client.nick().to_string(), client.server_side),
            None => return Ok(false),
        };
        if server_side && self.config.special.is_trapeater(&nick) {
            self.despawn_trapeater();
        } else if server_side && self.config.special.is_frenzy(&nick) {
            self.despawn_frenzy();
        }
        info!(player_id = %id, nick = %nick, "killing player");
        self.teardown(conn_id)?;
        Ok(true)
    }

    pub(crate) fn put_bait(&mut self, request: PutBait) -> OccupationResult {
        let result = self.check_free_cell(request.x, request.y);
        if result != OccupationResult::Success {
            return result;
        }
        let mut bait = self.new_bait(request.bait_type, (request.x, request.y));
        if !request.visible {
            bait.hide_for(request.reappear_offset);
        }
        let mut batch = Vec::new();
        if let Some(message) = self.add_bait(bait) {
            batch.push(message.there_is_more());
        }
        if let Some(text) = request.message.as_deref() {
            batch.push(messages::server_info(text).there_is_more());
        }
        if !batch.is_empty() {
            batch.push(Message::empty_last());
            self.broadcast(&batch);
        }
        result
    }

    /// `None` when no player with this id stands in the maze.
    pub(crate) fn teleport(&mut self, id: PlayerId, x: i32, y: i32) -> Option<OccupationResult> {
        let conn_id = self.conn_of(id)?;
        let from = self.player(conn_id)?.coords();
        if !self.maze.in_bounds(from.0, from.1) {
            return None;
        }
        let result = self.check_free_cell(x, y);
        if result != OccupationResult::Success {
            return Some(result);
        }
        let player = self.player_mut(conn_id)?;
        player.set_coords((x, y));
        let message = player.teleport_message();
        self.maze.move_occupant(from, (x, y));
        self.send_to(
            conn_id,
            messages::server_info("You have been teleported by a higher power!").there_is_more(),
        );
        self.broadcast(&[message]);
        Some(result)
    }

    /// Doubles the bait count for one refill. Does nothing while the count
    /// is not at its base value.
    pub(crate) fn bait_rush(&mut self, cause: Option<PlayerId>) {
        if self.desired_bait_count != self.base_bait_count {
            return;
        }
        self.desired_bait_count *= 2;
        let mut batch = self.replace_baits();
        let text = format!(
            "Nice one! It seems {} stepped on an invisible pressure plate and caused more baits to spawn ... at least temporarily.",
            self.nick_or_someone(cause)
        );
        batch.push(messages::server_info(&text));
        self.broadcast(&batch);
        self.desired_bait_count = self.base_bait_count;
        info!(baits = self.baits.len(), "bait rush");
    }

    pub(crate) fn transform_baits(&mut self, bait_type: BaitType, cause: Option<PlayerId>) {
        if bait_type == BaitType::Trap && !self.trapeater.enabled {
            warn!("transforming into traps needs the auto trapeater, ignoring");
            return;
        }
        let coords: Vec<(i32, i32)> = self.baits.keys().copied().collect();
        let mut batch = Vec::new();
        for c in coords {
            batch.extend(self.change_bait(c, bait_type));
        }
        let nick = self.nick_or_someone(cause);
        let text = match bait_type {
            BaitType::Food => format!(
                "Oh no, {nick} accidentally drank a cup of coffee from the office machine. All baits have been transformed to food."
            ),
            BaitType::Coffee => format!(
                "Well ... {nick} is so tired, they let all baits turn into the most delicious black coffee."
            ),
            BaitType::Gem => format!(
                "Yeah baby! It seems that {nick} collected an enchanted golden apple. All baits have been transformed into gems."
            ),
            BaitType::Trap => format!(
                "Oh no, {nick} collected a blood diamond. All baits have turned into traps. But no worries, help has already arrived."
            ),
        };
        batch.push(messages::server_info(&text));
        self.broadcast(&batch);
        info!(bait_type = %bait_type, "baits transformed");
        if bait_type == BaitType::Trap {
            self.spawn_trapeater();
        } else {
            self.despawn_trapeater();
        }
    }

    pub(crate) fn change_speed(&mut self, speed: GameSpeed) {
        self.speed = speed;
        info!(speed = %speed, "game speed changed");
        self.broadcast(&[messages::speed_change(speed)]);
    }

    pub(crate) fn spawn_bot(&mut self, name: &str) -> bool {
        if name == self.config.special.trapeater {
            if self.bots.names().iter().any(|n| n == name) {
                self.trapeater.enabled = true;
                info!("auto trapeater enabled");
            } else {
                warn!(name, "no trapeater bot registered");
            }
            return false;
        }
        if name == self.config.special.frenzy {
            return self.spawn_frenzy();
        }
        let Some(game) = self.scheduler.handle() else {
            return false;
        };
        let launched = self.bots.spawn(name, game).is_some();
        if launched {
            info!(name, "bot launched");
        } else {
            warn!(name, "unknown bot");
        }
        launched
    }

    /// Disconnects everybody, then cancels the background work: pending
    /// contest events and the special bots.
    pub(crate) fn shutdown(&mut self) {
        info!(clients = self.clients.len(), "shutting down game");
        let conn_ids: Vec<_> = self.clients.keys().copied().collect();
        for conn_id in conn_ids {
            if let Err(e) = self.teardown(conn_id) {
                warn!(%conn_id, error = %e, "teardown failed during shutdown");
            }
        }
        if let Some(contest) = self.contest.take() {
            contest.cancel_timers();
        }
        self.despawn_frenzy();
        self.despawn_trapeater();
    }
}
