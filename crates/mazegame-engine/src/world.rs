//! The game world owned by the pipeline task: maze, clients, baits and the
//! bookkeeping around them.
//!
//! Nothing here is shared. Every method runs on the pipeline task, one
//! command at a time, so the occupancy map, the bait map and the player
//! positions always agree with each other.

use std::collections::BTreeMap;
use std::sync::Arc;

use mazegame_maze::{Maze, PATH, PositionProvider};
use mazegame_protocol::{BaitType, GameSpeed, Message, PlayerId, messages};
use mazegame_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::bait::{Bait, roll_type, roll_type_without_trap};
use crate::bots::BotSpawner;
use crate::client::Client;
use crate::config::EngineConfig;
use crate::contest::Contest;
use crate::events::EventControl;
use crate::pipeline::Scheduler;
use crate::player::Player;
use crate::special::{AutoTrapeater, SpecialBot};

/// Result of placing something on a given cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationResult {
    Success,
    OutOfBounds,
    NoPath,
    Occupied,
}

pub(crate) struct World {
    pub(crate) config: EngineConfig,
    pub(crate) maze: Maze,
    pub(crate) positions: PositionProvider,
    pub(crate) rng: StdRng,
    pub(crate) speed: GameSpeed,
    pub(crate) clients: BTreeMap<ConnectionId, Client>,
    pub(crate) last_player_id: u32,
    pub(crate) active_players: usize,
    pub(crate) baits: BTreeMap<(i32, i32), Bait>,
    next_bait_id: u64,
    pub(crate) base_bait_count: usize,
    pub(crate) desired_bait_count: usize,
    pub(crate) max_trap_count: usize,
    pub(crate) events: EventControl,
    pub(crate) frenzy: SpecialBot,
    pub(crate) trapeater: AutoTrapeater,
    pub(crate) contest: Option<Contest>,
    pub(crate) contest_serial: u64,
    pub(crate) bots: Arc<dyn BotSpawner>,
    pub(crate) scheduler: Scheduler,
}

impl World {
    pub(crate) fn new(
        maze: Maze,
        config: EngineConfig,
        bots: Arc<dyn BotSpawner>,
        scheduler: Scheduler,
    ) -> Self {
        let config = config.validated();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let positions = PositionProvider::new(&maze, &mut rng);
        let generator = &config.game.bait_generator;
        let base_bait_count = generator.base_bait_count(positions.walkable_count());
        let max_trap_count = generator.max_trap_count(base_bait_count);
        let desired_bait_count = if config.game.generate_baits_at_start {
            base_bait_count
        } else {
            0
        };

        let trapeater_available = bots.names().contains(&config.special.trapeater);
        if config.game.auto_trapeater && !trapeater_available {
            warn!(name = %config.special.trapeater, "auto trapeater requested but no such bot is registered");
        }
        let auto_trapeater = config.game.auto_trapeater && trapeater_available;

        info!(
            width = maze.width(),
            height = maze.height(),
            walkable = positions.walkable_count(),
            base_bait_count,
            max_trap_count,
            "maze ready"
        );

        let now = Instant::now();
        Self {
            speed: config.game.initial_speed,
            events: EventControl::new(config.game.events.clone(), now),
            frenzy: SpecialBot::new(config.special.frenzy.clone()),
            trapeater: AutoTrapeater::new(config.special.trapeater.clone(), auto_trapeater, now),
            config,
            maze,
            positions,
            rng,
            clients: BTreeMap::new(),
            last_player_id: 0,
            active_players: 0,
            baits: BTreeMap::new(),
            next_bait_id: 0,
            base_bait_count,
            desired_bait_count,
            max_trap_count,
            contest: None,
            contest_serial: 0,
            bots,
            scheduler,
        }
    }

    // -- Clients -------------------------------------------------------------

    pub(crate) fn player(&self, conn_id: ConnectionId) -> Option<&Player> {
        self.clients.get(&conn_id)?.player.as_ref()
    }

    pub(crate) fn player_mut(&mut self, conn_id: ConnectionId) -> Option<&mut Player> {
        self.clients.get_mut(&conn_id)?.player.as_mut()
    }

    pub(crate) fn conn_of(&self, id: PlayerId) -> Option<ConnectionId> {
        self.clients
            .values()
            .find(|c| c.player_id() == Some(id))
            .map(|c| c.conn_id)
    }

    /// The connection whose player stands on `coords`, if any.
    pub(crate) fn occupant_at(&self, coords: (i32, i32)) -> Option<ConnectionId> {
        self.clients
            .values()
            .find(|c| c.status.is_logged_in() && c.player.as_ref().is_some_and(|p| p.coords() == coords))
            .map(|c| c.conn_id)
    }

    pub(crate) fn logged_in_count(&self) -> usize {
        self.clients.values().filter(|c| c.status.is_logged_in()).count()
    }

    pub(crate) fn nick_taken(&self, nick: &str) -> bool {
        self.clients
            .values()
            .any(|c| c.status.is_logged_in() && c.nick() == nick)
    }

    /// Server-side bots and the trapeater come and go without a text.
    pub(crate) fn announces_presence(&self, client: &Client) -> bool {
        !client.server_side && !self.config.special.is_trapeater(client.nick())
    }

    // -- Messaging -----------------------------------------------------------

    pub(crate) fn send_to(&self, conn_id: ConnectionId, message: Message) {
        if let Some(client) = self.clients.get(&conn_id) {
            client.send(message);
        }
    }

    /// Sends a batch to every playing or spectating client.
    pub(crate) fn broadcast(&self, batch: &[Message]) {
        if batch.is_empty() {
            return;
        }
        for client in self.clients.values().filter(|c| c.status.is_in_game()) {
            client.send_all(batch);
        }
    }

    pub(crate) fn broadcast_text(&self, text: &str) {
        self.broadcast(&[messages::server_info(text)]);
    }

    // -- Baits ---------------------------------------------------------------

    pub(crate) fn trap_count(&self) -> usize {
        self.baits
            .values()
            .filter(|b| b.bait_type == BaitType::Trap)
            .count()
    }

    pub(crate) fn visible_trap_count(&self) -> usize {
        self.baits
            .values()
            .filter(|b| b.bait_type == BaitType::Trap && b.is_visible())
            .count()
    }

    pub(crate) fn invisible_bait_count(&self) -> usize {
        self.baits.values().filter(|b| !b.is_visible()).count()
    }

    pub(crate) fn new_bait(&mut self, bait_type: BaitType, (x, y): (i32, i32)) -> Bait {
        self.next_bait_id += 1;
        Bait::new(self.next_bait_id, bait_type, x, y)
    }

    fn create_random_bait(&mut self) -> Option<Bait> {
        let bait_type = if self.trap_count() < self.max_trap_count {
            roll_type(&mut self.rng)
        } else {
            roll_type_without_trap(&mut self.rng)
        };
        let position = match bait_type {
            BaitType::Gem => self.positions.for_gem(&self.maze, &mut self.rng),
            BaitType::Trap => self.positions.for_trap(&self.maze, &mut self.rng),
            BaitType::Food | BaitType::Coffee => {
                self.positions.random_free(&self.maze, &mut self.rng)
            }
        }?;
        let mut bait = self.new_bait(bait_type, position.coords());
        bait.roll_visibility(&mut self.rng);
        Some(bait)
    }

    /// Puts a bait into the maze. Returns its `BPOS app` line when visible.
    pub(crate) fn add_bait(&mut self, bait: Bait) -> Option<Message> {
        self.maze.occupy(bait.x, bait.y);
        let message = bait.is_visible().then(|| bait.appear_message());
        self.baits.insert(bait.coords(), bait);
        message
    }

    pub(crate) fn remove_bait_at(&mut self, coords: (i32, i32)) -> Option<Bait> {
        let bait = self.baits.remove(&coords)?;
        self.maze.release(coords.0, coords.1);
        Some(bait)
    }

    /// Turns the bait on `coords` into `bait_type`. Hidden baits become
    /// visible on the way.
    pub(crate) fn change_bait(&mut self, coords: (i32, i32), bait_type: BaitType) -> Vec<Message> {
        let mut batch = Vec::new();
        let Some(bait) = self.baits.get_mut(&coords) else {
            return batch;
        };
        if bait.is_visible() {
            if bait.bait_type == bait_type {
                return batch;
            }
            batch.push(bait.vanish_message().there_is_more());
        } else {
            bait.reveal();
        }
        bait.bait_type = bait_type;
        batch.push(bait.appear_message().there_is_more());
        batch
    }

    fn fill_baits_into(&mut self, batch: &mut Vec<Message>) -> usize {
        let mut generated = 0;
        while self.baits.len() < self.desired_bait_count {
            let Some(bait) = self.create_random_bait() else {
                warn!(
                    baits = self.baits.len(),
                    desired = self.desired_bait_count,
                    "no free cell left for another bait"
                );
                break;
            };
            generated += 1;
            if let Some(message) = self.add_bait(bait) {
                batch.push(message.there_is_more());
            }
        }
        generated
    }

    /// Tops the maze up to the desired bait count.
    pub(crate) fn fill_baits(&mut self) -> Vec<Message> {
        let hidden_before = self.invisible_bait_count();
        let mut batch = Vec::new();
        let generated = self.fill_baits_into(&mut batch);
        if generated > 0 {
            let invisible = self.invisible_bait_count().saturating_sub(hidden_before);
            info!(generated, invisible, "generated baits");
        }
        if !batch.is_empty() {
            batch.push(Message::empty_last());
        }
        batch
    }

    /// Reveals hidden baits whose time has come, refills, then gives the
    /// auto trapeater a chance to come or go. The batch is left open.
    pub(crate) fn replace_baits(&mut self) -> Vec<Message> {
        let now = Instant::now();
        let mut batch: Vec<Message> = self
            .baits
            .values_mut()
            .filter_map(|b| b.check_reappear(now).then(|| b.appear_message().there_is_more()))
            .collect();
        self.fill_baits_into(&mut batch);
        if self.trapeater.enabled {
            self.handle_auto_trapeater();
        }
        batch
    }

    /// Removes every bait matching `filter`.
    pub(crate) fn withdraw_baits(&mut self, filter: impl Fn(&Bait) -> bool) -> Vec<Message> {
        let doomed: Vec<(i32, i32)> = self
            .baits
            .values()
            .filter(|b| filter(b))
            .map(Bait::coords)
            .collect();
        let mut batch = Vec::new();
        for coords in doomed {
            if let Some(bait) = self.remove_bait_at(coords) {
                if bait.is_visible() {
                    batch.push(bait.vanish_message().there_is_more());
                }
            }
        }
        if !batch.is_empty() {
            batch.push(Message::empty_last());
        }
        batch
    }

    /// Can something be put on `(x, y)`?
    pub(crate) fn check_free_cell(&self, x: i32, y: i32) -> OccupationResult {
        if !self.maze.in_bounds(x, y) {
            OccupationResult::OutOfBounds
        } else if self.maze.get(x, y) != PATH {
            OccupationResult::NoPath
        } else if self.maze.is_occupied(x, y) {
            OccupationResult::Occupied
        } else {
            OccupationResult::Success
        }
    }

    // -- Scores --------------------------------------------------------------

    /// Resets every in-game score. The batch ends with an empty last line.
    pub(crate) fn reset_scores(&mut self) -> Vec<Message> {
        let mut batch = Vec::new();
        for client in self.clients.values_mut().filter(|c| c.status.is_in_game()) {
            if let Some(player) = client.player.as_mut() {
                player.reset_score();
                batch.push(player.score_message().there_is_more());
            }
        }
        if !batch.is_empty() {
            batch.push(Message::empty_last());
        }
        batch
    }
}
