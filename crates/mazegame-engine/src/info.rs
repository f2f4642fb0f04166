//! Read-only snapshots for operators.

use mazegame_protocol::{GameSpeed, PlayerId};
use serde::Serialize;

use crate::world::World;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaitInfo {
    pub base: usize,
    pub desired: usize,
    pub current: usize,
    pub invisible: usize,
    pub max_traps: usize,
    pub current_traps: usize,
    pub visible_traps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub width: usize,
    pub height: usize,
    pub walkable_fields: usize,
    /// Cells claimed by a player or a bait.
    pub occupied_fields: usize,
    pub speed: GameSpeed,
    pub auto_trapeater: bool,
    pub allow_spectator: bool,
    pub delay_compensation: bool,
    pub events_enabled: bool,
    pub baits: BaitInfo,
    pub connected_clients: usize,
    pub active_players: usize,
    pub max_clients: usize,
    pub available_bots: Vec<String>,
    pub contest_scheduled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nick: String,
    pub score: i32,
    pub server_side: bool,
    pub spectator: bool,
    pub delay_offset_ms: i64,
    pub total_play_time_ms: u64,
    pub current_play_time_ms: u64,
    pub points_per_minute: f64,
    pub average_move_time_ms: f64,
}

impl World {
    pub(crate) fn server_info(&self) -> ServerInfo {
        ServerInfo {
            width: self.maze.width(),
            height: self.maze.height(),
            walkable_fields: self.positions.walkable_count(),
            occupied_fields: self.maze.occupied_count(),
            speed: self.speed,
            auto_trapeater: self.trapeater.enabled,
            allow_spectator: self.config.game.allow_spectator,
            delay_compensation: self.config.game.delay_compensation,
            events_enabled: self.config.game.events.enabled,
            baits: BaitInfo {
                base: self.base_bait_count,
                desired: self.desired_bait_count,
                current: self.baits.len(),
                invisible: self.invisible_bait_count(),
                max_traps: self.max_trap_count,
                current_traps: self.trap_count(),
                visible_traps: self.visible_trap_count(),
            },
            connected_clients: self.clients.len(),
            active_players: self.active_players,
            max_clients: self.config.max_clients,
            available_bots: self.bots.names(),
            contest_scheduled: self.contest.is_some(),
        }
    }

    pub(crate) fn player_infos(&self) -> Vec<PlayerInfo> {
        let delay = self.speed.delay_ms();
        self.clients
            .values()
            .filter(|c| c.status.is_logged_in())
            .filter_map(|client| {
                let player = client.player.as_ref()?;
                Some(PlayerInfo {
                    id: player.id,
                    nick: player.nick.clone(),
                    score: player.score,
                    server_side: client.server_side,
                    spectator: client.status.is_spectating(),
                    delay_offset_ms: client.turn_time_offset(&self.config, delay),
                    total_play_time_ms: player.total_play_time().as_millis() as u64,
                    current_play_time_ms: player.current_play_time().as_millis() as u64,
                    points_per_minute: player.points_per_minute(),
                    average_move_time_ms: player.average_move_time_ms(),
                })
            })
            .collect()
    }
}
