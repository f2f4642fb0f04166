//! The in-game half of a logged-in client.

use std::time::Duration;

use mazegame_maze::SPECTATOR;
use mazegame_protocol::{Message, PlayerId, PositionChangeReason, ViewDirection, messages};
use tokio::time::Instant;

/// Position, orientation and score of a logged-in client.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nick: String,
    pub x: i32,
    pub y: i32,
    pub direction: ViewDirection,
    pub score: i32,
    pub move_counter: u64,
    login_time: Instant,
    play_start: Instant,
}

impl Player {
    pub fn new(id: PlayerId, nick: impl Into<String>, direction: ViewDirection) -> Self {
        let now = Instant::now();
        Self {
            id,
            nick: nick.into(),
            x: SPECTATOR.x,
            y: SPECTATOR.y,
            direction,
            score: 0,
            move_counter: 0,
            login_time: now,
            play_start: now,
        }
    }

    pub fn coords(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn set_coords(&mut self, (x, y): (i32, i32)) {
        self.x = x;
        self.y = y;
    }

    /// Score back to zero; the points-per-minute clock restarts too.
    pub fn reset_score(&mut self) {
        self.score = 0;
        self.play_start = Instant::now();
    }

    pub fn total_play_time(&self) -> Duration {
        self.login_time.elapsed()
    }

    pub fn current_play_time(&self) -> Duration {
        self.play_start.elapsed()
    }

    /// Score per minute since the last reset, rounded to two decimals.
    pub fn points_per_minute(&self) -> f64 {
        let minutes = self.current_play_time().as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        (f64::from(self.score) / minutes * 100.0).round() / 100.0
    }

    /// Average milliseconds per move since the last reset.
    pub fn average_move_time_ms(&self) -> f64 {
        if self.move_counter == 0 {
            return 0.0;
        }
        self.current_play_time().as_millis() as f64 / self.move_counter as f64
    }

    // -- Messages ------------------------------------------------------------

    pub fn join_message(&self) -> Message {
        messages::join_game(self.id, &self.nick, None)
    }

    fn position_message(&self, reason: PositionChangeReason) -> Message {
        messages::player_position(self.id, self.x, self.y, self.direction, reason)
    }

    pub fn appear_message(&self) -> Message {
        self.position_message(PositionChangeReason::Appear)
    }

    pub fn vanish_message(&self) -> Message {
        self.position_message(PositionChangeReason::Vanish)
    }

    pub fn step_message(&self) -> Message {
        self.position_message(PositionChangeReason::Move)
    }

    pub fn turn_message(&self) -> Message {
        self.position_message(PositionChangeReason::Turn)
    }

    /// Teleport ordered by an operator.
    pub fn teleport_message(&self) -> Message {
        self.position_message(PositionChangeReason::Teleport)
    }

    pub fn trap_teleport_message(&self) -> Message {
        messages::trap_teleport(self.id, self.x, self.y, self.direction)
    }

    pub fn collision_teleport_message(&self, causing: PlayerId) -> Message {
        messages::collision_teleport(self.id, self.x, self.y, self.direction, causing)
    }

    pub fn score_message(&self) -> Message {
        messages::player_score(self.id, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        let mut player = Player::new(PlayerId(3), "alice", ViewDirection::East);
        player.set_coords((4, 2));
        player
    }

    #[test]
    fn test_new_player_stands_nowhere() {
        let player = Player::new(PlayerId(1), "bob", ViewDirection::North);
        assert_eq!(player.coords(), (-1, -1));
        assert_eq!(player.score, 0);
    }

    #[test]
    fn test_position_messages() {
        let player = player();
        assert_eq!(player.step_message().text, "PPOS;3;4;2;e;mov");
        assert_eq!(player.turn_message().text, "PPOS;3;4;2;e;trn");
        assert_eq!(player.vanish_message().text, "PPOS;3;4;2;e;van");
        assert_eq!(player.trap_teleport_message().text, "PPOS;3;4;2;e;tel;t");
        assert_eq!(
            player.collision_teleport_message(PlayerId(9)).text,
            "PPOS;3;4;2;e;tel;c;9"
        );
        assert_eq!(player.join_message().text, "JOIN;3;alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_points_per_minute_rounded() {
        let mut player = player();
        player.score = 10;
        tokio::time::advance(Duration::from_secs(180)).await;
        assert_eq!(player.points_per_minute(), 3.33);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_score_restarts_play_clock() {
        let mut player = player();
        player.score = 25;
        tokio::time::advance(Duration::from_secs(60)).await;
        player.reset_score();
        assert_eq!(player.score, 0);
        assert!(player.current_play_time() < Duration::from_secs(1));
        assert!(player.total_play_time() >= Duration::from_secs(60));
    }
}
