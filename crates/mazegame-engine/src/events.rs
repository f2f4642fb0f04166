//! Random game events triggered by bait collections and collisions.

use mazegame_protocol::{BaitType, PlayerId};
use rand::Rng;
use tokio::time::Instant;
use tracing::info;

use crate::admin::PutBait;
use crate::bait::roll_type_without_trap;
use crate::config::EventsConfig;
use crate::pipeline::Command;
use crate::world::World;

/// Something that happened during a step and may trigger an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameEvent {
    BaitCollected {
        player: PlayerId,
        bait_type: BaitType,
        was_visible: bool,
    },
    Collision {
        causing: PlayerId,
        other: PlayerId,
        x: i32,
        y: i32,
    },
}

/// What an event turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    BaitRush(PlayerId),
    Transform(BaitType, PlayerId),
    LoseBait {
        causing: PlayerId,
        other: PlayerId,
        x: i32,
        y: i32,
    },
}

/// Probabilities and the cooldown between two events.
#[derive(Debug)]
pub(crate) struct EventControl {
    config: EventsConfig,
    earliest_next: Instant,
}

impl EventControl {
    pub(crate) fn new(config: EventsConfig, now: Instant) -> Self {
        let earliest_next = now + config.cooldown();
        Self {
            config,
            earliest_next,
        }
    }

    /// Maps an event and a uniform `roll` to an outcome. Triggering arms the
    /// cooldown, except for a lost bait.
    pub(crate) fn evaluate(&mut self, event: GameEvent, roll: f64, now: Instant) -> Option<EventOutcome> {
        if now < self.earliest_next {
            return None;
        }
        let c = &self.config;
        let outcome = match event {
            GameEvent::BaitCollected {
                player,
                bait_type,
                was_visible,
            } => match bait_type {
                BaitType::Trap if !was_visible && roll < c.bait_rush => Some(EventOutcome::BaitRush(player)),
                BaitType::Food if roll < c.all_gem => Some(EventOutcome::Transform(BaitType::Gem, player)),
                BaitType::Coffee if roll < c.all_food => Some(EventOutcome::Transform(BaitType::Food, player)),
                BaitType::Gem if roll < c.all_trap => Some(EventOutcome::Transform(BaitType::Trap, player)),
                _ => None,
            },
            GameEvent::Collision { causing, other, x, y } => {
                if roll < c.all_coffee {
                    Some(EventOutcome::Transform(BaitType::Coffee, causing))
                } else if roll < c.all_coffee + c.lose_bait {
                    Some(EventOutcome::LoseBait { causing, other, x, y })
                } else {
                    None
                }
            }
        };
        if matches!(outcome, Some(EventOutcome::BaitRush(_) | EventOutcome::Transform(..))) {
            self.earliest_next = now + self.config.cooldown();
        }
        outcome
    }
}

impl World {
    pub(crate) fn handle_event(&mut self, event: GameEvent) {
        let roll = self.rng.random::<f64>();
        let Some(outcome) = self.events.evaluate(event, roll, Instant::now()) else {
            return;
        };
        info!(?outcome, "game event triggered");
        match outcome {
            EventOutcome::BaitRush(player) => self.scheduler.enqueue(Command::BaitRush {
                cause: Some(player),
                reply: None,
            }),
            EventOutcome::Transform(bait_type, player) => self.scheduler.enqueue(Command::TransformBaits {
                bait_type,
                cause: Some(player),
                reply: None,
            }),
            EventOutcome::LoseBait { causing, other, x, y } => self.lose_bait(causing, other, (x, y)),
        }
    }

    /// The causing player drops a random non-trap bait at the collision site.
    fn lose_bait(&mut self, causing: PlayerId, other: PlayerId, (x, y): (i32, i32)) {
        let bait_type = roll_type_without_trap(&mut self.rng);
        let other_nick = self
            .conn_of(other)
            .and_then(|conn| self.player(conn))
            .map(|p| p.nick.clone())
            .unwrap_or_default();
        let Some(player) = self.conn_of(causing).and_then(|conn| self.player_mut(conn)) else {
            return;
        };
        player.score -= bait_type.score();
        let text = format!(
            "While {} ran into {}, they dropped a {}.",
            player.nick,
            other_nick,
            bait_type.name()
        );
        let score = player.score_message();
        self.broadcast(&[score]);
        let request = PutBait::visible(bait_type, x, y).with_message(text);
        self.scheduler.enqueue(Command::PutBait { request, reply: None });
    }
}
