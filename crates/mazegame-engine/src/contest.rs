//! Timed contests: a schedule of game events between a START and a STOP,
//! with periodic reports and a final ranking.

use std::time::Duration;

use mazegame_protocol::{BaitType, GameSpeed, Message, ViewDirection, messages};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::pipeline::Command;
use crate::world::World;

const MIN_REPORT_INTERVAL_MINUTES: f64 = 0.1;

/// What a scheduled contest event does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestEventKind {
    Start,
    Report,
    SpawnFrenzy,
    DespawnFrenzy,
    SpeedUp,
    SlowDown,
    AllTraps,
    AllFood,
    AllCoffee,
    AllGems,
    BaitRush,
    ReBait,
    ShufflePlayers,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestEvent {
    pub kind: ContestEventKind,
    /// Minutes after the contest was scheduled.
    pub delay_minutes: f64,
}

impl ContestEvent {
    pub fn new(kind: ContestEventKind, delay_minutes: f64) -> Self {
        Self {
            kind,
            delay_minutes,
        }
    }
}

/// Contest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContestConfig {
    pub duration_minutes: f64,
    pub report_interval_minutes: f64,
    /// Number of places announced at the end.
    pub status_positions: usize,
    /// Speed for the contest; the previous speed returns afterwards.
    pub initial_speed: Option<GameSpeed>,
    /// Extra events. `None` means a frenzy bot joining for the middle
    /// third.
    pub additional_events: Option<Vec<ContestEvent>>,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 30.0,
            report_interval_minutes: 5.0,
            status_positions: 10,
            initial_speed: None,
            additional_events: None,
        }
    }
}

impl ContestConfig {
    pub fn duration(&self) -> Duration {
        minutes(self.duration_minutes)
    }

    /// The report interval, clamped to `[0.1, duration / 3]` minutes.
    pub fn report_interval(&self) -> f64 {
        let max = (self.duration_minutes / 3.0).max(MIN_REPORT_INTERVAL_MINUTES);
        self.report_interval_minutes
            .clamp(MIN_REPORT_INTERVAL_MINUTES, max)
    }

    pub fn additional_events(&self) -> Vec<ContestEvent> {
        self.additional_events.clone().unwrap_or_else(|| {
            vec![
                ContestEvent::new(ContestEventKind::SpawnFrenzy, self.duration_minutes / 3.0),
                ContestEvent::new(ContestEventKind::DespawnFrenzy, self.duration_minutes * 2.0 / 3.0),
            ]
        })
    }

    /// Every event of the contest, ordered by time.
    pub fn schedule(&self) -> Vec<ContestEvent> {
        let mut events = vec![ContestEvent::new(ContestEventKind::Start, 0.0)];
        let interval = self.report_interval();
        let mut at = interval;
        while at < self.duration_minutes {
            events.push(ContestEvent::new(ContestEventKind::Report, at));
            at += interval;
        }
        events.extend(
            self.additional_events()
                .into_iter()
                .filter(|e| e.delay_minutes >= 0.0 && e.delay_minutes < self.duration_minutes),
        );
        events.push(ContestEvent::new(ContestEventKind::Stop, self.duration_minutes));
        events.sort_by(|a, b| a.delay_minutes.total_cmp(&b.delay_minutes));
        events
    }
}

fn minutes(value: f64) -> Duration {
    Duration::from_secs_f64((value * 60.0).max(0.0))
}

/// `1h 5m 3s` style, whole seconds, zero components left out.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

fn format_minutes(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// A scheduled or running contest.
pub(crate) struct Contest {
    serial: u64,
    config: ContestConfig,
    started_at: Option<Instant>,
    initial_speed: GameSpeed,
    timers: Vec<AbortHandle>,
}

impl Contest {
    fn is_running(&self, now: Instant) -> bool {
        self.started_at
            .is_some_and(|start| now < start + self.config.duration())
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |start| start.elapsed())
    }

    pub(crate) fn cancel_timers(self) {
        for timer in &self.timers {
            timer.abort();
        }
    }
}

impl World {
    pub(crate) fn start_contest(&mut self, config: ContestConfig) -> bool {
        if self.contest.is_some() {
            warn!("a contest is already scheduled");
            return false;
        }
        self.contest_serial += 1;
        let serial = self.contest_serial;
        let schedule = config.schedule();
        let timers = schedule
            .iter()
            .map(|event| {
                self.scheduler.after(
                    minutes(event.delay_minutes),
                    Command::ContestEvent {
                        serial,
                        kind: event.kind,
                    },
                )
            })
            .collect();
        info!(
            duration_minutes = config.duration_minutes,
            events = schedule.len(),
            "contest scheduled"
        );
        self.contest = Some(Contest {
            serial,
            config,
            started_at: None,
            initial_speed: self.speed,
            timers,
        });
        true
    }

    /// Cancels the contest and announces the ranking so far.
    pub(crate) fn stop_contest(&mut self) -> bool {
        let Some(contest) = self.contest.as_ref() else {
            return false;
        };
        let text = format!(
            "Contest is being cancelled after {}.",
            format_duration(contest.elapsed())
        );
        self.broadcast_text(&text);
        self.finish_contest();
        true
    }

    pub(crate) fn contest_report(&mut self) -> bool {
        let running = self
            .contest
            .as_ref()
            .is_some_and(|c| c.is_running(Instant::now()));
        if running {
            self.report_contest();
        }
        running
    }

    pub(crate) fn contest_event(&mut self, serial: u64, kind: ContestEventKind) {
        let Some(contest) = self.contest.as_ref() else {
            return;
        };
        if contest.serial != serial {
            return;
        }
        let running = contest.is_running(Instant::now());
        match kind {
            ContestEventKind::Start => self.begin_contest(),
            ContestEventKind::Stop => self.finish_contest(),
            _ if !running => {}
            ContestEventKind::Report => self.report_contest(),
            ContestEventKind::SpawnFrenzy => {
                self.spawn_frenzy();
            }
            ContestEventKind::DespawnFrenzy => self.despawn_frenzy(),
            ContestEventKind::SpeedUp => {
                self.change_speed(self.speed.speed_up());
                self.broadcast_text("Let's speed things up a little.");
            }
            ContestEventKind::SlowDown => {
                self.change_speed(self.speed.slow_down());
                self.broadcast_text("That was exhausting. Slowing down.");
            }
            ContestEventKind::AllTraps => self.transform_baits(BaitType::Trap, None),
            ContestEventKind::AllFood => self.transform_baits(BaitType::Food, None),
            ContestEventKind::AllCoffee => self.transform_baits(BaitType::Coffee, None),
            ContestEventKind::AllGems => self.transform_baits(BaitType::Gem, None),
            ContestEventKind::BaitRush => self.bait_rush(None),
            ContestEventKind::ReBait => {
                self.stop(true);
                self.go();
                self.broadcast_text("What? Let's pretend nobody noticed...");
            }
            ContestEventKind::ShufflePlayers => self.shuffle_players(),
        }
    }

    fn begin_contest(&mut self) {
        let Some(contest) = self.contest.as_ref() else {
            return;
        };
        if contest.started_at.is_some() {
            return;
        }
        let duration = contest.config.duration_minutes;
        let speed = contest.config.initial_speed;
        self.stop(true);
        self.clear_scores();
        if let Some(speed) = speed {
            self.change_speed(speed);
        }
        if let Some(contest) = self.contest.as_mut() {
            contest.started_at = Some(Instant::now());
        }
        info!(duration_minutes = duration, "contest started");
        self.broadcast_text(&format!(
            "Starting contest. Contest will run for {} minutes.",
            format_minutes(duration)
        ));
        self.go();
    }

    fn report_contest(&mut self) {
        let Some(contest) = self.contest.as_ref() else {
            return;
        };
        let elapsed = contest.elapsed();
        let remaining = contest.config.duration().saturating_sub(elapsed);
        self.broadcast(&[
            messages::server_info(&format!("Contest is running for {}.", format_duration(elapsed)))
                .there_is_more(),
            messages::server_info(&format!(
                "Contest will run for another {}.",
                format_duration(remaining)
            )),
        ]);
    }

    fn finish_contest(&mut self) {
        let Some(contest) = self.contest.take() else {
            return;
        };
        self.stop(true);
        if self.speed != contest.initial_speed {
            self.change_speed(contest.initial_speed);
        }

        let mut ranking: Vec<(i32, String)> = self
            .clients
            .values()
            .filter(|c| c.status.is_playing())
            .filter_map(|c| c.player.as_ref())
            .map(|p| (p.score, p.nick.clone()))
            .collect();
        ranking.sort_by(|a, b| b.0.cmp(&a.0));

        let mut batch: Vec<Message> = ranking
            .iter()
            .take(contest.config.status_positions)
            .enumerate()
            .map(|(i, (_, nick))| {
                messages::server_info(&format!("Position {:02}: {nick}", i + 1)).there_is_more()
            })
            .collect();
        match ranking.first() {
            Some((score, winner)) => {
                info!(winner = %winner, score, "contest finished");
                batch.push(messages::server_info(&format!("The winner is: {winner}")));
            }
            None => {
                info!("contest finished without players");
                batch.push(Message::empty_last());
            }
        }
        self.broadcast(&batch);
        contest.cancel_timers();
    }

    /// Teleports every playing player to a random cell.
    fn shuffle_players(&mut self) {
        let playing: Vec<_> = self
            .clients
            .values()
            .filter(|c| c.status.is_playing())
            .map(|c| c.conn_id)
            .collect();
        let mut batch = vec![messages::server_info(
            "Wait what? Something is malfunctioning ... where are y'all going?",
        )
        .there_is_more()];
        for conn_id in playing {
            let Some(destination) = self.positions.for_teleport(&self.maze, &mut self.rng) else {
                break;
            };
            let direction = ViewDirection::random(&mut self.rng);
            let Some(player) = self.player_mut(conn_id) else {
                continue;
            };
            let from = player.coords();
            player.set_coords(destination.coords());
            player.direction = direction;
            batch.push(player.teleport_message().there_is_more());
            self.maze.move_occupant(from, destination.coords());
        }
        batch.push(Message::empty_last());
        self.broadcast(&batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_duration(Duration::from_millis(61_900)), "1m 1s");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(30.0), "30");
        assert_eq!(format_minutes(0.5), "0.5");
    }

    #[test]
    fn test_report_interval_is_clamped() {
        let config = ContestConfig {
            duration_minutes: 6.0,
            report_interval_minutes: 5.0,
            ..ContestConfig::default()
        };
        assert_eq!(config.report_interval(), 2.0);

        let config = ContestConfig {
            report_interval_minutes: 0.0,
            ..ContestConfig::default()
        };
        assert_eq!(config.report_interval(), 0.1);
    }

    #[test]
    fn test_default_schedule() {
        let schedule = ContestConfig::default().schedule();
        let kinds: Vec<_> = schedule.iter().map(|e| e.kind).collect();
        use ContestEventKind::*;
        assert_eq!(
            kinds,
            vec![Start, Report, Report, SpawnFrenzy, Report, Report, DespawnFrenzy, Report, Stop]
        );
        assert_eq!(schedule.last().map(|e| e.delay_minutes), Some(30.0));
    }

    #[test]
    fn test_schedule_drops_events_outside_the_contest() {
        let config = ContestConfig {
            duration_minutes: 3.0,
            report_interval_minutes: 1.0,
            additional_events: Some(vec![
                ContestEvent::new(ContestEventKind::SpeedUp, 1.5),
                ContestEvent::new(ContestEventKind::BaitRush, 10.0),
            ]),
            ..ContestConfig::default()
        };
        let kinds: Vec<_> = config.schedule().iter().map(|e| e.kind).collect();
        use ContestEventKind::*;
        assert_eq!(kinds, vec![Start, Report, SpeedUp, Report, Stop]);
    }

    #[test]
    fn test_config_from_json() {
        let config: ContestConfig = serde_json::from_str(
            r#"{"duration_minutes":10,"initial_speed":"fast","additional_events":[{"kind":"SHUFFLE_PLAYERS","delay_minutes":5}]}"#,
        )
        .unwrap();
        assert_eq!(config.duration(), Duration::from_secs(600));
        assert_eq!(config.initial_speed, Some(GameSpeed::Fast));
        assert_eq!(config.additional_events()[0].kind, ContestEventKind::ShufflePlayers);
    }
}
