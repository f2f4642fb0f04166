//! Per-player move timing for the maze game.
//!
//! The server grants each player one move per tick. Between the `RDY.` that
//! opens a move and the command that uses it lies the player's think time
//! plus the network round trip. [`DelayCompensator`] measures that gap and
//! shortens the next tick by the average, so that players far away from the
//! server are not punished for their latency.
//!
//! A second, shorter average tracks the time between consecutive commands.
//! A client whose commands arrive faster than the tick allows is cheating
//! the compensation; its measurements are thrown away.
//!
//! # Integration
//!
//! The compensator holds no clock of its own. Callers pass the instant of
//! each event, which keeps the arithmetic testable under a paused clock:
//!
//! ```ignore
//! compensator.start_timer(Instant::now());            // on RDY.
//! let outcome = compensator.stop_timer(received_at, delay_ms); // on STEP/TURN
//! let next = delay_ms as i64 + compensator.turn_time_offset(delay_ms);
//! ```

use tokio::time::Instant;
use tracing::trace;

/// Samples of READY-to-command time.
pub const DELAY_WINDOW_SIZE: usize = 21;
/// Samples of command-to-command time.
pub const COMMAND_WINDOW_SIZE: usize = 5;
/// Slack granted before a cadence counts as too fast.
pub const TOLERANCE_MS: i64 = 5;

const MIN_PENALTY_FRACTION: f64 = -2.0 / 3.0;
const MAX_PENALTY_FRACTION: f64 = 20.0 / 3.0;

// ---------------------------------------------------------------------------
// MovingAverage
// ---------------------------------------------------------------------------

/// A simple moving average over the last `window` values.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: Vec<i64>,
    sum: i64,
    filled: usize,
    next: usize,
}

impl MovingAverage {
    /// # Panics
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "moving average window must not be empty");
        Self {
            values: vec![0; window],
            sum: 0,
            filled: 0,
            next: 0,
        }
    }

    pub fn add(&mut self, value: i64) {
        if self.filled < self.values.len() {
            self.filled += 1;
        } else {
            self.sum -= self.values[self.next];
        }
        self.values[self.next] = value;
        self.next = (self.next + 1) % self.values.len();
        self.sum += value;
    }

    /// Rounded average, 0 while empty.
    pub fn average(&self) -> i64 {
        if self.filled == 0 {
            return 0;
        }
        (self.sum as f64 / self.filled as f64).round() as i64
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.sum = 0;
        self.filled = 0;
        self.next = 0;
    }
}

// ---------------------------------------------------------------------------
// DelayCompensator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Initialized,
    Started,
    Stopped,
}

/// What [`DelayCompensator::stop_timer`] did with a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No running timer, or the sample was too large to be meaningful.
    Ignored,
    /// The sample went into the averages.
    Recorded,
    /// The client was too fast; all averages were cleared.
    Reset {
        /// The cadence was fast enough that the client should be told.
        notify: bool,
        average_command_delta: i64,
    },
}

/// Delay compensation state of one connection.
#[derive(Debug, Clone)]
pub struct DelayCompensator {
    state: TimerState,
    penalty: i64,
    last_ready: Option<Instant>,
    last_command: Option<Instant>,
    commands_received: u64,
    average_delay: MovingAverage,
    average_command_delta: MovingAverage,
}

impl Default for DelayCompensator {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayCompensator {
    pub fn new() -> Self {
        Self {
            state: TimerState::Initialized,
            penalty: 0,
            last_ready: None,
            last_command: None,
            commands_received: 0,
            average_delay: MovingAverage::new(DELAY_WINDOW_SIZE),
            average_command_delta: MovingAverage::new(COMMAND_WINDOW_SIZE),
        }
    }

    /// The largest amount a tick may be shortened by.
    pub fn max_compensation(delay_ms: u64) -> i64 {
        delay_ms as i64 - 25
    }

    /// Inclusive penalty bounds for the given tick.
    pub fn penalty_bounds(delay_ms: u64) -> (i64, i64) {
        let delay = delay_ms as f64;
        (
            (delay * MIN_PENALTY_FRACTION).round_ties_even() as i64,
            (delay * MAX_PENALTY_FRACTION).round_ties_even() as i64,
        )
    }

    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    /// Sets the penalty, clamped to [`penalty_bounds`](Self::penalty_bounds).
    /// Negative values speed the player up.
    pub fn set_penalty(&mut self, penalty: i64, delay_ms: u64) {
        let (min, max) = Self::penalty_bounds(delay_ms);
        self.penalty = penalty.clamp(min, max);
    }

    pub fn average_delay(&self) -> i64 {
        self.average_delay.average()
    }

    /// Milliseconds to add to the tick before the next `RDY.`:
    /// `penalty - clamp(average_delay, 0, max_compensation)`.
    pub fn turn_time_offset(&self, delay_ms: u64) -> i64 {
        let max = Self::max_compensation(delay_ms).max(0);
        let compensation = self.average_delay.average().clamp(0, max);
        self.penalty - compensation
    }

    /// Marks the moment a `RDY.` was sent.
    pub fn start_timer(&mut self, now: Instant) {
        self.state = TimerState::Started;
        self.last_ready = Some(now);
    }

    /// Records the command that used the move opened by the last
    /// [`start_timer`](Self::start_timer).
    pub fn stop_timer(&mut self, received_at: Instant, delay_ms: u64) -> StopOutcome {
        let mut outcome = StopOutcome::Ignored;
        if self.state == TimerState::Started {
            if let Some(ready) = self.last_ready {
                let elapsed = received_at.saturating_duration_since(ready).as_millis() as i64;
                if elapsed < Self::max_compensation(delay_ms) {
                    self.average_delay.add(elapsed);
                    outcome = self.measure_command(received_at, delay_ms);
                } else {
                    trace!(elapsed, "delay sample too large, ignored");
                }
            }
        }
        self.state = TimerState::Stopped;
        self.commands_received += 1;
        outcome
    }

    fn measure_command(&mut self, now: Instant, delay_ms: u64) -> StopOutcome {
        let mut outcome = StopOutcome::Recorded;
        if let Some(last) = self.last_command {
            let delta = now.saturating_duration_since(last).as_millis() as i64;
            self.average_command_delta.add(delta);
            let average = self.average_command_delta.average();
            let delay = delay_ms as i64;
            if self.commands_received > DELAY_WINDOW_SIZE as u64 && average + TOLERANCE_MS < delay {
                self.reset();
                outcome = StopOutcome::Reset {
                    notify: average + TOLERANCE_MS * 2 < delay,
                    average_command_delta: average,
                };
            }
        }
        self.last_command = Some(now);
        outcome
    }

    /// Clears all measurements. The penalty is kept.
    pub fn reset(&mut self) {
        self.last_ready = None;
        self.average_delay.reset();
        self.average_command_delta.reset();
        self.commands_received = 0;
        self.state = TimerState::Initialized;
    }
}
