//! Baits: the collectible objects lying in the maze.

use std::time::Duration;

use mazegame_protocol::{BaitPositionChange, BaitType, Message, messages};
use rand::Rng;
use rand_distr::StandardNormal;
use tokio::time::Instant;

/// Mean time a hidden gem stays invisible.
pub const GEM_INVISIBLE_MEAN: Duration = Duration::from_millis(5_000);
/// Mean time a hidden trap stays invisible.
pub const TRAP_INVISIBLE_MEAN: Duration = Duration::from_millis(20_000);

const GEM_INVISIBLE_ABOVE: f64 = 0.85;
const TRAP_INVISIBLE_ABOVE: f64 = 0.5;
const INVISIBLE_SPREAD: f64 = 0.4;

/// A bait on a walkable cell.
#[derive(Debug, Clone)]
pub struct Bait {
    pub id: u64,
    pub bait_type: BaitType,
    pub x: i32,
    pub y: i32,
    visible: bool,
    reappear_at: Option<Instant>,
}

impl Bait {
    pub fn new(id: u64, bait_type: BaitType, x: i32, y: i32) -> Self {
        Self {
            id,
            bait_type,
            x,
            y,
            visible: true,
            reappear_at: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn coords(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Hides the bait until `offset` has passed.
    pub fn hide_for(&mut self, offset: Duration) {
        self.visible = false;
        self.reappear_at = Some(Instant::now() + offset);
    }

    pub fn reveal(&mut self) {
        self.visible = true;
        self.reappear_at = None;
    }

    /// Makes a hidden bait visible once its time has come. Returns `true`
    /// exactly once, on the call that reveals it.
    pub fn check_reappear(&mut self, now: Instant) -> bool {
        match self.reappear_at {
            Some(at) if !self.visible && now > at => {
                self.reveal();
                true
            }
            _ => false,
        }
    }

    /// Rolls whether a freshly generated bait starts hidden.
    pub(crate) fn roll_visibility<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (threshold, mean) = match self.bait_type {
            BaitType::Gem => (GEM_INVISIBLE_ABOVE, GEM_INVISIBLE_MEAN),
            BaitType::Trap => (TRAP_INVISIBLE_ABOVE, TRAP_INVISIBLE_MEAN),
            BaitType::Food | BaitType::Coffee => return,
        };
        if rng.random::<f64>() > threshold {
            self.hide_for(reappear_offset(rng, mean));
        }
    }

    pub fn appear_message(&self) -> Message {
        messages::bait_position(self.x, self.y, self.bait_type, BaitPositionChange::Generated)
    }

    pub fn vanish_message(&self) -> Message {
        messages::bait_position(self.x, self.y, self.bait_type, BaitPositionChange::Collected)
    }
}

/// `|mean + g * 0.4 * mean|` rounded to whole milliseconds, with `g` drawn
/// from N(0, 1).
pub fn reappear_offset<R: Rng + ?Sized>(rng: &mut R, mean: Duration) -> Duration {
    let mean = mean.as_millis() as f64;
    let offset = (mean + rng.sample::<f64, _>(StandardNormal) * INVISIBLE_SPREAD * mean).abs().round();
    Duration::from_millis(offset as u64)
}

/// Food 40 %, coffee 40 %, gem 10 %, trap 10 %.
pub fn roll_type<R: Rng + ?Sized>(rng: &mut R) -> BaitType {
    let roll = rng.random::<f64>();
    if roll < 0.4 {
        BaitType::Food
    } else if roll < 0.8 {
        BaitType::Coffee
    } else if roll < 0.9 {
        BaitType::Gem
    } else {
        BaitType::Trap
    }
}

/// Food 45 %, coffee 45 %, gem 10 %.
pub fn roll_type_without_trap<R: Rng + ?Sized>(rng: &mut R) -> BaitType {
    let roll = rng.random::<f64>();
    if roll < 0.45 {
        BaitType::Food
    } else if roll < 0.9 {
        BaitType::Coffee
    } else {
        BaitType::Gem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[tokio::test(start_paused = true)]
    async fn test_hidden_bait_reappears_once() {
        let mut bait = Bait::new(1, BaitType::Trap, 3, 4);
        bait.hide_for(Duration::from_millis(500));
        assert!(!bait.is_visible());
        assert!(!bait.check_reappear(Instant::now()));

        tokio::time::advance(Duration::from_millis(501)).await;
        assert!(bait.check_reappear(Instant::now()));
        assert!(bait.is_visible());
        assert!(!bait.check_reappear(Instant::now()));
    }

    #[test]
    fn test_visible_bait_never_reappears() {
        let mut bait = Bait::new(1, BaitType::Food, 0, 0);
        assert!(!bait.check_reappear(Instant::now()));
    }

    #[test]
    fn test_roll_without_trap_never_yields_trap() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            assert_ne!(roll_type_without_trap(&mut rng), BaitType::Trap);
        }
    }

    #[test]
    fn test_roll_type_distribution() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = [0usize; 4];
        for _ in 0..10_000 {
            let index = BaitType::ALL.iter().position(|t| *t == roll_type(&mut rng)).unwrap();
            counts[index] += 1;
        }
        // food, coffee, gem, trap
        assert!((3_600..4_400).contains(&counts[0]));
        assert!((3_600..4_400).contains(&counts[1]));
        assert!((800..1_200).contains(&counts[2]));
        assert!((800..1_200).contains(&counts[3]));
    }

    #[test]
    fn test_food_and_coffee_always_visible() {
        let mut rng = StdRng::seed_from_u64(3);
        for bait_type in [BaitType::Food, BaitType::Coffee] {
            for _ in 0..200 {
                let mut bait = Bait::new(0, bait_type, 1, 1);
                bait.roll_visibility(&mut rng);
                assert!(bait.is_visible());
            }
        }
    }

    #[test]
    fn test_reappear_offset_is_non_negative_and_near_mean() {
        let mut rng = StdRng::seed_from_u64(9);
        let total: u128 = (0..2_000)
            .map(|_| reappear_offset(&mut rng, TRAP_INVISIBLE_MEAN).as_millis())
            .sum();
        let mean = total / 2_000;
        assert!((18_000..22_000).contains(&mean), "mean was {mean}");
    }

    #[test]
    fn test_messages() {
        let bait = Bait::new(7, BaitType::Gem, 2, 5);
        assert_eq!(bait.appear_message().text, "BPOS;2;5;gem;app");
        assert_eq!(bait.vanish_message().text, "BPOS;2;5;gem;van");
    }
}
