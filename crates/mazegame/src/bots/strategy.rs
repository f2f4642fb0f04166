//! Move choice for the built-in bots.

use mazegame_protocol::{BaitType, TurnDirection, ViewDirection};
use rand::Rng;
use rand::rngs::StdRng;

use super::view::BotView;

/// A frenzy bot turns frenzied when a bait is at most this many steps away.
const FRENZY_DISTANCE: usize = 10;

/// Chance that a walker keeps going straight when it could.
const STRAIGHT_ON: f64 = 0.8;

/// One move, answered to `RDY.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMove {
    Step,
    Turn(TurnDirection),
}

impl BotMove {
    pub fn line(self) -> String {
        match self {
            Self::Step => String::from("STEP"),
            Self::Turn(direction) => format!("TURN;{}", direction.short_name()),
        }
    }
}

/// Picks the next move from what the bot has seen so far.
pub trait Strategy: Send + 'static {
    fn next_move(&mut self, view: &BotView, rng: &mut StdRng) -> BotMove;

    /// Polled after every move. Only the frenzy bot ever says yes.
    fn special_mode(&self, _view: &BotView) -> bool {
        false
    }
}

/// Wanders around without walking into walls or players.
#[derive(Debug, Default)]
pub struct RandomWalker;

impl Strategy for RandomWalker {
    fn next_move(&mut self, view: &BotView, rng: &mut StdRng) -> BotMove {
        wander(view, rng)
    }
}

fn wander(view: &BotView, rng: &mut StdRng) -> BotMove {
    let (Some(position), Some(facing)) = (view.position, view.direction) else {
        return BotMove::Turn(TurnDirection::Right);
    };
    if view.can_step(position, facing) && rng.random::<f64>() < STRAIGHT_ON {
        return BotMove::Step;
    }
    let left = view.can_step(position, facing.turn_left());
    let right = view.can_step(position, facing.turn_right());
    match (left, right) {
        (true, false) => BotMove::Turn(TurnDirection::Left),
        (false, true) => BotMove::Turn(TurnDirection::Right),
        _ if view.can_step(position, facing) => BotMove::Step,
        _ if rng.random::<bool>() => BotMove::Turn(TurnDirection::Left),
        _ => BotMove::Turn(TurnDirection::Right),
    }
}

/// The turn that gets from `facing` closest to `target`.
fn turn_towards(facing: ViewDirection, target: ViewDirection) -> BotMove {
    if facing == target {
        BotMove::Step
    } else if facing.turn_left() == target {
        BotMove::Turn(TurnDirection::Left)
    } else {
        BotMove::Turn(TurnDirection::Right)
    }
}

/// Heads for the nearest bait it wants and wanders when there is none.
pub struct Greedy {
    wanted: fn(BaitType) -> bool,
    avoid: fn(BaitType) -> bool,
    frenzy: bool,
}

impl Greedy {
    /// Eats traps and nothing else.
    pub fn trapeater() -> Self {
        Self {
            wanted: |t| t == BaitType::Trap,
            avoid: |_| false,
            frenzy: false,
        }
    }

    /// Eats everything but traps, and goes into frenzy mode when food is
    /// close.
    pub fn frenzy() -> Self {
        Self {
            wanted: |t| t != BaitType::Trap,
            avoid: |t| t == BaitType::Trap,
            frenzy: true,
        }
    }
}

impl Strategy for Greedy {
    fn next_move(&mut self, view: &BotView, rng: &mut StdRng) -> BotMove {
        match (view.direction, view.nearest_bait(self.wanted, self.avoid)) {
            (Some(facing), Some((target, _))) => turn_towards(facing, target),
            _ => wander(view, rng),
        }
    }

    fn special_mode(&self, view: &BotView) -> bool {
        self.frenzy
            && view
                .nearest_bait(self.wanted, self.avoid)
                .is_some_and(|(_, distance)| distance <= FRENZY_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use mazegame_protocol::{MazeData, PlayerId, ServerMessage};
    use rand::SeedableRng;

    use super::*;

    fn view(rows: &[&str], own: &str) -> BotView {
        let mut view = BotView::default();
        view.set_maze(&MazeData {
            width: rows[0].len(),
            height: rows.len(),
            rows: rows.iter().map(|r| r.to_string()).collect(),
        });
        view.apply(&ServerMessage::Welcome(PlayerId(1)));
        view.apply(&ServerMessage::decode(own).unwrap());
        view
    }

    const CORRIDOR: [&str; 3] = ["#######", "#.....#", "#######"];

    #[test]
    fn test_bot_move_lines() {
        assert_eq!(BotMove::Step.line(), "STEP");
        assert_eq!(BotMove::Turn(TurnDirection::Left).line(), "TURN;l");
    }

    #[test]
    fn test_walker_never_steps_into_wall() {
        let view = view(&CORRIDOR, "PPOS;1;1;1;n;app");
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_ne!(RandomWalker.next_move(&view, &mut rng), BotMove::Step);
        }
    }

    #[test]
    fn test_walker_turns_into_open_side() {
        let view = view(&CORRIDOR, "PPOS;1;1;1;n;app");
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            RandomWalker.next_move(&view, &mut rng),
            BotMove::Turn(TurnDirection::Right)
        );
    }

    #[test]
    fn test_trapeater_heads_for_trap() {
        let mut view = view(&CORRIDOR, "PPOS;1;3;1;s;app");
        view.apply(&ServerMessage::decode("BPOS;1;1;food;app").unwrap());
        view.apply(&ServerMessage::decode("BPOS;5;1;trap;app").unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let mut bot = Greedy::trapeater();
        assert_eq!(bot.next_move(&view, &mut rng), BotMove::Turn(TurnDirection::Left));
        assert!(!bot.special_mode(&view));
    }

    #[test]
    fn test_frenzy_steps_towards_food_and_turns_special() {
        let mut view = view(&CORRIDOR, "PPOS;1;3;1;w;app");
        view.apply(&ServerMessage::decode("BPOS;1;1;coffee;app").unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let mut bot = Greedy::frenzy();
        assert_eq!(bot.next_move(&view, &mut rng), BotMove::Step);
        assert!(bot.special_mode(&view));
    }

    #[test]
    fn test_frenzy_calm_without_baits() {
        let view = view(&CORRIDOR, "PPOS;1;3;1;w;app");
        assert!(!Greedy::frenzy().special_mode(&view));
    }
}
