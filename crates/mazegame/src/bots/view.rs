//! What a bot knows about the game, rebuilt from the lines it receives.

use std::collections::{BTreeMap, VecDeque};

use mazegame_maze::Maze;
use mazegame_protocol::{
    BaitPositionChange, BaitType, MazeData, PlayerId, PositionChangeReason, ServerMessage,
    ViewDirection,
};

/// A bot's picture of the maze, its own player, the others and the baits.
#[derive(Default)]
pub struct BotView {
    pub maze: Option<Maze>,
    pub id: Option<PlayerId>,
    pub position: Option<(i32, i32)>,
    pub direction: Option<ViewDirection>,
    pub players: BTreeMap<PlayerId, (i32, i32)>,
    pub baits: BTreeMap<(i32, i32), BaitType>,
}

impl BotView {
    pub fn set_maze(&mut self, data: &MazeData) {
        self.maze = Some(Maze::from_lines(&data.rows));
    }

    /// Applies one server message. Anything irrelevant is ignored.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Welcome(id) => self.id = Some(*id),
            ServerMessage::PlayerPosition {
                id,
                x,
                y,
                direction,
                reason,
                ..
            } => {
                if *reason == PositionChangeReason::Vanish {
                    self.players.remove(id);
                } else {
                    self.players.insert(*id, (*x, *y));
                }
                if Some(*id) == self.id {
                    self.position = Some((*x, *y));
                    self.direction = Some(*direction);
                }
            }
            ServerMessage::Leave(id) => {
                self.players.remove(id);
            }
            ServerMessage::BaitPosition {
                x,
                y,
                bait_type,
                change,
            } => match change {
                BaitPositionChange::Generated => {
                    self.baits.insert((*x, *y), *bait_type);
                }
                BaitPositionChange::Collected => {
                    self.baits.remove(&(*x, *y));
                }
            },
            _ => {}
        }
    }

    /// `true` when a step in `direction` from `from` leads onto a path
    /// cell that no other player stands on.
    pub fn can_step(&self, from: (i32, i32), direction: ViewDirection) -> bool {
        let Some(maze) = self.maze.as_ref() else {
            return false;
        };
        if !maze.is_walkable(from.0, from.1, direction) {
            return false;
        }
        let (dx, dy) = direction.delta();
        let to = (from.0 + dx, from.1 + dy);
        !self
            .players
            .iter()
            .any(|(id, at)| Some(*id) != self.id && *at == to)
    }

    /// Breadth-first search from the bot's cell to the nearest bait that
    /// `wanted` accepts. Cells holding a bait that `avoid` rejects are not
    /// entered.
    ///
    /// Returns the first direction to go and the distance in steps.
    pub fn nearest_bait(
        &self,
        wanted: impl Fn(BaitType) -> bool,
        avoid: impl Fn(BaitType) -> bool,
    ) -> Option<(ViewDirection, usize)> {
        let start = self.position?;
        let mut first: BTreeMap<(i32, i32), (ViewDirection, usize)> = BTreeMap::new();
        let mut queue = VecDeque::new();
        for direction in ViewDirection::ALL {
            if let Some(next) = self.neighbor(start, direction, &avoid) {
                if !first.contains_key(&next) {
                    first.insert(next, (direction, 1));
                    queue.push_back(next);
                }
            }
        }
        while let Some(cell) = queue.pop_front() {
            let (direction, distance) = first[&cell];
            if self.baits.get(&cell).is_some_and(|&t| wanted(t)) {
                return Some((direction, distance));
            }
            for step in ViewDirection::ALL {
                if let Some(next) = self.neighbor(cell, step, &avoid) {
                    if next != start && !first.contains_key(&next) {
                        first.insert(next, (direction, distance + 1));
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    fn neighbor(
        &self,
        from: (i32, i32),
        direction: ViewDirection,
        avoid: &impl Fn(BaitType) -> bool,
    ) -> Option<(i32, i32)> {
        if !self.can_step(from, direction) {
            return None;
        }
        let (dx, dy) = direction.delta();
        let next = (from.0 + dx, from.1 + dy);
        if self.baits.get(&next).is_some_and(|&t| avoid(t)) {
            return None;
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORRIDOR: [&str; 3] = ["#######", "#.....#", "#######"];

    fn view() -> BotView {
        let mut view = BotView::default();
        view.set_maze(&MazeData {
            width: 7,
            height: 3,
            rows: CORRIDOR.map(String::from).to_vec(),
        });
        view.apply(&ServerMessage::Welcome(PlayerId(1)));
        view.apply(&ServerMessage::decode("PPOS;1;1;1;w;app").unwrap());
        view
    }

    #[test]
    fn test_apply_tracks_own_position() {
        let view = view();
        assert_eq!(view.position, Some((1, 1)));
        assert_eq!(view.direction, Some(ViewDirection::West));
    }

    #[test]
    fn test_apply_tracks_baits() {
        let mut view = view();
        view.apply(&ServerMessage::decode("BPOS;4;1;gem;app").unwrap());
        assert_eq!(view.baits.get(&(4, 1)), Some(&BaitType::Gem));
        view.apply(&ServerMessage::decode("BPOS;4;1;gem;van").unwrap());
        assert!(view.baits.is_empty());
    }

    #[test]
    fn test_can_step_blocks_walls_and_players() {
        let mut view = view();
        assert!(!view.can_step((1, 1), ViewDirection::West));
        assert!(view.can_step((1, 1), ViewDirection::East));
        view.apply(&ServerMessage::decode("PPOS;2;2;1;n;app").unwrap());
        assert!(!view.can_step((1, 1), ViewDirection::East));
        view.apply(&ServerMessage::Leave(PlayerId(2)));
        assert!(view.can_step((1, 1), ViewDirection::East));
    }

    #[test]
    fn test_nearest_bait_finds_direction_and_distance() {
        let mut view = view();
        view.apply(&ServerMessage::decode("BPOS;4;1;food;app").unwrap());
        let found = view.nearest_bait(|t| t == BaitType::Food, |_| false);
        assert_eq!(found, Some((ViewDirection::East, 3)));
    }

    #[test]
    fn test_nearest_bait_does_not_cross_avoided_baits() {
        let mut view = view();
        view.apply(&ServerMessage::decode("BPOS;2;1;trap;app").unwrap());
        view.apply(&ServerMessage::decode("BPOS;4;1;food;app").unwrap());
        let found = view.nearest_bait(|t| t != BaitType::Trap, |t| t == BaitType::Trap);
        assert_eq!(found, None);
    }
}
