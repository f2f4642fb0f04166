//! Ranked walkable cells and the placement strategies built on them.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::StandardNormal;

use crate::grid::{Maze, PATH};

/// Scale of the Gaussian index for teleport destinations.
pub const TELEPORT_SIGMA: f64 = 0.2;
/// Scale of the Gaussian index for gem placement.
pub const GEM_SIGMA: f64 = 0.15;
/// Scale of the mirrored Gaussian index for trap placement.
pub const TRAP_SIGMA: f64 = 0.3;

/// A walkable cell and its number of walkable neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub neighbors: i32,
}

/// Where spectators "stand".
pub const SPECTATOR: Position = Position {
    x: -1,
    y: -1,
    neighbors: 0,
};

impl Position {
    pub fn coords(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy)]
enum Scan {
    Forward,
    Backward,
}

/// Every walkable cell, shuffled and then stably ordered by neighbour count
/// so that dead ends come first and junctions last.
///
/// The ranking is computed once; occupancy is checked against the maze on
/// every lookup.
#[derive(Debug, Clone)]
pub struct PositionProvider {
    ranked: Vec<Position>,
}

impl PositionProvider {
    pub fn new<R: Rng + ?Sized>(maze: &Maze, rng: &mut R) -> Self {
        let mut ranked = Vec::new();
        for y in 0..maze.height() as i32 {
            for x in 0..maze.width() as i32 {
                if maze.get(x, y) == PATH {
                    ranked.push(Position {
                        x,
                        y,
                        neighbors: maze.neighbor_count(x, y),
                    });
                }
            }
        }
        ranked.shuffle(rng);
        ranked.sort_by_key(|p| p.neighbors);
        Self { ranked }
    }

    pub fn walkable_count(&self) -> usize {
        self.ranked.len()
    }

    pub fn ranked(&self) -> &[Position] {
        &self.ranked
    }

    /// Uniformly chosen start, first free cell scanning forward.
    pub fn random_free<R: Rng + ?Sized>(&self, maze: &Maze, rng: &mut R) -> Option<Position> {
        if self.ranked.is_empty() {
            return None;
        }
        let start = rng.random_range(0..self.ranked.len());
        self.scan(maze, start, Scan::Forward)
    }

    /// Destination for a trap or collision teleport, biased to dead ends.
    pub fn for_teleport<R: Rng + ?Sized>(&self, maze: &Maze, rng: &mut R) -> Option<Position> {
        self.gaussian(maze, rng, TELEPORT_SIGMA, false)
    }

    /// Gem placement, strongly biased to dead ends.
    pub fn for_gem<R: Rng + ?Sized>(&self, maze: &Maze, rng: &mut R) -> Option<Position> {
        self.gaussian(maze, rng, GEM_SIGMA, false)
    }

    /// Trap placement, biased to junctions.
    pub fn for_trap<R: Rng + ?Sized>(&self, maze: &Maze, rng: &mut R) -> Option<Position> {
        self.gaussian(maze, rng, TRAP_SIGMA, true)
    }

    fn gaussian<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        rng: &mut R,
        sigma: f64,
        mirrored: bool,
    ) -> Option<Position> {
        let size = self.ranked.len();
        if size == 0 {
            return None;
        }
        let g = rng.sample::<f64, _>(StandardNormal).abs();
        let idx = ((g * size as f64 * sigma).floor() as usize) % size;
        if mirrored {
            self.scan(maze, size - 1 - idx, Scan::Backward)
        } else {
            self.scan(maze, idx, Scan::Forward)
        }
    }

    fn scan(&self, maze: &Maze, start: usize, direction: Scan) -> Option<Position> {
        let size = self.ranked.len() as i64;
        (0..size)
            .map(|i| {
                let idx = match direction {
                    Scan::Forward => start as i64 + i,
                    Scan::Backward => start as i64 - i,
                };
                self.ranked[idx.rem_euclid(size) as usize]
            })
            .find(|p| !maze.is_occupied(p.x, p.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn corridor() -> Maze {
        Maze::from_lines(&["#####", "#...#", "#.#.#", "#####"])
    }

    #[test]
    fn test_new_ranks_by_neighbor_count() {
        let maze = corridor();
        let provider = PositionProvider::new(&maze, &mut StdRng::seed_from_u64(1));
        assert_eq!(provider.walkable_count(), 5);
        let counts: Vec<i32> = provider.ranked().iter().map(|p| p.neighbors).collect();
        let mut sorted = counts.clone();
        sorted.sort();
        assert_eq!(counts, sorted);
        assert_eq!(counts.first(), Some(&1));
        assert_eq!(counts.last(), Some(&2));
    }

    #[test]
    fn test_random_free_skips_occupied_cells() {
        let maze = corridor();
        let provider = PositionProvider::new(&maze, &mut StdRng::seed_from_u64(2));
        for p in provider.ranked().iter().skip(1) {
            maze.occupy(p.x, p.y);
        }
        let free = provider.ranked()[0];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(provider.random_free(&maze, &mut rng), Some(free));
            assert_eq!(provider.for_trap(&maze, &mut rng), Some(free));
        }
    }

    #[test]
    fn test_sampling_full_maze_returns_none() {
        let maze = corridor();
        let provider = PositionProvider::new(&maze, &mut StdRng::seed_from_u64(4));
        for p in provider.ranked() {
            maze.occupy(p.x, p.y);
        }
        let mut rng = StdRng::seed_from_u64(5);
        assert!(provider.random_free(&maze, &mut rng).is_none());
        assert!(provider.for_teleport(&maze, &mut rng).is_none());
        assert!(provider.for_gem(&maze, &mut rng).is_none());
    }

    #[test]
    fn test_gaussian_sampling_biases_toward_rank_ends() {
        let mut lines = vec!["#".repeat(12)];
        lines.extend((0..10).map(|_| format!("#{}#", ".".repeat(10))));
        lines.push("#".repeat(12));
        let maze = Maze::from_lines(&lines);
        let mut rng = StdRng::seed_from_u64(6);
        let provider = PositionProvider::new(&maze, &mut rng);
        let size = provider.walkable_count();
        let rank = |p: Position| {
            provider
                .ranked()
                .iter()
                .position(|r| r.coords() == p.coords())
                .unwrap()
        };

        let mut low = 0;
        let mut high = 0;
        for _ in 0..200 {
            if rank(provider.for_teleport(&maze, &mut rng).unwrap()) < size / 2 {
                low += 1;
            }
            if rank(provider.for_trap(&maze, &mut rng).unwrap()) >= size / 2 {
                high += 1;
            }
        }
        assert!(low > 170, "teleports near dead ends: {low}");
        assert!(high > 150, "traps near junctions: {high}");
    }
}
