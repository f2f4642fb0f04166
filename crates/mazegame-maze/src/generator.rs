//! Randomised wall-growth maze generator.
//!
//! Walls grow outward from a sparse set of seed cells. A cell marked
//! [`POSSIBLE`] may become a wall; after each conversion the generator looks
//! two cells ahead in every axis direction and marks the next candidate only
//! if that keeps a corridor of at least one cell between walls. Because a
//! wall never closes a corridor, every path cell stays reachable.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::RandomBuffer;
use crate::grid::{Maze, OUTSIDE, PATH, POSSIBLE, WALL};

/// Generates mazes from a seeded random source.
pub struct WallGenerator {
    rng: StdRng,
    template_fill_start_points: bool,
}

impl WallGenerator {
    /// With `seed == None` the generator is seeded from the OS.
    ///
    /// `template_fill_start_points` adds random seed cells even when a
    /// template already brought its own.
    pub fn new(template_fill_start_points: bool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            template_fill_start_points,
        }
    }

    /// Builds a rectangular maze: outside cells, a wall frame, a path
    /// interior, then wall growth.
    pub fn generate(&mut self, width: usize, height: usize) -> Maze {
        let (w, h) = (width as i32, height as i32);
        let mut maze = Maze::new(width, height);
        maze.fill(0, 0, w, h, OUTSIDE);
        maze.fill(1, 1, w - 2, h - 2, PATH);
        maze.frame(0, 0, w, h, WALL);
        self.generate_into(maze)
    }

    /// Grows walls into a prepared template. Borders and [`OUTSIDE`] areas
    /// must already be in place; [`POSSIBLE`] cells act as seeds.
    pub fn generate_into(&mut self, mut maze: Maze) -> Maze {
        let (w, h) = (maze.width() as i32, maze.height() as i32);
        let mut potential_walls = RandomBuffer::new();

        for y in 0..h {
            for x in 0..w {
                if maze.get(x, y) == POSSIBLE {
                    potential_walls.push((x, y));
                }
            }
        }

        if potential_walls.is_empty() || self.template_fill_start_points {
            let mut start_candidates = RandomBuffer::new();
            for y in 0..h {
                for x in 0..w {
                    if maze.get(x, y) == PATH && all_neighbors_are_path(&maze, x, y) {
                        start_candidates.push((x, y));
                    }
                }
            }
            // About 5 % of the open cells seed a wall.
            let wanted = (start_candidates.len() / 20).saturating_sub(potential_walls.len());
            for _ in 0..wanted {
                if let Some((x, y)) = start_candidates.next(&mut self.rng) {
                    maze.set(x, y, POSSIBLE);
                    potential_walls.push((x, y));
                }
            }
        }
        debug!(seeds = potential_walls.len(), "growing walls");

        while let Some((x, y)) = potential_walls.next(&mut self.rng) {
            if maze.get(x, y) != POSSIBLE {
                continue;
            }
            maze.set(x, y, WALL);

            for iy in y - 1..=y + 1 {
                for ix in x - 1..=x + 1 {
                    if is_valid(&maze, ix, iy) && maze.get(ix, iy) == POSSIBLE {
                        maze.set(ix, iy, PATH);
                    }
                }
            }

            for iy in y - 1..=y + 1 {
                for ix in x - 1..=x + 1 {
                    if is_valid(&maze, ix, iy) && maze.get(ix, iy) == WALL {
                        for (dx, dy) in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
                            mark_potential_wall(&mut maze, &mut potential_walls, ix, iy, dx, dy);
                        }
                    }
                }
            }
        }
        maze
    }
}

/// Strictly inside the border and not [`OUTSIDE`].
fn is_valid(maze: &Maze, x: i32, y: i32) -> bool {
    x > 0
        && x < maze.width() as i32 - 1
        && y > 0
        && y < maze.height() as i32 - 1
        && maze.get(x, y) != OUTSIDE
}

fn all_neighbors_are_path(maze: &Maze, x: i32, y: i32) -> bool {
    (y - 1..=y + 1).all(|iy| (x - 1..=x + 1).all(|ix| is_valid(maze, ix, iy) && maze.get(ix, iy) == PATH))
}

/// A cell and both of its sides (relative to the direction) are free of
/// walls.
fn lane_is_open(maze: &Maze, x: i32, y: i32, dx: i32, dy: i32) -> bool {
    maze.get(x, y) != WALL && maze.get(x - dy, y - dx) != WALL && maze.get(x + dy, y + dx) != WALL
}

/// Marks `(x + dx, y + dy)` as a wall candidate if the cell and the one
/// after it are both inside and open.
fn mark_potential_wall(
    maze: &mut Maze,
    potential_walls: &mut RandomBuffer<(i32, i32)>,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
) {
    if !is_valid(maze, x, y)
        || !is_valid(maze, x + dx, y + dy)
        || !is_valid(maze, x + 2 * dx, y + 2 * dy)
    {
        return;
    }
    let (nx, ny) = (x + dx, y + dy);
    if maze.get(nx, ny) == POSSIBLE {
        return;
    }
    if !lane_is_open(maze, nx, ny, dx, dy) || !lane_is_open(maze, nx + dx, ny + dy, dx, dy) {
        return;
    }
    maze.set(nx, ny, POSSIBLE);
    potential_walls.push((nx, ny));
}
