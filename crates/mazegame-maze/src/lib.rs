//! Maze layer: the grid with its occupancy map, the wall-growth generator and
//! the ranked position sampler used for spawning, teleports and baits.

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

mod buffer;
pub mod config;
mod error;
mod generator;
mod grid;
pub mod position;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use buffer::RandomBuffer;
pub use config::{GeneratorMode, MazeConfig, build_maze, load_map_file};
pub use error::MazeError;
pub use generator::WallGenerator;
pub use grid::{Maze, OUTSIDE, PATH, POSSIBLE, UNKNOWN, WALL};
pub use position::{Position, PositionProvider, SPECTATOR};
