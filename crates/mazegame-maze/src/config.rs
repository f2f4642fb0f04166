//! Maze configuration and the generation entry point.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Maze, MazeError, WallGenerator};

pub const MIN_RANDOM_WIDTH: usize = 15;
pub const MAX_RANDOM_WIDTH: usize = 120;
pub const MIN_RANDOM_HEIGHT: usize = 15;
pub const MAX_RANDOM_HEIGHT: usize = 90;

// ---------------------------------------------------------------------------
// GeneratorMode
// ---------------------------------------------------------------------------

/// How the maze is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// A rectangle of the configured size.
    #[default]
    Random,
    /// Walls grown into a template read from the map file.
    Template,
    /// The map file taken as it is.
    Map,
}

// ---------------------------------------------------------------------------
// MazeConfig
// ---------------------------------------------------------------------------

/// Maze section of the server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    pub mode: GeneratorMode,
    pub width: usize,
    pub height: usize,
    pub map_file: Option<PathBuf>,
    pub template_fill_start_points: bool,
    /// Fixed seed for reproducible mazes.
    pub seed: Option<u64>,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Random,
            width: 40,
            height: 30,
            map_file: None,
            template_fill_start_points: false,
            seed: None,
        }
    }
}

impl MazeConfig {
    /// Clamp random-mode dimensions into the supported range.
    ///
    /// Template and map mazes keep their file's dimensions; [`build_maze`]
    /// only warns about those.
    pub fn validated(mut self) -> Self {
        let width = self.width.clamp(MIN_RANDOM_WIDTH, MAX_RANDOM_WIDTH);
        if width != self.width {
            warn!(field = "maze.width", value = self.width, clamped = width, "value out of range, clamping");
            self.width = width;
        }
        let height = self.height.clamp(MIN_RANDOM_HEIGHT, MAX_RANDOM_HEIGHT);
        if height != self.height {
            warn!(field = "maze.height", value = self.height, clamped = height, "value out of range, clamping");
            self.height = height;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Loading and building
// ---------------------------------------------------------------------------

/// Reads a map file in the `-#.?` text form.
pub fn load_map_file(path: &Path) -> Result<Maze, MazeError> {
    info!(path = %path.display(), "reading map file");
    let text = std::fs::read_to_string(path).map_err(|source| MazeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let lines: Vec<&str> = text.trim().lines().collect();
    let maze = Maze::from_lines(&lines);
    if maze.width() == 0 || maze.height() == 0 {
        return Err(MazeError::EmptyMap(path.to_path_buf()));
    }
    Ok(maze)
}

fn load_configured_map(config: &MazeConfig) -> Result<Maze, MazeError> {
    let path = config.map_file.as_deref().ok_or(MazeError::NoMapFile)?;
    load_map_file(path)
}

fn generate_random(config: &MazeConfig, generator: &mut WallGenerator) -> Maze {
    let width = config.width.clamp(MIN_RANDOM_WIDTH, MAX_RANDOM_WIDTH);
    let height = config.height.clamp(MIN_RANDOM_HEIGHT, MAX_RANDOM_HEIGHT);
    generator.generate(width, height)
}

fn check_dimensions(maze: &Maze) {
    if !(MIN_RANDOM_WIDTH..=MAX_RANDOM_WIDTH).contains(&maze.width())
        || !(MIN_RANDOM_HEIGHT..=MAX_RANDOM_HEIGHT).contains(&maze.height())
    {
        warn!(
            width = maze.width(),
            height = maze.height(),
            "maze dimensions are outside of recommended dimensions"
        );
    }
}

/// Produces the server's maze.
///
/// A template or map that cannot be loaded falls back to a random maze;
/// the failure is logged, never returned.
pub fn build_maze(config: &MazeConfig) -> Maze {
    let mut generator = WallGenerator::new(config.template_fill_start_points, config.seed);
    match config.mode {
        GeneratorMode::Random => generate_random(config, &mut generator),
        GeneratorMode::Template | GeneratorMode::Map => match load_configured_map(config) {
            Ok(map) => {
                let maze = if config.mode == GeneratorMode::Template {
                    generator.generate_into(map)
                } else {
                    map
                };
                check_dimensions(&maze);
                maze
            }
            Err(e) => {
                warn!(error = %e, "falling back to random generation");
                generate_random(config, &mut generator)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MazeConfig::default();
        assert_eq!(config.mode, GeneratorMode::Random);
        assert_eq!((config.width, config.height), (40, 30));
    }

    #[test]
    fn test_validated_clamps_dimensions() {
        let config = MazeConfig {
            width: 5,
            height: 500,
            ..Default::default()
        }
        .validated();
        assert_eq!((config.width, config.height), (MIN_RANDOM_WIDTH, MAX_RANDOM_HEIGHT));
    }

    #[test]
    fn test_generator_mode_serde_names() {
        let mode: GeneratorMode = serde_json::from_str("\"template\"").unwrap();
        assert_eq!(mode, GeneratorMode::Template);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: MazeConfig = serde_json::from_str(r#"{"width": 60}"#).unwrap();
        assert_eq!(config.width, 60);
        assert_eq!(config.height, 30);
        assert!(config.map_file.is_none());
    }
}
