//! Error types for the maze layer.

use std::path::PathBuf;

/// Errors that can occur while loading or building a maze.
///
/// None of these stop a server from starting: the configuration layer falls
/// back to a random maze and logs the error as a warning.
#[derive(Debug, thiserror::Error)]
pub enum MazeError {
    /// The map file could not be read.
    #[error("cannot read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The map file exists but contains no rows or no columns.
    #[error("map file {0} is empty")]
    EmptyMap(PathBuf),

    /// No map file was configured for a mode that needs one.
    #[error("no map file configured")]
    NoMapFile,
}
