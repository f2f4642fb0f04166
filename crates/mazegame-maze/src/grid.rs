//! The maze grid: static cell kinds plus a lock-guarded occupancy bitmap.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mazegame_protocol::ViewDirection;

/// Never walkable, not even shown as wall.
pub const OUTSIDE: u8 = 0;
pub const WALL: u8 = 1;
pub const PATH: u8 = 2;
/// Generator-only marker: this cell may become a wall.
pub const POSSIBLE: u8 = 3;
/// Unrecognised character in a map file.
pub const UNKNOWN: u8 = 127;

/// A rectangular maze.
///
/// Cells are written only while the maze is generated; afterwards the grid
/// is read-only. The occupancy bitmap is the only mutable part and every
/// access to it goes through one mutex. Coordinates are `i32` so that
/// lookups one step off the edge need no special casing: anything out of
/// bounds reads as [`OUTSIDE`].
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    occupied: Mutex<Vec<u64>>,
}

impl Maze {
    /// A maze of the given size with every cell [`OUTSIDE`].
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            cells: vec![OUTSIDE; size],
            occupied: Mutex::new(vec![0; size.div_ceil(64)]),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width + x as usize)
    }

    /// The cell kind, [`OUTSIDE`] when out of bounds.
    pub fn get(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map_or(OUTSIDE, |i| self.cells[i])
    }

    /// Sets a cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = value;
        }
    }

    /// Fills the rectangle with its top left corner at `(x, y)`.
    pub fn fill(&mut self, x: i32, y: i32, width: i32, height: i32, value: u8) {
        for j in y..y + height {
            for i in x..x + width {
                self.set(i, j, value);
            }
        }
    }

    /// Draws the border of the rectangle with its top left corner at
    /// `(x, y)`.
    pub fn frame(&mut self, x: i32, y: i32, width: i32, height: i32, value: u8) {
        self.fill(x, y, width, 1, value);
        self.fill(x, y + 1, 1, height - 2, value);
        self.fill(x + width - 1, y + 1, 1, height - 2, value);
        self.fill(x, y + height - 1, width, 1, value);
    }

    /// `true` if the cell one step from `(x, y)` in `direction` is a path.
    pub fn is_walkable(&self, x: i32, y: i32, direction: ViewDirection) -> bool {
        let (dx, dy) = direction.delta();
        self.get(x + dx, y + dy) == PATH
    }

    /// Number of [`PATH`] cells among the four neighbours, or -1 if the
    /// cell itself is not a path.
    pub fn neighbor_count(&self, x: i32, y: i32) -> i32 {
        if self.get(x, y) != PATH {
            return -1;
        }
        ViewDirection::ALL
            .iter()
            .filter(|dir| self.is_walkable(x, y, **dir))
            .count() as i32
    }

    /// Number of [`PATH`] cells.
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == PATH).count()
    }

    /// Parses the text form (`-#.?`, one line per row). Short rows are
    /// padded with [`OUTSIDE`].
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let height = lines.len();
        let width = lines
            .iter()
            .map(|l| l.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let mut maze = Self::new(width, height);
        for (y, line) in lines.iter().enumerate() {
            for (x, c) in line.as_ref().chars().enumerate() {
                let value = match c {
                    '-' => OUTSIDE,
                    '#' => WALL,
                    '.' => PATH,
                    '?' => POSSIBLE,
                    _ => UNKNOWN,
                };
                maze.set(x as i32, y as i32, value);
            }
        }
        maze
    }

    /// The text form, one string per row. Any cell that is not outside,
    /// wall or path renders as `?`.
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.height as i32)
            .map(|y| {
                (0..self.width as i32)
                    .map(|x| match self.get(x, y) {
                        OUTSIDE => '-',
                        WALL => '#',
                        PATH => '.',
                        _ => '?',
                    })
                    .collect()
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Occupancy
    // -----------------------------------------------------------------------

    fn bits(&self) -> MutexGuard<'_, Vec<u64>> {
        // The bitmap holds plain bits; a panic elsewhere cannot leave it
        // half-written, so a poisoned lock is still usable.
        self.occupied.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_bit(bits: &mut [u64], index: usize, value: bool) {
        let (word, bit) = (index / 64, index % 64);
        if value {
            bits[word] |= 1u64 << bit;
        } else {
            bits[word] &= !(1u64 << bit);
        }
    }

    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        self.bits()[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn occupy(&self, x: i32, y: i32) {
        if let Some(index) = self.index(x, y) {
            Self::write_bit(&mut self.bits(), index, true);
        }
    }

    pub fn release(&self, x: i32, y: i32) {
        if let Some(index) = self.index(x, y) {
            Self::write_bit(&mut self.bits(), index, false);
        }
    }

    /// Releases `from` and occupies `to` under a single lock acquisition.
    pub fn move_occupant(&self, from: (i32, i32), to: (i32, i32)) {
        let mut bits = self.bits();
        if let Some(index) = self.index(from.0, from.1) {
            Self::write_bit(&mut bits, index, false);
        }
        if let Some(index) = self.index(to.0, to.1) {
            Self::write_bit(&mut bits, index, true);
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.bits().iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lines().join("\n"))
    }
}

impl fmt::Debug for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Maze")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("occupied", &self.occupied_count())
            .finish()
    }
}
