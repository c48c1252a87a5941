//! Tetromino definitions and shapes
//!
//! The 7 standard pieces, each stored as a square shape matrix that rotates
//! in place inside its bounding box.

use rand::Rng;
use serde::Serialize;

/// Largest bounding box of any piece (the I piece)
pub const MAX_SHAPE_SIZE: usize = 4;

/// The 7 tetromino types, numbered 1..=7 on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TetrominoType {
    I = 1,
    O = 2,
    T = 3,
    L = 4,
    J = 5,
    S = 6,
    Z = 7,
}

impl TetrominoType {
    /// Get all tetromino types in id order
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::L,
            TetrominoType::J,
            TetrominoType::S,
            TetrominoType::Z,
        ]
    }

    /// Board id for this type (never 0, which marks an empty cell)
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<TetrominoType> {
        Self::all().into_iter().find(|kind| kind.id() == id)
    }

    /// Pick one of the 7 types with equal probability
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> TetrominoType {
        let all = Self::all();
        all[rng.gen_range(0..all.len())]
    }

    /// Spawn orientation as rows of the bounding box, '#' = occupied
    fn pattern(self) -> &'static [&'static str] {
        match self {
            TetrominoType::I => &["....", "####", "....", "...."],
            TetrominoType::O => &["##", "##"],
            TetrominoType::T => &[".#.", "###", "..."],
            TetrominoType::L => &["..#", "###", "..."],
            TetrominoType::J => &["#..", "###", "..."],
            TetrominoType::S => &[".##", "##.", "..."],
            TetrominoType::Z => &["##.", ".##", "..."],
        }
    }
}

/// Direction for rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// An immutable piece value: a type plus its current shape matrix.
///
/// Equality is structural, so two pieces of the same type compare equal only
/// when they are also in the same orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tetromino {
    kind: TetrominoType,
    size: usize,
    cells: [[u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE],
}

impl Tetromino {
    /// Create a piece in its default orientation
    pub fn new(kind: TetrominoType) -> Self {
        let pattern = kind.pattern();
        let mut cells = [[0; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (row, line) in pattern.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch == '#' {
                    cells[row][col] = kind.id();
                }
            }
        }
        Self {
            kind,
            size: pattern.len(),
            cells,
        }
    }

    pub fn kind(&self) -> TetrominoType {
        self.kind
    }

    /// Side length of the square bounding box
    pub fn size(&self) -> usize {
        self.size
    }

    /// Shape value at (row, col) of the bounding box, 0 when empty or outside
    pub fn cell(&self, row: usize, col: usize) -> u8 {
        if row < self.size && col < self.size {
            self.cells[row][col]
        } else {
            0
        }
    }

    /// Offsets (row, col) of every occupied cell within the bounding box
    pub fn occupied(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.size).flat_map(move |row| {
            (0..self.size)
                .filter(move |&col| self.cells[row][col] != 0)
                .map(move |col| (row as i32, col as i32))
        })
    }

    /// Return this piece turned 90 degrees; the original is left untouched
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection) -> Self {
        let n = self.size;
        let mut cells = [[0; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for row in 0..n {
            for col in 0..n {
                let value = self.cells[row][col];
                match direction {
                    RotationDirection::Clockwise => cells[col][n - 1 - row] = value,
                    RotationDirection::CounterClockwise => cells[n - 1 - col][row] = value,
                }
            }
        }
        Self { cells, ..*self }
    }
}

impl From<TetrominoType> for Tetromino {
    fn from(kind: TetrominoType) -> Self {
        Tetromino::new(kind)
    }
}
