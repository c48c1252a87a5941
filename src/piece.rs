//! Active falling piece logic

use crate::board::{Board, Position};
use crate::tetromino::{RotationDirection, Tetromino};
use serde::Serialize;

/// Column offsets tried, in order, when a rotation collides in place
pub const WALL_KICKS: [i32; 4] = [-1, 1, -2, 2];

/// Where new pieces appear: top row, bounding box left of center
pub fn spawn_position(board_width: usize) -> Position {
    Position::new(0, board_width as i32 / 2 - 2)
}

/// An active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivePiece {
    pub tetromino: Tetromino,
    pub position: Position,
}

impl ActivePiece {
    pub fn new(tetromino: Tetromino, position: Position) -> Self {
        Self {
            tetromino,
            position,
        }
    }

    pub fn is_valid(&self, board: &Board) -> bool {
        board.is_valid_position(&self.tetromino, self.position)
    }

    /// Move by the given offset if the target is free; returns true on success
    fn shift(&mut self, board: &Board, rows: i32, cols: i32) -> bool {
        let target = self.position.offset(rows, cols);
        if board.is_valid_position(&self.tetromino, target) {
            self.position = target;
            true
        } else {
            false
        }
    }

    /// Try to move left, returns true if successful
    pub fn move_left(&mut self, board: &Board) -> bool {
        self.shift(board, 0, -1)
    }

    /// Try to move right, returns true if successful
    pub fn move_right(&mut self, board: &Board) -> bool {
        self.shift(board, 0, 1)
    }

    /// Try to move down one row, returns true if successful
    pub fn move_down(&mut self, board: &Board) -> bool {
        self.shift(board, 1, 0)
    }

    /// Try to rotate in place, then at each wall-kick offset.
    /// On failure the piece is left exactly as it was.
    pub fn rotate(&mut self, direction: RotationDirection, board: &Board) -> bool {
        let rotated = self.tetromino.rotated(direction);
        let candidates = std::iter::once(0).chain(WALL_KICKS);

        for kick in candidates {
            let target = self.position.offset(0, kick);
            if board.is_valid_position(&rotated, target) {
                self.tetromino = rotated;
                self.position = target;
                return true;
            }
        }
        false
    }

    /// Hard drop - move down as far as possible and return distance dropped
    pub fn hard_drop(&mut self, board: &Board) -> u32 {
        let mut distance = 0;
        while self.move_down(board) {
            distance += 1;
        }
        distance
    }
}
