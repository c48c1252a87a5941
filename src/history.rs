//! Append-only record of every piece spawned in a session

use crate::tetromino::{Tetromino, TetrominoType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceHistory {
    pieces: Vec<Tetromino>,
}

impl PieceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, piece: Tetromino) {
        self.pieces.push(piece);
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Only called on session reset
    pub fn clear(&mut self) {
        self.pieces.clear();
    }

    /// Most recently spawned piece
    pub fn latest(&self) -> Option<&Tetromino> {
        self.pieces.last()
    }

    /// The piece `steps` entries before the latest one.
    ///
    /// `back(0)` is the latest piece; `None` when the history is too short.
    pub fn back(&self, steps: usize) -> Option<&Tetromino> {
        let last = self.pieces.len().checked_sub(1)?;
        let index = last.checked_sub(steps)?;
        self.pieces.get(index)
    }

    pub fn kinds(&self) -> impl Iterator<Item = TetrominoType> + '_ {
        self.pieces.iter().map(Tetromino::kind)
    }
}
