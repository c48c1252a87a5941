//! Game board representation and collision detection
//!
//! Rows are numbered from the top (row 0) downward. Every operation that
//! changes the grid returns a fresh `Board`, so a snapshot handed to a reader
//! is never mutated behind its back.

use crate::tetromino::{Tetromino, TetrominoType};
use serde::Serialize;

/// Standard board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// A cell on the board - either empty or filled by a piece type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "u8")]
pub enum Cell {
    #[default]
    Empty,
    Filled(TetrominoType),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> u8 {
        match cell {
            Cell::Empty => 0,
            Cell::Filled(kind) => kind.id(),
        }
    }
}

/// Location of a piece's bounding-box origin on the board.
///
/// May point off the board while a placement is being tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    #[must_use]
    pub fn offset(self, rows: i32, cols: i32) -> Self {
        Self::new(self.row + rows, self.col + cols)
    }
}

/// The game board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    width: usize,
    height: usize,
    /// Row-major, `height * width` cells
    cells: Vec<Cell>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board of the standard size
    pub fn new() -> Self {
        Self::empty(BOARD_HEIGHT, BOARD_WIDTH)
    }

    /// Create an empty board with the given dimensions
    pub fn empty(height: usize, width: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, row: i32, col: i32) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(row * self.width + col)
    }

    /// Get the cell at (row, col), `None` if out of bounds
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width.max(1))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_filled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_empty())
    }

    /// Copy of this board with the given cells overwritten.
    /// Coordinates outside the grid are skipped.
    #[must_use]
    pub fn with_cells<I>(&self, updates: I) -> Board
    where
        I: IntoIterator<Item = (i32, i32, Cell)>,
    {
        let mut next = self.clone();
        for (row, col, cell) in updates {
            if let Some(idx) = next.index(row, col) {
                next.cells[idx] = cell;
            }
        }
        next
    }

    /// Absolute coordinates of a piece's occupied cells at `position`
    fn footprint(piece: &Tetromino, position: Position) -> impl Iterator<Item = (i32, i32)> + '_ {
        piece
            .occupied()
            .map(move |(dr, dc)| (position.row + dr, position.col + dc))
    }

    /// Check that every occupied cell of the piece lands inside the grid on
    /// an empty cell
    pub fn is_valid_position(&self, piece: &Tetromino, position: Position) -> bool {
        Self::footprint(piece, position)
            .all(|(row, col)| matches!(self.get(row, col), Some(Cell::Empty)))
    }

    /// Display copy with a floating piece drawn on top; cells that fall
    /// outside the grid are clipped
    #[must_use]
    pub fn with_piece(&self, piece: &Tetromino, position: Position) -> Board {
        let cell = Cell::Filled(piece.kind());
        self.with_cells(Self::footprint(piece, position).map(|(row, col)| (row, col, cell)))
    }

    /// Permanently commit a piece. Locked cells keep the piece's own type,
    /// so colors survive locking.
    #[must_use]
    pub fn lock(&self, piece: &Tetromino, position: Position) -> Board {
        self.with_piece(piece, position)
    }

    fn is_row_full(row: &[Cell]) -> bool {
        row.iter().all(|cell| cell.is_filled())
    }

    /// Remove every full row, shifting the rows above down and padding the
    /// top with empty rows. Returns the new board and the rows removed.
    #[must_use]
    pub fn clear_filled_rows(&self) -> (Board, usize) {
        let kept: Vec<&[Cell]> = self.rows().filter(|row| !Self::is_row_full(row)).collect();
        let cleared = self.height - kept.len();
        if cleared == 0 {
            return (self.clone(), 0);
        }

        let mut cells = vec![Cell::Empty; cleared * self.width];
        for row in kept {
            cells.extend_from_slice(row);
        }
        let board = Board {
            width: self.width,
            height: self.height,
            cells,
        };
        (board, cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(board: &Board, row: i32, kind: TetrominoType) -> Board {
        board.with_cells((0..board.width() as i32).map(|col| (row, col, Cell::Filled(kind))))
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.height(), BOARD_HEIGHT);
        assert_eq!(board.width(), BOARD_WIDTH);
    }

    #[test]
    fn test_out_of_bounds() {
        let board = Board::new();
        assert_eq!(board.get(-1, 0), None);
        assert_eq!(board.get(0, -1), None);
        assert_eq!(board.get(BOARD_HEIGHT as i32, 0), None);
        assert_eq!(board.get(0, BOARD_WIDTH as i32), None);
    }

    #[test]
    fn test_updates_do_not_alias() {
        let board = Board::new();
        let filled = board.with_cells([(3, 3, Cell::Filled(TetrominoType::T))]);
        assert!(board.is_empty());
        assert_eq!(filled.get(3, 3), Some(Cell::Filled(TetrominoType::T)));
    }

    #[test]
    fn test_piece_outside_bounds_is_invalid() {
        let board = Board::new();
        let piece = Tetromino::new(TetrominoType::O);
        assert!(board.is_valid_position(&piece, Position::new(0, 0)));
        assert!(!board.is_valid_position(&piece, Position::new(-1, 0)));
        assert!(!board.is_valid_position(&piece, Position::new(0, -1)));
        assert!(!board.is_valid_position(&piece, Position::new(19, 0)));
        assert!(!board.is_valid_position(&piece, Position::new(0, 9)));
    }

    #[test]
    fn test_empty_shape_rows_may_hang_off_board() {
        // The I piece's occupied row is row 1 of its 4x4 box, so the box
        // itself may extend past the bottom edge.
        let board = Board::new();
        let piece = Tetromino::new(TetrominoType::I);
        assert!(board.is_valid_position(&piece, Position::new(18, 0)));
        assert!(!board.is_valid_position(&piece, Position::new(19, 0)));
        assert!(board.is_valid_position(&piece, Position::new(-1, 0)));
    }

    #[test]
    fn test_locked_cells_block_placement() {
        let piece = Tetromino::new(TetrominoType::T);
        let position = Position::new(5, 3);
        let board = Board::new();
        assert!(board.is_valid_position(&piece, position));

        let locked = board.lock(&piece, position);
        assert!(!locked.is_valid_position(&piece, position));
        assert_eq!(locked.occupied_count(), 4);
        assert_eq!(locked.get(5, 4), Some(Cell::Filled(TetrominoType::T)));
    }

    #[test]
    fn test_with_piece_clips_and_leaves_source() {
        let board = Board::new();
        let piece = Tetromino::new(TetrominoType::O);
        let display = board.with_piece(&piece, Position::new(-1, 9));
        assert_eq!(display.occupied_count(), 1);
        assert_eq!(display.get(0, 9), Some(Cell::Filled(TetrominoType::O)));
        assert!(board.is_empty());
    }

    #[test]
    fn test_clear_without_full_rows_is_identity() {
        let board = Board::new().with_cells([(19, 0, Cell::Filled(TetrominoType::L))]);
        let (cleared, count) = board.clear_filled_rows();
        assert_eq!(count, 0);
        assert_eq!(cleared, board);
    }

    #[test]
    fn test_clear_single_row_shifts_above_down() {
        let board = fill_row(&Board::new(), 10, TetrominoType::I)
            .with_cells([(9, 2, Cell::Filled(TetrominoType::Z)), (11, 4, Cell::Filled(TetrominoType::J))]);
        let before = board.occupied_count();

        let (cleared, count) = board.clear_filled_rows();
        assert_eq!(count, 1);
        assert_eq!(cleared.occupied_count(), before - BOARD_WIDTH);
        // Row above the cleared one moved down by one
        assert_eq!(cleared.get(10, 2), Some(Cell::Filled(TetrominoType::Z)));
        assert_eq!(cleared.get(9, 2), Some(Cell::Empty));
        // Row below untouched
        assert_eq!(cleared.get(11, 4), Some(Cell::Filled(TetrominoType::J)));
        assert!(cleared.rows().next().is_some_and(|row| row.iter().all(Cell::is_empty)));
    }

    #[test]
    fn test_clear_non_adjacent_rows() {
        let board = fill_row(&fill_row(&Board::new(), 19, TetrominoType::S), 17, TetrominoType::T)
            .with_cells([(18, 0, Cell::Filled(TetrominoType::O)), (16, 1, Cell::Filled(TetrominoType::L))]);

        let (cleared, count) = board.clear_filled_rows();
        assert_eq!(count, 2);
        assert_eq!(cleared.occupied_count(), 2);
        assert_eq!(cleared.get(19, 0), Some(Cell::Filled(TetrominoType::O)));
        assert_eq!(cleared.get(18, 1), Some(Cell::Filled(TetrominoType::L)));
    }

    #[test]
    fn test_serializes_cells_as_type_ids() {
        let board = Board::empty(2, 3).with_cells([(1, 2, Cell::Filled(TetrominoType::Z))]);
        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(value["cells"], serde_json::json!([0, 0, 0, 0, 0, 7]));
        assert_eq!(value["width"], 3);
    }
}
