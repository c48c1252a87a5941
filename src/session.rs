//! Core game state and logic
//!
//! `GameSession` is a plain, synchronous state machine. It never sleeps or
//! spawns anything: the fall loop and the countdown live in
//! [`crate::runtime`], which calls [`GameSession::tick`] and
//! [`GameSession::countdown_tick`] on schedule. Every command is total:
//! calls made in the wrong state are ignored and report `false`/`None`.

use crate::board::{Board, Position, BOARD_HEIGHT, BOARD_WIDTH};
use crate::history::PieceHistory;
use crate::nback::{Declaration, Judgment, NBackJudge};
use crate::piece::{spawn_position, ActivePiece};
use crate::score::{Score, DEFAULT_FALL_INTERVAL};
use crate::spawner::{Spawner, DEFAULT_MATCH_BIAS};
use crate::tetromino::{RotationDirection, Tetromino};
use crate::timer::{Countdown, DEFAULT_GAME_DURATION};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameState {
    NotStarted,
    Running,
    Paused,
    GameOver,
}

/// Engine parameters fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub board_width: usize,
    pub board_height: usize,
    pub n_back_level: u32,
    pub game_duration: Duration,
    pub match_bias: f64,
    pub initial_fall_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            n_back_level: 1,
            game_duration: DEFAULT_GAME_DURATION,
            match_bias: DEFAULT_MATCH_BIAS,
            initial_fall_interval: DEFAULT_FALL_INTERVAL,
        }
    }
}

/// What a fall tick (or hard drop) did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing happened
    Ignored,
    /// The piece fell one row
    Moved,
    /// The piece locked and a new one spawned
    Locked { lines: usize, awarded: u64 },
    /// The piece locked but the next one could not be placed
    GameOver { lines: usize, awarded: u64 },
}

/// Read-only view of a session for renderers.
///
/// Derived values (display board, multiplier) are computed when the
/// snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: GameState,
    /// Locked cells with the falling piece drawn on top
    pub board: Board,
    pub current: Option<ActivePiece>,
    /// Where the falling piece would come to rest
    pub landing: Option<Position>,
    pub next: Option<Tetromino>,
    pub score: u64,
    pub lines: u32,
    pub pieces: u32,
    pub n_back_level: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub multiplier: f64,
    pub multiplier_text: String,
    pub judgment_made: bool,
    pub last_judgment: Option<Judgment>,
    pub correct_judgments: u32,
    pub incorrect_judgments: u32,
    pub time_remaining_secs: u64,
    pub time_remaining_text: String,
    pub time_running_low: bool,
    pub game_duration_secs: u64,
    pub fall_interval_ms: u64,
}

/// The main game struct
#[derive(Debug, Clone)]
pub struct GameSession {
    state: GameState,
    /// Locked cells only
    board: Board,
    current: Option<ActivePiece>,
    history: PieceHistory,
    spawner: Spawner,
    judge: NBackJudge,
    score: Score,
    countdown: Countdown,
    last_judgment: Option<Judgment>,
    correct_judgments: u32,
    incorrect_judgments: u32,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Create a session whose piece sequence is fixed by `seed`
    pub fn with_seed(config: SessionConfig, seed: u64) -> Self {
        Self {
            state: GameState::NotStarted,
            board: Board::empty(config.board_height, config.board_width),
            current: None,
            history: PieceHistory::new(),
            spawner: Spawner::with_seed(config.match_bias, seed),
            judge: NBackJudge::new(config.n_back_level),
            score: Score::new(config.initial_fall_interval),
            countdown: Countdown::new(config.game_duration),
            last_judgment: None,
            correct_judgments: 0,
            incorrect_judgments: 0,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == GameState::Running
    }

    /// Locked cells, without the falling piece
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Locked cells with the falling piece drawn on top
    pub fn display_board(&self) -> Board {
        match &self.current {
            Some(active) => self.board.with_piece(&active.tetromino, active.position),
            None => self.board.clone(),
        }
    }

    pub fn current_piece(&self) -> Option<&ActivePiece> {
        self.current.as_ref()
    }

    pub fn next_piece(&self) -> Option<&Tetromino> {
        self.spawner.peek()
    }

    pub fn history(&self) -> &PieceHistory {
        &self.history
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn n_back_level(&self) -> u32 {
        self.judge.level()
    }

    pub fn streak(&self) -> u32 {
        self.judge.streak()
    }

    pub fn multiplier(&self) -> f64 {
        self.judge.multiplier()
    }

    pub fn judgment_made(&self) -> bool {
        self.judge.judgment_made()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn fall_interval(&self) -> Duration {
        self.score.fall_interval()
    }

    pub fn game_duration(&self) -> Duration {
        self.countdown.limit()
    }

    /// Raise difficulty; only before a game
    pub fn increase_n_back_level(&mut self) -> bool {
        self.state == GameState::NotStarted && self.judge.increase_level()
    }

    /// Lower difficulty; only before a game
    pub fn decrease_n_back_level(&mut self) -> bool {
        self.state == GameState::NotStarted && self.judge.decrease_level()
    }

    pub fn increase_game_duration(&mut self) -> bool {
        self.state == GameState::NotStarted && self.countdown.increase()
    }

    pub fn decrease_game_duration(&mut self) -> bool {
        self.state == GameState::NotStarted && self.countdown.decrease()
    }

    /// Begin a fresh game. Everything except the chosen n-back level and
    /// game duration is reset. Ignored while already running.
    pub fn start(&mut self) -> bool {
        if self.state == GameState::Running {
            return false;
        }
        self.clear();
        self.state = GameState::Running;
        info!(
            n_back = self.judge.level(),
            duration_secs = self.countdown.limit().as_secs(),
            "game started"
        );

        if !self.spawn_piece() {
            self.game_over("no room for the first piece");
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != GameState::Running {
            return false;
        }
        self.state = GameState::Paused;
        debug!("paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != GameState::Paused {
            return false;
        }
        self.state = GameState::Running;
        debug!("resumed");
        true
    }

    /// Return to `NotStarted` from any state
    pub fn reset(&mut self) -> bool {
        self.clear();
        self.state = GameState::NotStarted;
        debug!("reset");
        true
    }

    fn clear(&mut self) {
        self.board = Board::empty(self.board.height(), self.board.width());
        self.current = None;
        self.history.clear();
        self.spawner.clear_buffer();
        self.judge.reset();
        self.score.reset();
        self.countdown.reset();
        self.last_judgment = None;
        self.correct_judgments = 0;
        self.incorrect_judgments = 0;
    }

    fn game_over(&mut self, reason: &str) {
        self.state = GameState::GameOver;
        info!(
            reason,
            score = self.score.points,
            lines = self.score.lines,
            best_streak = self.judge.best_streak(),
            "game over"
        );
    }

    /// Make the buffered piece current. Returns false when its start
    /// position is already blocked.
    fn spawn_piece(&mut self) -> bool {
        let tetromino = self
            .spawner
            .spawn_next(&mut self.history, self.judge.level() as usize);
        let active = ActivePiece::new(tetromino, spawn_position(self.board.width()));
        self.current = Some(active);
        self.judge.begin_piece();
        debug!(piece = ?tetromino.kind(), index = self.history.len() - 1, "spawned");
        active.is_valid(&self.board)
    }

    /// Fall loop body: drop one row, or lock, clear, score and spawn
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != GameState::Running {
            return TickOutcome::Ignored;
        }
        let Some(active) = &mut self.current else {
            return TickOutcome::Ignored;
        };
        if active.move_down(&self.board) {
            return TickOutcome::Moved;
        }
        self.lock_piece()
    }

    fn lock_piece(&mut self) -> TickOutcome {
        let Some(active) = self.current.take() else {
            return TickOutcome::Ignored;
        };

        // Unanswered pieces count as a "no match" call
        if !self.judge.judgment_made() {
            self.record_judgment(Declaration::NoMatch);
        }

        let (board, lines) = self
            .board
            .lock(&active.tetromino, active.position)
            .clear_filled_rows();
        self.board = board;
        let awarded = self.score.add_lock(lines, self.judge.multiplier_tenths());
        debug!(
            lines,
            awarded,
            total = self.score.points,
            fall_ms = self.score.fall_interval().as_millis() as u64,
            "locked"
        );

        if self.spawn_piece() {
            TickOutcome::Locked { lines, awarded }
        } else {
            self.game_over("board full");
            TickOutcome::GameOver { lines, awarded }
        }
    }

    fn with_active<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut ActivePiece, &Board) -> bool,
    {
        if self.state != GameState::Running {
            return false;
        }
        match &mut self.current {
            Some(active) => f(active, &self.board),
            None => false,
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.with_active(|active, board| active.move_left(board))
    }

    pub fn move_right(&mut self) -> bool {
        self.with_active(|active, board| active.move_right(board))
    }

    /// Rotate, wall-kicking sideways if the piece collides in place
    pub fn rotate(&mut self, direction: RotationDirection) -> bool {
        self.with_active(|active, board| active.rotate(direction, board))
    }

    /// One row down without locking; returns whether the piece moved
    pub fn soft_drop(&mut self) -> bool {
        self.with_active(|active, board| active.move_down(board))
    }

    /// Drop to the floor and lock immediately
    pub fn hard_drop(&mut self) -> TickOutcome {
        if !self.with_active(|active, board| {
            active.hard_drop(board);
            true
        }) {
            return TickOutcome::Ignored;
        }
        self.tick()
    }

    /// Player's n-back call for the current piece. `None` if not running or
    /// the piece was already judged.
    pub fn declare(&mut self, declaration: Declaration) -> Option<Judgment> {
        if self.state != GameState::Running {
            return None;
        }
        self.record_judgment(declaration)
    }

    pub fn declare_match(&mut self) -> Option<Judgment> {
        self.declare(Declaration::Match)
    }

    pub fn declare_no_match(&mut self) -> Option<Judgment> {
        self.declare(Declaration::NoMatch)
    }

    fn record_judgment(&mut self, declaration: Declaration) -> Option<Judgment> {
        let judgment = self.judge.declare(declaration, &self.history)?;
        if judgment.correct {
            self.correct_judgments += 1;
        } else {
            self.incorrect_judgments += 1;
        }
        self.last_judgment = Some(judgment);
        debug!(
            ?declaration,
            correct = judgment.correct,
            streak = self.judge.streak(),
            "judged"
        );
        Some(judgment)
    }

    /// One second of the countdown. Ends the game when time runs out.
    pub fn countdown_tick(&mut self) -> bool {
        if self.state != GameState::Running {
            return false;
        }
        if self.countdown.tick() {
            self.game_over("time up");
        }
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            board: self.display_board(),
            current: self.current,
            landing: self.landing_position(),
            next: self.spawner.peek().copied(),
            score: self.score.points,
            lines: self.score.lines,
            pieces: self.score.pieces,
            n_back_level: self.judge.level(),
            streak: self.judge.streak(),
            best_streak: self.judge.best_streak(),
            multiplier: self.judge.multiplier(),
            multiplier_text: self.judge.multiplier_text(),
            judgment_made: self.judge.judgment_made(),
            last_judgment: self.last_judgment,
            correct_judgments: self.correct_judgments,
            incorrect_judgments: self.incorrect_judgments,
            time_remaining_secs: self.countdown.remaining_secs(),
            time_remaining_text: self.countdown.format_remaining(),
            time_running_low: self.countdown.is_running_low(),
            game_duration_secs: self.countdown.limit().as_secs(),
            fall_interval_ms: self.score.fall_interval().as_millis() as u64,
        }
    }

    /// Where the current piece would come to rest
    pub fn landing_position(&self) -> Option<Position> {
        self.current.map(|mut active| {
            active.hard_drop(&self.board);
            active.position
        })
    }

    #[cfg(test)]
    pub(crate) fn score_mut(&mut self) -> &mut Score {
        &mut self.score
    }
}
