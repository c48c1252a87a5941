//! NBACKTRIS - falling blocks with an n-back memory drill
//!
//! While pieces fall, the player also calls whether the current piece is the
//! same type as the one spawned `n` pieces earlier. Correct calls build a
//! streak that multiplies every score.

pub mod board;
pub mod history;
pub mod nback;
pub mod piece;
pub mod runtime;
pub mod score;
pub mod session;
pub mod settings;
pub mod spawner;
pub mod tetromino;
pub mod timer;

pub use board::{Board, Cell, Position};
pub use nback::{Declaration, Judgment};
pub use runtime::{Command, SessionClosed, SessionHandle};
pub use session::{GameSession, GameState, SessionConfig, SessionSnapshot, TickOutcome};
pub use settings::Settings;
pub use tetromino::{RotationDirection, Tetromino, TetrominoType};
