//! Piece generation with an n-back match bias
//!
//! Plain uniform draws only produce an n-back match about one time in
//! seven. With probability `match_bias` the next piece is instead copied from
//! the piece that would make it a true match at the current level.

use crate::history::PieceHistory;
use crate::tetromino::{Tetromino, TetrominoType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Default chance that the buffered next piece is chosen to be a match
pub const DEFAULT_MATCH_BIAS: f64 = 0.15;

/// Keep the probability usable by `Rng::gen_bool`
fn sanitize_bias(bias: f64) -> f64 {
    if bias.is_nan() {
        DEFAULT_MATCH_BIAS
    } else {
        bias.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Spawner {
    rng: ChaCha8Rng,
    /// Buffered piece shown as "next"
    next: Option<Tetromino>,
    match_bias: f64,
}

impl Spawner {
    pub fn new(match_bias: f64) -> Self {
        Self::with_seed(match_bias, rand::random())
    }

    pub fn with_seed(match_bias: f64, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            next: None,
            match_bias: sanitize_bias(match_bias),
        }
    }

    /// Forget the buffered piece so the next spawn starts a new sequence
    pub fn clear_buffer(&mut self) {
        self.next = None;
    }

    pub fn match_bias(&self) -> f64 {
        self.match_bias
    }

    /// Preview of the piece the next spawn will produce
    pub fn peek(&self) -> Option<&Tetromino> {
        self.next.as_ref()
    }

    /// Fresh piece of a uniformly chosen type in its default orientation
    pub fn generate_random(&mut self) -> Tetromino {
        Tetromino::new(TetrominoType::random(&mut self.rng))
    }

    /// Hand out the buffered piece (or a random one on the first spawn),
    /// record it in `history`, and refill the buffer.
    pub fn spawn_next(&mut self, history: &mut PieceHistory, n_back_level: usize) -> Tetromino {
        let current = match self.next.take() {
            Some(piece) => piece,
            None => self.generate_random(),
        };
        history.push(current);

        let next = if self.rng.gen_bool(self.match_bias) {
            self.match_candidate(history, n_back_level)
        } else {
            self.generate_random()
        };
        self.next = Some(next);

        current
    }

    /// The piece that will sit `n_back_level` steps before the buffered one.
    ///
    /// The buffered piece lands at index `history.len()`, so its n-back
    /// partner is `back(n_back_level - 1)`; at level 1 that is the piece just
    /// spawned.
    fn match_candidate(&mut self, history: &PieceHistory, n_back_level: usize) -> Tetromino {
        let steps = n_back_level.max(1) - 1;
        match history.back(steps) {
            Some(piece) => Tetromino::new(piece.kind()),
            None => self.generate_random(),
        }
    }
}
