//! N-back judgment: did the player correctly call whether the current piece
//! matches the one spawned `level` pieces earlier?

use crate::history::PieceHistory;
use serde::Serialize;

pub const MIN_N_BACK_LEVEL: u32 = 1;
pub const MAX_N_BACK_LEVEL: u32 = 15;

/// What the player claimed about the current piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Declaration {
    Match,
    NoMatch,
}

/// Outcome of one declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Judgment {
    pub declaration: Declaration,
    pub correct: bool,
}

/// Tracks level, streak and whether the current piece was already judged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NBackJudge {
    level: u32,
    streak: u32,
    best_streak: u32,
    judgment_made: bool,
}

impl Default for NBackJudge {
    fn default() -> Self {
        Self::new(MIN_N_BACK_LEVEL)
    }
}

impl NBackJudge {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(MIN_N_BACK_LEVEL, MAX_N_BACK_LEVEL),
            streak: 0,
            best_streak: 0,
            judgment_made: false,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn judgment_made(&self) -> bool {
        self.judgment_made
    }

    /// Returns true if the level changed
    pub fn increase_level(&mut self) -> bool {
        if self.level < MAX_N_BACK_LEVEL {
            self.level += 1;
            true
        } else {
            false
        }
    }

    /// Returns true if the level changed
    pub fn decrease_level(&mut self) -> bool {
        if self.level > MIN_N_BACK_LEVEL {
            self.level -= 1;
            true
        } else {
            false
        }
    }

    /// Multiplier in tenths: `10 + streak * level * 2`, i.e.
    /// `1 + streak * level * 2 * 0.1`. Kept integral so scoring is exact.
    pub fn multiplier_tenths(&self) -> u64 {
        10 + u64::from(self.streak) * u64::from(self.level) * 2
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths() as f64 / 10.0
    }

    /// Display form such as `x1.4`
    pub fn multiplier_text(&self) -> String {
        let tenths = self.multiplier_tenths();
        format!("x{}.{}", tenths / 10, tenths % 10)
    }

    /// A new piece is in play; it may be judged once
    pub fn begin_piece(&mut self) {
        self.judgment_made = false;
    }

    /// Clear streak and per-piece state, keeping the level
    pub fn reset(&mut self) {
        self.streak = 0;
        self.best_streak = 0;
        self.judgment_made = false;
    }

    /// Judge a declaration about the latest piece in `history`.
    ///
    /// Returns `None` without touching any state if this piece was already
    /// judged. While fewer than `level + 1` pieces exist no match is
    /// possible, so only `NoMatch` is correct.
    pub fn declare(&mut self, declaration: Declaration, history: &PieceHistory) -> Option<Judgment> {
        if self.judgment_made {
            return None;
        }

        let is_match = match (history.latest(), history.back(self.level as usize)) {
            (Some(current), Some(earlier)) => current.kind() == earlier.kind(),
            _ => false,
        };
        let correct = match declaration {
            Declaration::Match => is_match,
            Declaration::NoMatch => !is_match,
        };

        if correct {
            self.streak = self.streak.saturating_add(1);
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
        self.judgment_made = true;

        Some(Judgment {
            declaration,
            correct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tetromino::{Tetromino, TetrominoType};

    fn history_of(ids: &[u8]) -> PieceHistory {
        let mut history = PieceHistory::new();
        for &id in ids {
            let kind = TetrominoType::from_id(id).unwrap();
            history.push(Tetromino::new(kind));
        }
        history
    }

    #[test]
    fn test_two_back_match_after_four_pieces() {
        let history = history_of(&[1, 2, 1, 3, 1]);
        let mut judge = NBackJudge::new(2);
        let judgment = judge.declare(Declaration::Match, &history).unwrap();
        assert!(judgment.correct);
        assert_eq!(judge.streak(), 1);
        assert_eq!(judge.multiplier_tenths(), 14);
        assert_eq!(judge.multiplier_text(), "x1.4");
        assert!((judge.multiplier() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_when_types_differ() {
        let history = history_of(&[1, 2, 3]);
        let mut judge = NBackJudge::new(2);
        assert!(judge.declare(Declaration::NoMatch, &history).unwrap().correct);
    }

    #[test]
    fn test_wrong_answer_resets_streak() {
        let mut judge = NBackJudge::new(1);
        let mut history = history_of(&[4, 4]);
        assert!(judge.declare(Declaration::Match, &history).unwrap().correct);
        judge.begin_piece();
        history.push(Tetromino::new(TetrominoType::S));
        assert!(!judge.declare(Declaration::Match, &history).unwrap().correct);
        assert_eq!(judge.streak(), 0);
        assert_eq!(judge.best_streak(), 1);
        assert_eq!(judge.multiplier_tenths(), 10);
    }

    #[test]
    fn test_short_history_only_no_match_is_correct() {
        for len in 0..=3 {
            let ids = vec![5; len];
            let history = history_of(&ids);

            let mut judge = NBackJudge::new(3);
            assert!(!judge.declare(Declaration::Match, &history).unwrap().correct);

            let mut judge = NBackJudge::new(3);
            assert!(judge.declare(Declaration::NoMatch, &history).unwrap().correct);
        }
    }

    #[test]
    fn test_second_declaration_is_ignored() {
        let history = history_of(&[2, 2]);
        let mut judge = NBackJudge::new(1);
        assert!(judge.declare(Declaration::Match, &history).is_some());
        let before = judge.clone();
        assert_eq!(judge.declare(Declaration::NoMatch, &history), None);
        assert_eq!(judge.declare(Declaration::Match, &history), None);
        assert_eq!(judge, before);
    }

    #[test]
    fn test_level_bounds() {
        let mut judge = NBackJudge::new(1);
        assert!(!judge.decrease_level());
        for _ in 0..20 {
            judge.increase_level();
        }
        assert_eq!(judge.level(), MAX_N_BACK_LEVEL);
        assert!(!judge.increase_level());
        assert_eq!(NBackJudge::new(0).level(), MIN_N_BACK_LEVEL);
        assert_eq!(NBackJudge::new(99).level(), MAX_N_BACK_LEVEL);
    }

    #[test]
    fn test_reset_keeps_level() {
        let history = history_of(&[3, 3]);
        let mut judge = NBackJudge::new(1);
        judge.increase_level();
        judge.declare(Declaration::NoMatch, &history);
        judge.reset();
        assert_eq!(judge.level(), 2);
        assert_eq!(judge.streak(), 0);
        assert!(!judge.judgment_made());
    }
}
