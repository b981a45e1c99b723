//! Domain models: difficulty bands, game modes, attempt records and the per-user game session.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Most recent attempts kept in `GameSession::history`.
pub const HISTORY_LIMIT: usize = 5;

/// Difficulty band; each maps to an inclusive range the puzzle is drawn from.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  #[default]
  Normal,
  Hard,
  VeryHard,
}

impl Difficulty {
  /// Inclusive `(low, high)` bound handed to the number generator.
  pub fn range(self) -> (u32, u32) {
    match self {
      Difficulty::Easy => (2, 50),
      Difficulty::Normal => (2, 100),
      Difficulty::Hard => (50, 200),
      Difficulty::VeryHard => (100, 500),
    }
  }

  /// Human label ("Very Hard", ...).
  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Normal => "Normal",
      Difficulty::Hard => "Hard",
      Difficulty::VeryHard => "Very Hard",
    }
  }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
  #[default]
  Normal,
  TimeAttack,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Correct,
  Incorrect,
}

/// One graded round. Immutable once pushed into the history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptRecord {
  pub number: u32,
  /// True factorization, ascending.
  pub correct_factors: Vec<u32>,
  /// What the player typed, in the order typed. Empty for forfeited rounds.
  pub player_factors: Vec<i64>,
  pub outcome: Outcome,
  /// Round was forfeited by the time-attack clock rather than submitted.
  #[serde(default)]
  pub timed_out: bool,
}

/// A parsed value the player entered that is not prime. Grading still proceeds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NonPrimeWarning {
  pub value: i64,
}

impl std::fmt::Display for NonPrimeWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} is not a prime number", self.value)
  }
}

/// All mutable state of one player's game. Owned by the hosting layer, one per session id.
#[derive(Clone, Debug)]
pub struct GameSession {
  /// Active puzzle, always >= 2.
  pub current_number: u32,
  pub score: u32,
  /// Graded submissions plus forfeited rounds; never below `score`.
  pub attempts: u32,
  /// 1-based counter of puzzles presented since the last reset.
  pub problem_number: u32,
  pub difficulty: Difficulty,
  pub mode: GameMode,
  pub time_limit_seconds: u32,
  /// Set while in time-attack mode; restarted on every new puzzle.
  pub round_start_time: Option<Instant>,
  pub pending_input: String,
  /// Most recent first, at most `HISTORY_LIMIT` entries.
  pub history: Vec<AttemptRecord>,
}
