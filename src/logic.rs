//! Game session controller: every transition a player can trigger.
//!
//! Transitions are synchronous and run to completion against a `&mut GameSession`.
//! The caller supplies the randomness and the current instant, so the hosting layer
//! decides where those come from (thread RNG + `Instant::now()` in the server, seeded
//! RNG + synthetic instants in tests).
//!
//! Time attack is polled, not scheduled: `apply` checks the round clock before it
//! looks at the action, so every refresh or interaction can forfeit a round.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{AttemptRecord, Difficulty, GameMode, GameSession, NonPrimeWarning, Outcome, HISTORY_LIMIT};
use crate::error::{GameError, SubmitError};
use crate::numbers::{factorize, generate, is_prime};
use crate::util::format_product;

/// Discrete user actions, as delivered by the UI layer.
#[derive(Clone, Debug)]
pub enum Action {
  Refresh,
  UpdateInput { text: String },
  Submit { answer: String },
  NewPuzzle,
  SetDifficulty { difficulty: Difficulty },
  SetMode { mode: GameMode, time_limit_seconds: Option<u32> },
  ResetScore,
}

/// Result of grading one submission.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Grade {
  pub number: u32,
  pub outcome: Outcome,
  pub correct_factors: Vec<u32>,
  pub player_factors: Vec<i64>,
  /// "2×2×3"; filled only when the answer was wrong.
  pub revealed: Option<String>,
  pub warnings: Vec<NonPrimeWarning>,
  pub message: String,
}

/// A round forfeited by the time-attack clock.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TimeUp {
  pub number: u32,
  pub correct_factors: Vec<u32>,
  pub revealed: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
  Ack,
  Graded(Grade),
  Rejected { message: String },
  /// The submission arrived after the round had already expired.
  SubmissionLate,
}

/// What one call to `apply` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
  pub time_up: Option<TimeUp>,
  pub report: Report,
}

impl GameSession {
  /// Fresh session with the first puzzle already drawn.
  pub fn new<R: Rng + ?Sized>(difficulty: Difficulty, time_limit_seconds: u32, rng: &mut R) -> Self {
    let (low, high) = difficulty.range();
    Self {
      current_number: generate(rng, low, high),
      score: 0,
      attempts: 0,
      problem_number: 1,
      difficulty,
      mode: GameMode::Normal,
      time_limit_seconds: time_limit_seconds.max(1),
      round_start_time: None,
      pending_input: String::new(),
      history: Vec::new(),
    }
  }

  /// Draw the next puzzle under the current difficulty and restart the round clock.
  pub fn new_puzzle<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) {
    self.draw(rng, now);
    self.problem_number += 1;
    debug!(target: "game", number = self.current_number, problem = self.problem_number, difficulty = ?self.difficulty, "New puzzle");
  }

  fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) {
    let (low, high) = self.difficulty.range();
    self.current_number = generate(rng, low, high);
    self.pending_input.clear();
    self.round_start_time = match self.mode {
      GameMode::TimeAttack => Some(now),
      GameMode::Normal => None,
    };
  }

  /// Grade `raw` against the current puzzle and advance to the next one.
  ///
  /// Blank or unparsable input leaves every counter untouched.
  #[instrument(level = "debug", skip_all, fields(number = self.current_number, answer_len = raw.len()))]
  pub fn submit<R: Rng + ?Sized>(&mut self, raw: &str, rng: &mut R, now: Instant) -> Result<Grade, SubmitError> {
    let player_factors = parse_answer(raw)?;

    // Anything above the puzzle cannot be one of its factors; it is graded wrong
    // without paying for a primality test on arbitrarily large input.
    let bound = i64::from(self.current_number);
    let warnings: Vec<NonPrimeWarning> = player_factors
      .iter()
      .filter(|&&v| v <= bound && !is_prime(v))
      .map(|&value| NonPrimeWarning { value })
      .collect();

    let number = self.current_number;
    let correct_factors = factorize(number);
    let outcome = if same_multiset(&player_factors, &correct_factors) {
      Outcome::Correct
    } else {
      Outcome::Incorrect
    };

    self.attempts += 1;
    let (revealed, mut message) = match outcome {
      Outcome::Correct => {
        self.score += 1;
        (None, format!("Correct! {} = {}", number, format_product(&correct_factors)))
      }
      Outcome::Incorrect => {
        let product = format_product(&correct_factors);
        let message = format!("Not quite. {} = {}", number, product);
        (Some(product), message)
      }
    };
    if !warnings.is_empty() {
      let notes: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
      message.push_str(&format!(" (note: {})", notes.join("; ")));
    }

    self.push_history(AttemptRecord {
      number,
      correct_factors: correct_factors.clone(),
      player_factors: player_factors.clone(),
      outcome,
      timed_out: false,
    });
    info!(target: "game", number, ?outcome, score = self.score, attempts = self.attempts, warnings = warnings.len(), "Answer graded");

    self.new_puzzle(rng, now);
    Ok(Grade { number, outcome, correct_factors, player_factors, revealed, warnings, message })
  }

  /// Seconds left in the current time-attack round; `None` outside time attack.
  pub fn remaining_seconds(&self, now: Instant) -> Option<u32> {
    if self.mode != GameMode::TimeAttack {
      return None;
    }
    let start = self.round_start_time?;
    let elapsed = now.saturating_duration_since(start).as_secs();
    Some(u64::from(self.time_limit_seconds).saturating_sub(elapsed) as u32)
  }

  /// Forfeit the round if its time budget is spent.
  ///
  /// Expiry restarts the clock at `now`, so repeated calls within one tick expire at most once.
  pub fn check_expiry<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) -> Option<TimeUp> {
    if self.mode != GameMode::TimeAttack {
      return None;
    }
    let start = self.round_start_time?;
    if now.saturating_duration_since(start) < Duration::from_secs(u64::from(self.time_limit_seconds)) {
      return None;
    }

    let number = self.current_number;
    let correct_factors = factorize(number);
    self.attempts += 1;
    self.push_history(AttemptRecord {
      number,
      correct_factors: correct_factors.clone(),
      player_factors: Vec::new(),
      outcome: Outcome::Incorrect,
      timed_out: true,
    });
    info!(target: "game", number, attempts = self.attempts, limit = self.time_limit_seconds, "Time attack round expired");

    self.new_puzzle(rng, now);
    Some(TimeUp { number, revealed: format_product(&correct_factors), correct_factors })
  }

  /// Zero the counters, clear history and start over on a fresh puzzle.
  pub fn reset_score<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) {
    self.score = 0;
    self.attempts = 0;
    self.problem_number = 1;
    self.history.clear();
    self.draw(rng, now);
    info!(target: "game", difficulty = ?self.difficulty, "Score reset");
  }

  /// Switching difficulty starts a new round from scratch.
  pub fn change_difficulty<R: Rng + ?Sized>(&mut self, difficulty: Difficulty, rng: &mut R, now: Instant) {
    self.difficulty = difficulty;
    self.reset_score(rng, now);
  }

  /// Switch mode, optionally with a new time budget. Progress is kept.
  pub fn change_mode(&mut self, mode: GameMode, time_limit_seconds: Option<u32>, now: Instant) -> Result<(), GameError> {
    if let Some(limit) = time_limit_seconds {
      if limit == 0 {
        return Err(GameError::InvalidTimeLimit);
      }
      self.time_limit_seconds = limit;
    }
    self.mode = mode;
    self.round_start_time = match mode {
      GameMode::TimeAttack => Some(now),
      GameMode::Normal => None,
    };
    info!(target: "game", ?mode, limit = self.time_limit_seconds, "Mode changed");
    Ok(())
  }

  fn push_history(&mut self, record: AttemptRecord) {
    self.history.insert(0, record);
    self.history.truncate(HISTORY_LIMIT);
  }
}

/// Run one action to completion. The round clock is checked first; a submission for
/// a round that has already expired is dropped rather than graded.
pub fn apply<R: Rng + ?Sized>(session: &mut GameSession, action: Action, rng: &mut R, now: Instant) -> Result<Step, GameError> {
  // Reject bad input before the clock check so a failed action never hides a forfeit.
  if let Action::SetMode { time_limit_seconds: Some(0), .. } = action {
    return Err(GameError::InvalidTimeLimit);
  }
  let time_up = session.check_expiry(rng, now);

  let report = match action {
    Action::Refresh => Report::Ack,
    Action::UpdateInput { text } => {
      session.pending_input = text;
      Report::Ack
    }
    Action::Submit { .. } if time_up.is_some() => Report::SubmissionLate,
    Action::Submit { answer } => match session.submit(&answer, rng, now) {
      Ok(grade) => Report::Graded(grade),
      Err(e) => {
        debug!(target: "game", error = %e, "Submission rejected");
        // Keep what the player typed so they can fix it.
        session.pending_input = answer;
        Report::Rejected { message: e.to_string() }
      }
    },
    Action::NewPuzzle => {
      session.new_puzzle(rng, now);
      Report::Ack
    }
    Action::SetDifficulty { difficulty } => {
      session.change_difficulty(difficulty, rng, now);
      Report::Ack
    }
    Action::SetMode { mode, time_limit_seconds } => {
      session.change_mode(mode, time_limit_seconds, now)?;
      Report::Ack
    }
    Action::ResetScore => {
      session.reset_score(rng, now);
      Report::Ack
    }
  };

  Ok(Step { time_up, report })
}

/// Parse "2, 2, 3" into integers. Empty tokens (",,") are skipped.
pub fn parse_answer(raw: &str) -> Result<Vec<i64>, SubmitError> {
  if raw.trim().is_empty() {
    return Err(SubmitError::EmptyInput);
  }
  let mut values = Vec::new();
  for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
    let value = token.parse::<i64>().map_err(|_| SubmitError::Parse { token: token.to_string() })?;
    values.push(value);
  }
  if values.is_empty() {
    return Err(SubmitError::EmptyInput);
  }
  Ok(values)
}

/// Order-insensitive equality with matching multiplicities.
pub fn same_multiset(player: &[i64], correct: &[u32]) -> bool {
  if player.len() != correct.len() {
    return false;
  }
  let mut a = player.to_vec();
  let mut b: Vec<i64> = correct.iter().map(|&p| i64::from(p)).collect();
  a.sort_unstable();
  b.sort_unstable();
  a == b
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  fn session_with(number: u32) -> (GameSession, StdRng) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut s = GameSession::new(Difficulty::Normal, 10, &mut rng);
    s.current_number = number;
    (s, rng)
  }

  #[test]
  fn correct_answer_scores() {
    let (mut s, mut rng) = session_with(12);
    let grade = s.submit("2, 2, 3", &mut rng, Instant::now()).expect("graded");
    assert_eq!(grade.outcome, Outcome::Correct);
    assert_eq!(grade.revealed, None);
    assert_eq!((s.score, s.attempts, s.problem_number), (1, 1, 2));
    assert_eq!(s.history[0].number, 12);
    assert!(s.pending_input.is_empty());
  }

  #[test]
  fn order_does_not_matter() {
    let (mut s, mut rng) = session_with(30);
    let grade = s.submit("5, 2, 3", &mut rng, Instant::now()).expect("graded");
    assert_eq!(grade.outcome, Outcome::Correct);
    assert_eq!(grade.player_factors, vec![5, 2, 3]);
  }

  #[test]
  fn missing_factor_reveals_product() {
    let (mut s, mut rng) = session_with(12);
    let grade = s.submit("2, 3", &mut rng, Instant::now()).expect("graded");
    assert_eq!(grade.outcome, Outcome::Incorrect);
    assert_eq!(grade.revealed.as_deref(), Some("2×2×3"));
    assert_eq!((s.score, s.attempts), (0, 1));
  }

  #[test]
  fn extra_duplicate_is_wrong() {
    let (mut s, mut rng) = session_with(12);
    let grade = s.submit("2,2,2,3", &mut rng, Instant::now()).expect("graded");
    assert_eq!(grade.outcome, Outcome::Incorrect);
  }

  #[test]
  fn unparsable_input_changes_nothing() {
    let (mut s, mut rng) = session_with(12);
    let err = s.submit("2, abc", &mut rng, Instant::now()).unwrap_err();
    assert_eq!(err, SubmitError::Parse { token: "abc".into() });
    assert_eq!((s.score, s.attempts, s.problem_number), (0, 0, 1));
    assert_eq!(s.current_number, 12);
    assert!(s.history.is_empty());
  }

  #[test]
  fn blank_input_is_rejected() {
    let (mut s, mut rng) = session_with(12);
    assert_eq!(s.submit("   ", &mut rng, Instant::now()).unwrap_err(), SubmitError::EmptyInput);
    assert_eq!(s.submit(" , ,", &mut rng, Instant::now()).unwrap_err(), SubmitError::EmptyInput);
    assert_eq!(s.attempts, 0);
  }

  #[test]
  fn non_primes_warn_but_still_grade() {
    let (mut s, mut rng) = session_with(12);
    let grade = s.submit("4, 3", &mut rng, Instant::now()).expect("graded");
    assert_eq!(grade.warnings, vec![NonPrimeWarning { value: 4 }]);
    assert_eq!(grade.outcome, Outcome::Incorrect);
    assert_eq!(s.attempts, 1);
  }

  #[test]
  fn history_keeps_five_most_recent() {
    let (mut s, mut rng) = session_with(12);
    let now = Instant::now();
    let mut numbers = Vec::new();
    for _ in 0..6 {
      numbers.push(s.current_number);
      s.submit("2", &mut rng, now).expect("graded");
    }
    assert_eq!(s.history.len(), HISTORY_LIMIT);
    let kept: Vec<u32> = s.history.iter().map(|r| r.number).collect();
    let expected: Vec<u32> = numbers.iter().rev().take(5).copied().collect();
    assert_eq!(kept, expected);
    assert_eq!(s.attempts, 6);
  }

  #[test]
  fn time_attack_expires_once_per_tick() {
    let (mut s, mut rng) = session_with(12);
    let t0 = Instant::now();
    s.change_mode(GameMode::TimeAttack, Some(10), t0).expect("mode");

    assert_eq!(s.check_expiry(&mut rng, t0 + Duration::from_secs(9)), None);
    assert_eq!(s.remaining_seconds(t0 + Duration::from_secs(9)), Some(1));

    let late = t0 + Duration::from_secs(11);
    let up = s.check_expiry(&mut rng, late).expect("expired");
    assert_eq!(up.number, 12);
    assert_eq!(up.revealed, "2×2×3");
    assert_eq!(s.check_expiry(&mut rng, late), None);

    assert_eq!((s.score, s.attempts, s.problem_number), (0, 1, 2));
    assert_eq!(s.round_start_time, Some(late));
    assert!(s.history[0].timed_out);
    assert_eq!(s.history[0].outcome, Outcome::Incorrect);
  }

  #[test]
  fn late_submission_is_not_graded() {
    let (mut s, mut rng) = session_with(12);
    let t0 = Instant::now();
    s.change_mode(GameMode::TimeAttack, Some(10), t0).expect("mode");
    let step = apply(&mut s, Action::Submit { answer: "2,2,3".into() }, &mut rng, t0 + Duration::from_secs(10)).expect("step");
    assert!(step.time_up.is_some());
    assert_eq!(step.report, Report::SubmissionLate);
    assert_eq!((s.score, s.attempts), (0, 1));
  }

  #[test]
  fn huge_token_grades_fast_without_warning() {
    let (mut s, mut rng) = session_with(12);
    let started = Instant::now();
    let grade = s.submit("9223372036854775783", &mut rng, Instant::now()).expect("graded");
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
    assert_eq!(grade.outcome, Outcome::Incorrect);
    assert!(grade.warnings.is_empty());
    assert_eq!(s.attempts, 1);
  }

  #[test]
  fn invalid_time_limit_leaves_expired_round_alone() {
    let (mut s, mut rng) = session_with(12);
    let t0 = Instant::now();
    s.change_mode(GameMode::TimeAttack, Some(10), t0).expect("mode");
    let late = t0 + Duration::from_secs(11);

    let err = apply(&mut s, Action::SetMode { mode: GameMode::TimeAttack, time_limit_seconds: Some(0) }, &mut rng, late).unwrap_err();
    assert!(matches!(err, GameError::InvalidTimeLimit));
    assert_eq!((s.attempts, s.problem_number, s.current_number), (0, 1, 12));
    assert!(s.history.is_empty());

    let step = apply(&mut s, Action::Refresh, &mut rng, late).expect("step");
    assert_eq!(step.time_up.map(|t| t.number), Some(12));
    assert_eq!(s.attempts, 1);
  }

  #[test]
  fn reset_in_time_attack_restarts_clock_and_keeps_mode() {
    let (mut s, mut rng) = session_with(12);
    let t0 = Instant::now();
    s.change_mode(GameMode::TimeAttack, Some(15), t0).expect("mode");
    s.submit("2,2,3", &mut rng, t0).expect("graded");
    s.submit("5", &mut rng, t0).expect("graded");
    assert_eq!(s.problem_number, 3);

    let later = t0 + Duration::from_secs(7);
    let step = apply(&mut s, Action::ResetScore, &mut rng, later).expect("step");
    assert_eq!(step.report, Report::Ack);
    assert_eq!((s.score, s.attempts, s.problem_number), (0, 0, 1));
    assert!(s.history.is_empty());
    assert_eq!(s.round_start_time, Some(later));
    assert_eq!(s.mode, GameMode::TimeAttack);
    assert_eq!(s.time_limit_seconds, 15);
    assert_eq!(s.remaining_seconds(later), Some(15));
  }

  #[test]
  fn normal_mode_never_expires() {
    let (mut s, mut rng) = session_with(12);
    let later = Instant::now() + Duration::from_secs(3_600);
    assert_eq!(s.check_expiry(&mut rng, later), None);
    assert_eq!(s.remaining_seconds(later), None);
  }

  #[test]
  fn difficulty_change_resets_progress() {
    let (mut s, mut rng) = session_with(12);
    let now = Instant::now();
    s.submit("2,2,3", &mut rng, now).expect("graded");
    s.submit("1", &mut rng, now).expect("graded");
    s.change_difficulty(Difficulty::VeryHard, &mut rng, now);
    assert_eq!((s.score, s.attempts, s.problem_number), (0, 0, 1));
    assert!(s.history.is_empty());
    assert!((100..=500).contains(&s.current_number));
  }

  #[test]
  fn zero_time_limit_is_rejected() {
    let (mut s, _) = session_with(12);
    let err = s.change_mode(GameMode::TimeAttack, Some(0), Instant::now()).unwrap_err();
    assert!(matches!(err, GameError::InvalidTimeLimit));
    assert_eq!(s.mode, GameMode::Normal);
  }

  #[test]
  fn rejected_submission_keeps_pending_input() {
    let (mut s, mut rng) = session_with(12);
    let step = apply(&mut s, Action::Submit { answer: "2, x".into() }, &mut rng, Instant::now()).expect("step");
    assert!(matches!(step.report, Report::Rejected { .. }));
    assert_eq!(s.pending_input, "2, x");
  }

  #[test]
  fn score_never_exceeds_attempts() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut s = GameSession::new(Difficulty::Hard, 5, &mut rng);
    let now = Instant::now();
    for i in 0..40 {
      let answer = if i % 3 == 0 {
        "7".to_string()
      } else {
        factorize(s.current_number).iter().map(u32::to_string).collect::<Vec<_>>().join(",")
      };
      s.submit(&answer, &mut rng, now).expect("graded");
      assert!(s.score <= s.attempts);
      assert!(s.history.len() <= HISTORY_LIMIT);
    }
  }
}
