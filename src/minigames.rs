//! The two small warm-up demos that ship next to the factor game: a BMI calculator
//! and rock-paper-scissors against a random computer hand.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

pub const DEFAULT_HEIGHT_M: f64 = 1.70;
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
  Underweight,
  Normal,
  Overweight,
  Obese,
}

/// Body-mass index rounded to two decimals.
pub fn bmi(height_m: f64, weight_kg: f64) -> Result<f64, GameError> {
  if !height_m.is_finite() || height_m <= 0.0 {
    return Err(GameError::InvalidBmiInput(format!("height must be positive, got {height_m}")));
  }
  if !weight_kg.is_finite() || weight_kg < 0.0 {
    return Err(GameError::InvalidBmiInput(format!("weight must not be negative, got {weight_kg}")));
  }
  let raw = weight_kg / (height_m * height_m);
  Ok((raw * 100.0).round() / 100.0)
}

pub fn bmi_category(bmi: f64) -> BmiCategory {
  if bmi < 18.5 {
    BmiCategory::Underweight
  } else if bmi < 25.0 {
    BmiCategory::Normal
  } else if bmi < 30.0 {
    BmiCategory::Overweight
  } else {
    BmiCategory::Obese
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
  Rock,
  Paper,
  Scissors,
}

impl Hand {
  pub const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

  fn beats(self, other: Hand) -> bool {
    matches!(
      (self, other),
      (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
    )
  }
}

/// Outcome from the player's point of view.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RpsResult {
  Win,
  Lose,
  Draw,
}

pub fn judge(player: Hand, computer: Hand) -> RpsResult {
  if player == computer {
    RpsResult::Draw
  } else if player.beats(computer) {
    RpsResult::Win
  } else {
    RpsResult::Lose
  }
}

/// Play one round; returns the computer's hand and the result.
pub fn play_rps<R: Rng + ?Sized>(player: Hand, rng: &mut R) -> (Hand, RpsResult) {
  let computer = *Hand::ALL.choose(rng).unwrap_or(&Hand::Rock);
  (computer, judge(player, computer))
}
