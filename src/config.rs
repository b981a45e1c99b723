//! Game configuration loaded from TOML.
//!
//! The file is named by GAME_CONFIG_PATH. Every field is optional:
//!
//! ```toml
//! default_difficulty = "hard"
//! time_limit_seconds = 20
//! timeout_pause_ms = 1500
//! session_idle_ttl_secs = 3600
//! sweep_interval_secs = 60
//! ```

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::Difficulty;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameConfig {
  /// Difficulty a brand-new session starts on.
  pub default_difficulty: Difficulty,
  /// Per-round budget in time-attack mode until the player picks another.
  pub time_limit_seconds: u32,
  /// How long the websocket shows "time's up" before pushing the next puzzle.
  pub timeout_pause_ms: u64,
  pub session_idle_ttl_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      default_difficulty: Difficulty::Normal,
      time_limit_seconds: 30,
      timeout_pause_ms: 1500,
      session_idle_ttl_secs: 3600,
      sweep_interval_secs: 60,
    }
  }
}

impl GameConfig {
  /// Parse TOML text; zero values that would break the game fall back to defaults.
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    let mut cfg = toml::from_str::<GameConfig>(s)?;
    let defaults = GameConfig::default();
    if cfg.time_limit_seconds == 0 {
      warn!(target: "factor_quest", "time_limit_seconds = 0 is not playable; using default");
      cfg.time_limit_seconds = defaults.time_limit_seconds;
    }
    if cfg.sweep_interval_secs == 0 {
      cfg.sweep_interval_secs = defaults.sweep_interval_secs;
    }
    Ok(cfg)
  }
}

/// Load `GameConfig` from GAME_CONFIG_PATH. Missing variable or any IO/parse error yields defaults.
pub fn load_game_config_from_env() -> GameConfig {
  let Ok(path) = std::env::var("GAME_CONFIG_PATH") else {
    return GameConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match GameConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "factor_quest", %path, "Loaded game config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "factor_quest", %path, error = %e, "Failed to parse TOML config; using defaults");
        GameConfig::default()
      }
    },
    Err(e) => {
      error!(target: "factor_quest", %path, error = %e, "Failed to read TOML config file; using defaults");
      GameConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_means_defaults() {
    let cfg = GameConfig::from_toml_str("").expect("parse");
    assert_eq!(cfg.default_difficulty, Difficulty::Normal);
    assert_eq!(cfg.time_limit_seconds, 30);
    assert_eq!(cfg.timeout_pause_ms, 1500);
  }

  #[test]
  fn partial_override() {
    let cfg = GameConfig::from_toml_str("default_difficulty = \"very_hard\"\ntime_limit_seconds = 10\n").expect("parse");
    assert_eq!(cfg.default_difficulty, Difficulty::VeryHard);
    assert_eq!(cfg.time_limit_seconds, 10);
    assert_eq!(cfg.session_idle_ttl_secs, 3600);
  }

  #[test]
  fn zero_time_limit_falls_back() {
    let cfg = GameConfig::from_toml_str("time_limit_seconds = 0").expect("parse");
    assert_eq!(cfg.time_limit_seconds, 30);
  }

  #[test]
  fn unknown_difficulty_is_a_parse_error() {
    assert!(GameConfig::from_toml_str("default_difficulty = \"impossible\"").is_err());
  }
}
