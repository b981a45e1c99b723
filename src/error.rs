//! Error taxonomy. Every variant is recoverable: the player is re-prompted on the same puzzle.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Why a submission could not be graded. No counters change when these are returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
  #[error("Please enter at least one factor, separated by commas.")]
  EmptyInput,
  #[error("'{token}' is not a whole number.")]
  Parse { token: String },
}

#[derive(Debug, Error)]
pub enum GameError {
  #[error("unknown session: {0}")]
  UnknownSession(String),
  #[error("session id must be a UUID, got '{0}'")]
  InvalidSessionId(String),
  #[error("time limit must be at least one second")]
  InvalidTimeLimit,
  #[error("invalid BMI input: {0}")]
  InvalidBmiInput(String),
  #[error(transparent)]
  Submit(#[from] SubmitError),
}

impl GameError {
  pub fn status(&self) -> StatusCode {
    match self {
      GameError::UnknownSession(_) => StatusCode::NOT_FOUND,
      _ => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for GameError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    let body = serde_json::json!({
      "message": self.to_string(),
      "status": status.as_u16(),
    });
    (status, Json(body)).into_response()
  }
}
