//! HTTP endpoint handlers. These are thin wrappers that forward to the session store.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::GameError;
use crate::logic::{Action, Report};
use crate::minigames::{bmi, bmi_category, play_rps, DEFAULT_HEIGHT_M, DEFAULT_WEIGHT_KG};
use crate::protocol::*;
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(OkOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_open_session(
  State(state): State<Arc<AppState>>,
  body: Option<Json<OpenSessionIn>>,
) -> Result<Json<SessionOut>, GameError> {
  let requested = body.and_then(|Json(b)| b.session_id);
  let (session_id, view) = state.open_session(requested).await?;
  info!(target: "game", %session_id, number = view.current_number, "HTTP session opened");
  Ok(Json(SessionOut { session_id, view }))
}

/// Polling endpoint: runs the time-attack check and returns the current view.
#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::Refresh).await
}

#[instrument(level = "info", skip(state))]
pub async fn http_close_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<OkOut>, GameError> {
  if state.remove_session(&id).await {
    Ok(Json(OkOut { ok: true }))
  } else {
    Err(GameError::UnknownSession(id))
  }
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_put_input(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<InputIn>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::UpdateInput { text: body.text }).await
}

#[instrument(level = "info", skip(state, body), fields(answer = %trunc_for_log(&body.answer, 32)))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<ActionOut>, GameError> {
  let out = run(&state, &id, Action::Submit { answer: body.answer }).await?;
  if let Report::Graded(g) = &out.report {
    info!(target: "game", %id, number = g.number, outcome = ?g.outcome, "HTTP submit_answer evaluated");
  }
  Ok(out)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_puzzle(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::NewPuzzle).await
}

#[instrument(level = "info", skip(state, body), fields(difficulty = ?body.difficulty))]
pub async fn http_post_difficulty(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<DifficultyIn>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::SetDifficulty { difficulty: body.difficulty }).await
}

#[instrument(level = "info", skip(state, body), fields(mode = ?body.mode, limit = ?body.time_limit_seconds))]
pub async fn http_post_mode(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ModeIn>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::SetMode { mode: body.mode, time_limit_seconds: body.time_limit_seconds }).await
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ActionOut>, GameError> {
  run(&state, &id, Action::ResetScore).await
}

#[instrument(level = "info", skip(body))]
pub async fn http_post_bmi(body: Option<Json<BmiIn>>) -> Result<Json<BmiOut>, GameError> {
  let body = body.map(|Json(b)| b).unwrap_or_default();
  let value = bmi(body.height_m.unwrap_or(DEFAULT_HEIGHT_M), body.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG))?;
  Ok(Json(BmiOut { bmi: value, category: bmi_category(value) }))
}

#[instrument(level = "info", skip(body), fields(hand = ?body.hand))]
pub async fn http_post_rps(Json(body): Json<RpsIn>) -> Json<RpsOut> {
  let (computer, result) = play_rps(body.hand, &mut rand::thread_rng());
  info!(target: "game", player = ?body.hand, ?computer, ?result, "HTTP rps played");
  Json(RpsOut { player: body.hand, computer, result })
}

async fn run(state: &AppState, id: &str, action: Action) -> Result<Json<ActionOut>, GameError> {
  let (step, view) = state.act(id, action).await?;
  Ok(Json(ActionOut::new(step, view)))
}
