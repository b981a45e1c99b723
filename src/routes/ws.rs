//! WebSocket upgrade + message loop. Each connection owns one game session for its
//! lifetime. Client messages are parsed as JSON and forwarded to the session store;
//! game replies always carry the refreshed view.

use std::{sync::Arc, time::Duration};
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic::{Report, TimeUp};
use crate::minigames::{bmi, bmi_category, play_rps, DEFAULT_HEIGHT_M, DEFAULT_WEIGHT_KG};
use crate::protocol::{ClientWsMessage, ServerWsMessage, ViewModel};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "factor_quest", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (id, view) = state.open_pinned_session().await;
  let sessions = state.session_count().await;
  info!(target: "factor_quest", session_id = %id, sessions, "WebSocket connected");

  if send(&mut socket, &ServerWsMessage::View { view }).await {
    while let Some(Ok(msg)) = socket.recv().await {
      match msg {
        Message::Text(txt) => {
          let incoming = match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(m) => m,
            Err(e) => {
              let reply = ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) };
              if !send(&mut socket, &reply).await { break; }
              continue;
            }
          };
          debug!(target: "factor_quest", session_id = %id, "WS received: {:?}", &incoming);
          if !handle_client_ws(&mut socket, incoming, &state, &id).await { break; }
        }
        Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
        Message::Close(_) => break,
        _ => {}
      }
    }
  }

  state.remove_session(&id).await;
  info!(target: "factor_quest", session_id = %id, "WebSocket disconnected");
}

/// What the socket should send for one client message.
enum Dispatch {
  Reply(ServerWsMessage),
  /// The round expired before the action ran: `time_up` first, then the report on a fresh view.
  Expired { round: TimeUp, report: Report },
}

async fn dispatch(state: &AppState, id: &str, msg: ClientWsMessage) -> Dispatch {
  let action = match msg.into_action() {
    Ok(action) => action,
    Err(other) => return Dispatch::Reply(side_reply(other)),
  };
  match state.act(id, action).await {
    Ok((step, view)) => match step.time_up {
      Some(round) => Dispatch::Expired { round, report: step.report },
      None => Dispatch::Reply(game_reply(id, step.report, view)),
    },
    Err(e) => Dispatch::Reply(ServerWsMessage::Error { message: e.to_string() }),
  }
}

/// Handle one client message. Returns false once the socket is no longer writable.
async fn handle_client_ws(socket: &mut WebSocket, msg: ClientWsMessage, state: &AppState, id: &str) -> bool {
  match dispatch(state, id, msg).await {
    Dispatch::Reply(reply) => send(socket, &reply).await,
    Dispatch::Expired { round, report } => {
      info!(target: "game", session_id = %id, number = round.number, "WS time_up");
      if !send(socket, &ServerWsMessage::TimeUp { round }).await { return false; }
      // Let the player read the reveal before the next puzzle replaces it.
      tokio::time::sleep(Duration::from_millis(state.config.timeout_pause_ms)).await;
      let reply = match state.view(id).await {
        Ok(view) => game_reply(id, report, view),
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      };
      send(socket, &reply).await
    }
  }
}

fn game_reply(id: &str, report: Report, view: ViewModel) -> ServerWsMessage {
  match report {
    Report::Ack => ServerWsMessage::View { view },
    report => {
      if let Report::Graded(g) = &report {
        info!(target: "game", session_id = %id, number = g.number, outcome = ?g.outcome, "WS submit_answer evaluated");
      }
      ServerWsMessage::AnswerResult { report, view }
    }
  }
}

/// Replies for messages that do not touch the game session.
fn side_reply(msg: ClientWsMessage) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::Bmi { height_m, weight_kg } => {
      match bmi(height_m.unwrap_or(DEFAULT_HEIGHT_M), weight_kg.unwrap_or(DEFAULT_WEIGHT_KG)) {
        Ok(value) => ServerWsMessage::Bmi { bmi: value, category: bmi_category(value) },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
    ClientWsMessage::Rps { hand } => {
      let (computer, result) = play_rps(hand, &mut rand::thread_rng());
      ServerWsMessage::Rps { player: hand, computer, result }
    }
    other => ServerWsMessage::Error { message: format!("Unhandled message: {:?}", other) },
  }
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  if let Err(e) = socket.send(Message::Text(out)).await {
    error!(target: "factor_quest", error = %e, "WS send error");
    return false;
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GameConfig;

  fn msg(json: &str) -> ClientWsMessage {
    serde_json::from_str(json).expect("json")
  }

  async fn opened() -> (AppState, String) {
    let state = AppState::with_config(GameConfig::default());
    let (id, _) = state.open_pinned_session().await;
    (state, id)
  }

  #[tokio::test]
  async fn ping_and_side_games_skip_the_session() {
    let (state, id) = opened().await;
    assert!(matches!(dispatch(&state, &id, msg(r#"{"type":"ping"}"#)).await, Dispatch::Reply(ServerWsMessage::Pong)));
    assert!(matches!(
      dispatch(&state, &id, msg(r#"{"type":"rps","hand":"scissors"}"#)).await,
      Dispatch::Reply(ServerWsMessage::Rps { .. })
    ));
    assert!(matches!(
      dispatch(&state, &id, msg(r#"{"type":"bmi","heightM":0}"#)).await,
      Dispatch::Reply(ServerWsMessage::Error { .. })
    ));
  }

  #[tokio::test]
  async fn submissions_come_back_as_answer_results() {
    let (state, id) = opened().await;
    match dispatch(&state, &id, msg(r#"{"type":"submit_answer","answer":"2, abc"}"#)).await {
      Dispatch::Reply(ServerWsMessage::AnswerResult { report: Report::Rejected { .. }, view }) => {
        assert_eq!(view.attempts, 0);
        assert_eq!(view.pending_input, "2, abc");
      }
      _ => panic!("expected a rejected answer result"),
    }
    match dispatch(&state, &id, msg(r#"{"type":"submit_answer","answer":"1"}"#)).await {
      Dispatch::Reply(ServerWsMessage::AnswerResult { report: Report::Graded(g), view }) => {
        assert_eq!(g.outcome, crate::domain::Outcome::Incorrect);
        assert_eq!(view.attempts, 1);
      }
      _ => panic!("expected a graded answer result"),
    }
  }

  #[tokio::test]
  async fn bad_time_limit_is_an_error_reply() {
    let (state, id) = opened().await;
    let reply = dispatch(&state, &id, msg(r#"{"type":"set_mode","mode":"time_attack","timeLimitSeconds":0}"#)).await;
    assert!(matches!(reply, Dispatch::Reply(ServerWsMessage::Error { .. })));
  }

  #[tokio::test]
  async fn expired_round_is_reported_before_the_action() {
    let (state, id) = opened().await;
    let reply = dispatch(&state, &id, msg(r#"{"type":"set_mode","mode":"time_attack","timeLimitSeconds":1}"#)).await;
    assert!(matches!(reply, Dispatch::Reply(ServerWsMessage::View { .. })));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    match dispatch(&state, &id, msg(r#"{"type":"refresh"}"#)).await {
      Dispatch::Expired { round, report } => {
        assert!(!round.revealed.is_empty());
        assert_eq!(report, Report::Ack);
      }
      _ => panic!("expected the round to expire"),
    }
    let view = state.view(&id).await.expect("view");
    assert_eq!((view.attempts, view.problem_number), (1, 2));
    assert_eq!(view.remaining_seconds, Some(1));
  }
}
