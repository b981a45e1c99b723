//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::domain::{AttemptRecord, Difficulty, GameMode, GameSession};
use crate::logic::{Action, Report, Step, TimeUp};
use crate::minigames::{BmiCategory, Hand, RpsResult};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Refresh,
    UpdateInput {
        text: String,
    },
    SubmitAnswer {
        answer: String,
    },
    NewPuzzle,
    SetDifficulty {
        difficulty: Difficulty,
    },
    SetMode {
        mode: GameMode,
        #[serde(default, rename = "timeLimitSeconds")]
        time_limit_seconds: Option<u32>,
    },
    ResetScore,
    Bmi {
        #[serde(default, rename = "heightM")]
        height_m: Option<f64>,
        #[serde(default, rename = "weightKg")]
        weight_kg: Option<f64>,
    },
    Rps {
        hand: Hand,
    },
}

impl ClientWsMessage {
    /// Game actions routed to the session controller; other messages are handed back.
    pub fn into_action(self) -> Result<Action, ClientWsMessage> {
        match self {
            ClientWsMessage::Refresh => Ok(Action::Refresh),
            ClientWsMessage::UpdateInput { text } => Ok(Action::UpdateInput { text }),
            ClientWsMessage::SubmitAnswer { answer } => Ok(Action::Submit { answer }),
            ClientWsMessage::NewPuzzle => Ok(Action::NewPuzzle),
            ClientWsMessage::SetDifficulty { difficulty } => Ok(Action::SetDifficulty { difficulty }),
            ClientWsMessage::SetMode { mode, time_limit_seconds } => Ok(Action::SetMode { mode, time_limit_seconds }),
            ClientWsMessage::ResetScore => Ok(Action::ResetScore),
            other => Err(other),
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: ViewModel,
    },
    AnswerResult {
        report: Report,
        view: ViewModel,
    },
    TimeUp {
        round: TimeUp,
    },
    Bmi {
        bmi: f64,
        category: BmiCategory,
    },
    Rps {
        player: Hand,
        computer: Hand,
        result: RpsResult,
    },
    Error {
        message: String,
    },
}

/// Everything the UI needs to draw the game screen.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub current_number: u32,
    pub problem_number: u32,
    pub score: u32,
    pub attempts: u32,
    pub accuracy_percent: f64,
    pub difficulty: Difficulty,
    pub difficulty_label: String,
    pub difficulty_range: [u32; 2],
    pub mode: GameMode,
    pub time_limit_seconds: u32,
    pub remaining_seconds: Option<u32>,
    pub pending_input: String,
    pub history: Vec<AttemptRecord>,
}

/// Build the view-model for a session at `now`.
pub fn view_of(s: &GameSession, now: Instant) -> ViewModel {
    let accuracy_percent = if s.attempts == 0 {
        0.0
    } else {
        (f64::from(s.score) / f64::from(s.attempts) * 1000.0).round() / 10.0
    };
    let (low, high) = s.difficulty.range();
    ViewModel {
        current_number: s.current_number,
        problem_number: s.problem_number,
        score: s.score,
        attempts: s.attempts,
        accuracy_percent,
        difficulty: s.difficulty,
        difficulty_label: s.difficulty.label().to_string(),
        difficulty_range: [low, high],
        mode: s.mode,
        time_limit_seconds: s.time_limit_seconds,
        remaining_seconds: s.remaining_seconds(now),
        pending_input: s.pending_input.clone(),
        history: s.history.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionIn {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub view: ViewModel,
}

/// Reply for every session action over HTTP.
#[derive(Debug, Serialize)]
pub struct ActionOut {
    pub time_up: Option<TimeUp>,
    pub report: Report,
    pub view: ViewModel,
}

impl ActionOut {
    pub fn new(step: Step, view: ViewModel) -> Self {
        Self { time_up: step.time_up, report: step.report, view }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputIn {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct DifficultyIn {
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
pub struct ModeIn {
    pub mode: GameMode,
    #[serde(default, rename = "timeLimitSeconds")]
    pub time_limit_seconds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BmiIn {
    #[serde(default, rename = "heightM")]
    pub height_m: Option<f64>,
    #[serde(default, rename = "weightKg")]
    pub weight_kg: Option<f64>,
}
#[derive(Debug, Serialize)]
pub struct BmiOut {
    pub bmi: f64,
    pub category: BmiCategory,
}

#[derive(Debug, Deserialize)]
pub struct RpsIn {
    pub hand: Hand,
}
#[derive(Debug, Serialize)]
pub struct RpsOut {
    pub player: Hand,
    pub computer: Hand,
    pub result: RpsResult,
}

#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}
