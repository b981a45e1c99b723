//! Application state: the session-id keyed store of game sessions plus configuration.
//!
//! This module owns:
//!   - one `GameSession` per connected player, keyed by a UUID session id
//!   - the loaded `GameConfig`
//!
//! Every session mutation runs under the store's write lock and to completion, so a
//! single session never sees interleaved transitions. Randomness comes from the
//! thread RNG and time from `Instant::now()`; the `*_at` variants take the instant
//! explicitly for tests.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{load_game_config_from_env, GameConfig};
use crate::domain::GameSession;
use crate::error::GameError;
use crate::logic::{apply, Action, Step};
use crate::protocol::{view_of, ViewModel};
use crate::util::trunc_for_log;

pub struct SessionEntry {
    pub session: GameSession,
    pub last_seen: Instant,
    /// Owned by an open websocket; the idle sweeper leaves it alone until the socket closes.
    pub pinned: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pub config: GameConfig,
}

impl AppState {
    /// Build state from env: load config, start with an empty session store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_game_config_from_env();
        info!(target: "factor_quest", difficulty = ?config.default_difficulty, time_limit = config.time_limit_seconds, idle_ttl = config.session_idle_ttl_secs, "Game config ready");
        Self::with_config(config)
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Return the session for `requested` if it exists, otherwise create one.
    /// A requested id must be a UUID so clients cannot mint arbitrary keys.
    pub async fn open_session(&self, requested: Option<String>) -> Result<(String, ViewModel), GameError> {
        let id = match requested {
            Some(raw) => Uuid::parse_str(raw.trim())
                .map_err(|_| GameError::InvalidSessionId(trunc_for_log(&raw, 40)))?
                .to_string(),
            None => Uuid::new_v4().to_string(),
        };
        Ok(self.open_session_at(id, false, Instant::now()).await)
    }

    /// New session tied to a websocket connection; removed when the socket closes.
    pub async fn open_pinned_session(&self) -> (String, ViewModel) {
        self.open_session_at(Uuid::new_v4().to_string(), true, Instant::now()).await
    }

    #[instrument(level = "debug", skip(self, now))]
    pub async fn open_session_at(&self, id: String, pinned: bool, now: Instant) -> (String, ViewModel) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id.clone()).or_insert_with(|| {
            let mut rng = rand::thread_rng();
            let session = GameSession::new(self.config.default_difficulty, self.config.time_limit_seconds, &mut rng);
            info!(target: "game", session_id = %id, number = session.current_number, pinned, "Session created");
            SessionEntry { session, last_seen: now, pinned }
        });
        entry.last_seen = now;
        let view = view_of(&entry.session, now);
        (id, view)
    }

    /// Current view without running any transition (no expiry check).
    pub async fn view(&self, id: &str) -> Result<ViewModel, GameError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(id)
            .ok_or_else(|| GameError::UnknownSession(id.to_string()))?;
        Ok(view_of(&entry.session, Instant::now()))
    }

    /// Apply one player action to a session and return what happened plus the fresh view.
    pub async fn act(&self, id: &str, action: Action) -> Result<(Step, ViewModel), GameError> {
        self.act_at(id, action, Instant::now()).await
    }

    #[instrument(level = "debug", skip(self, action, now), fields(%id))]
    pub async fn act_at(&self, id: &str, action: Action, now: Instant) -> Result<(Step, ViewModel), GameError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownSession(id.to_string()))?;
        entry.last_seen = now;
        let step = {
            let mut rng = rand::thread_rng();
            apply(&mut entry.session, action, &mut rng, now)?
        };
        Ok((step, view_of(&entry.session, now)))
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "game", session_id = %id, "Session closed");
        }
        removed
    }

    /// Drop unpinned sessions that have been idle longer than the configured TTL.
    pub async fn sweep_idle(&self, now: Instant) -> usize {
        let ttl = Duration::from_secs(self.config.session_idle_ttl_secs);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.pinned || now.saturating_duration_since(e.last_seen) < ttl);
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(target: "game", dropped, remaining = sessions.len(), "Idle sessions swept");
        } else {
            debug!(target: "game", remaining = sessions.len(), "Idle sweep found nothing");
        }
        dropped
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
