//! Factor Quest · prime factorization game backend
//!
//! - Axum HTTP + WebSocket API around per-player game sessions
//! - Normal and time-attack modes, four difficulty bands
//! - BMI and rock-paper-scissors warm-up demos
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   GAME_CONFIG_PATH : path to TOML config (difficulty, time limit, session TTL)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod numbers;
mod state;
mod protocol;
mod logic;
mod minigames;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::{Duration, Instant}};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (config + in-memory session store).
  let state = Arc::new(AppState::new());

  // Sessions only live in memory; drop the ones nobody has touched in a while.
  spawn_idle_sweeper(state.clone());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "factor_quest", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "factor_quest", "Server stopped");
  Ok(())
}

fn spawn_idle_sweeper(state: Arc<AppState>) {
  let every = Duration::from_secs(state.config.sweep_interval_secs);
  info!(target: "factor_quest", interval_secs = every.as_secs(), "Starting idle session sweeper");
  tokio::spawn(async move {
    loop {
      tokio::time::sleep(every).await;
      state.sweep_idle(Instant::now()).await;
    }
  });
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "factor_quest", error = %e, "Failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "factor_quest", "Shutdown requested");
}
