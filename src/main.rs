//! Vibe With Us · Regex Challenge Backend
//!
//! - Axum HTTP + WebSocket API for the browser game
//! - Regex challenge validation (free-form or canonical-only strictness)
//! - Progression store persisted as one JSON document
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   VIBE_CONFIG_PATH : path to TOML config (strictness, storage, optional challenge bank)
//!   VIBE_DATA_DIR    : directory for the progress file (default ./data)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod seeds;
mod validator;
mod progress;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::load_app_config_from_env;
use crate::routes::build_router;
use crate::state::{build_store, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_app_config_from_env();

  // The store is created here and handed to the state; nothing else constructs one.
  let store = build_store(&cfg);
  let state = Arc::new(AppState::new(&cfg, store));

  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vibe_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  // Upgraded WebSockets may still hold the state; then the last write already persisted everything.
  match Arc::try_unwrap(state).ok().and_then(|s| Arc::try_unwrap(s.store).ok()) {
    Some(store) => store.into_inner().dispose()?,
    None => warn!(target: "vibe_backend", "Progress store still shared at shutdown; skipping final flush"),
  }
  info!(target: "vibe_backend", "Shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "vibe_backend", error = %e, "Failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "vibe_backend", "Shutdown signal received");
}
