//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Stateless pattern validation (per keystroke)
//!   - Regex game sessions (start, submit, hints, restart) and recording completion
//!   - Progress queries and mutations (settings, import/export, reset)
//!   - Quick-play drills
//!
//! Lock order is always sessions before store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::ValidationResult;
use crate::error::GameError;
use crate::progress::{Achievement, CompletionOutcome, ProgressDocument, ScoreEntry, Settings, StatsSummary, StoreError};
use crate::protocol::{drill_out, session_out, to_out, ChallengeOut, DrillOut, GameOut, SessionOut, SubmitOut};
use crate::seeds::REGEX_GAME_ID;
use crate::session::RegexSession;
use crate::state::AppState;
use crate::util::trunc_for_log;
use crate::validator::{self, DrillVerdict};

/// Failures surfaced to clients.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
  NotFound(String),
  BadRequest(String),
  /// The level has not been unlocked yet.
  Locked(String),
  Internal(String),
}

impl ApiError {
  pub fn message(&self) -> &str {
    match self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) | ApiError::Locked(m) | ApiError::Internal(m) => m,
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Game(g) => ApiError::BadRequest(g.to_string()),
      StoreError::Io(io) => {
        error!(target: "progress", error = %io, "Progress write failed");
        ApiError::Internal(format!("Could not persist progress: {}", io))
      }
    }
  }
}

impl From<GameError> for ApiError {
  fn from(e: GameError) -> Self {
    ApiError::BadRequest(e.to_string())
  }
}

pub async fn list_games(state: &AppState) -> Vec<GameOut> {
  let store = state.store.read().await;
  store
    .catalog()
    .iter()
    .map(|g| GameOut { info: g.clone(), progress: store.progress(&g.id) })
    .collect()
}

pub fn list_challenges(state: &AppState) -> Vec<ChallengeOut> {
  state.challenges.iter().map(to_out).collect()
}

#[instrument(level = "debug", skip(state, pattern), fields(%challenge_id, pattern = %trunc_for_log(pattern, 80)))]
pub fn validate_pattern(state: &AppState, challenge_id: u32, pattern: &str) -> Result<ValidationResult, ApiError> {
  let ch = state
    .challenge(challenge_id)
    .ok_or_else(|| ApiError::NotFound(format!("Unknown challengeId: {}", challenge_id)))?;
  Ok(validator::validate(pattern, ch, state.strictness))
}

pub fn hints_for(state: &AppState, challenge_id: u32) -> Result<Vec<String>, ApiError> {
  state
    .challenge(challenge_id)
    .map(|c| c.hints.clone())
    .ok_or_else(|| ApiError::NotFound(format!("Unknown challengeId: {}", challenge_id)))
}

/// Sessions idle longer than this are dropped when a new one starts.
const SESSION_TTL_SECS: i64 = 2 * 60 * 60;
/// Upper bound on live sessions; the oldest go first.
const MAX_LIVE_SESSIONS: usize = 512;

fn prune_sessions(sessions: &mut HashMap<String, RegexSession>, now: DateTime<Utc>) {
  let before = sessions.len();
  sessions.retain(|_, s| (now - s.started_at).num_seconds() < SESSION_TTL_SECS);
  if sessions.len() >= MAX_LIVE_SESSIONS {
    let mut by_age: Vec<(DateTime<Utc>, String)> = sessions.iter().map(|(id, s)| (s.started_at, id.clone())).collect();
    by_age.sort();
    let excess = sessions.len() + 1 - MAX_LIVE_SESSIONS;
    for (_, id) in by_age.into_iter().take(excess) {
      sessions.remove(&id);
    }
  }
  let evicted = before - sessions.len();
  if evicted > 0 {
    debug!(target: "challenge", evicted, live = sessions.len(), "Pruned regex sessions");
  }
}

#[instrument(level = "info", skip(state))]
pub async fn start_session(state: &AppState) -> Result<SessionOut, ApiError> {
  if !state.store.read().await.is_unlocked(REGEX_GAME_ID) {
    return Err(ApiError::Locked("Complete previous levels to unlock this game".into()));
  }
  let session = RegexSession::new();
  let out = session_out(&session, &state.challenges);
  info!(target: "challenge", session = %session.id, total = out.total, "Regex session started");
  let mut sessions = state.sessions.write().await;
  prune_sessions(&mut sessions, Utc::now());
  sessions.insert(session.id.clone(), session);
  Ok(out)
}

/// Submit a pattern for the session's current challenge. The submit that
/// clears the last challenge records the completion and its play time in one
/// write, and only then ends the session. If that write fails the session is
/// put back as it was so the client can submit again.
#[instrument(level = "info", skip(state, pattern), fields(%session_id, pattern = %trunc_for_log(pattern, 80)))]
pub async fn submit_answer(state: &AppState, session_id: &str, pattern: &str) -> Result<SubmitOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  let session = sessions
    .get_mut(session_id)
    .ok_or_else(|| ApiError::NotFound(format!("Unknown sessionId: {}", session_id)))?;
  let before = session.clone();
  let outcome = session
    .submit(pattern, &state.challenges, state.strictness)
    .ok_or_else(|| ApiError::BadRequest("Session already finished".into()))?;
  let snapshot = session.clone();

  let completion = if outcome.finished {
    let mut store = state.store.write().await;
    match store.record_run(REGEX_GAME_ID, snapshot.score, snapshot.elapsed_secs(Utc::now())) {
      Ok(c) => {
        sessions.remove(session_id);
        Some(c)
      }
      Err(e) => {
        sessions.insert(session_id.to_string(), before);
        return Err(e.into());
      }
    }
  } else {
    None
  };

  Ok(SubmitOut {
    accepted: outcome.accepted,
    awarded: outcome.awarded,
    result: outcome.result,
    session: session_out(&snapshot, &state.challenges),
    completion,
  })
}

pub async fn session_hints(state: &AppState, session_id: &str) -> Result<Vec<String>, ApiError> {
  let mut sessions = state.sessions.write().await;
  let session = sessions
    .get_mut(session_id)
    .ok_or_else(|| ApiError::NotFound(format!("Unknown sessionId: {}", session_id)))?;
  let hints = session.reveal_hints(&state.challenges);
  debug!(target: "challenge", session = %session_id, revealed = session.hints_revealed, "Hints revealed");
  Ok(hints)
}

pub async fn restart_session(state: &AppState, session_id: &str) -> Result<SessionOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  let session = sessions
    .get_mut(session_id)
    .ok_or_else(|| ApiError::NotFound(format!("Unknown sessionId: {}", session_id)))?;
  session.restart();
  Ok(session_out(session, &state.challenges))
}

/// Completion reported by a game outside the regex engine. Locked levels are refused.
#[instrument(level = "info", skip(state), fields(%game_id))]
pub async fn record_completion(state: &AppState, game_id: &str, score: u32) -> Result<CompletionOutcome, ApiError> {
  let mut store = state.store.write().await;
  if store.game(game_id).is_none() {
    return Err(ApiError::NotFound(format!("Unknown gameId: {}", game_id)));
  }
  if !store.is_unlocked(game_id) {
    warn!(target: "progress", %game_id, "Completion for locked level refused");
    return Err(ApiError::Locked(format!("Level '{}' is locked", game_id)));
  }
  Ok(store.record_completion(game_id, score)?)
}

/// Rank a score outside of a completion (e.g. a failed run).
pub async fn record_score(state: &AppState, game_id: &str, score: u32) -> Result<Vec<ScoreEntry>, ApiError> {
  let mut store = state.store.write().await;
  if store.game(game_id).is_none() {
    return Err(ApiError::NotFound(format!("Unknown gameId: {}", game_id)));
  }
  store.record_score(game_id, score)?;
  Ok(store.high_scores(game_id).to_vec())
}

pub async fn high_scores(state: &AppState, game_id: &str) -> Vec<ScoreEntry> {
  state.store.read().await.high_scores(game_id).to_vec()
}

pub async fn achievements(state: &AppState) -> Vec<Achievement> {
  state.store.read().await.achievements().to_vec()
}

/// Add play time and hand back any milestones it earned.
pub async fn add_play_time(state: &AppState, seconds: u64) -> Result<Vec<Achievement>, ApiError> {
  let mut store = state.store.write().await;
  store.add_play_time(seconds)?;
  Ok(store.check_milestones()?)
}

pub async fn progress_document(state: &AppState) -> ProgressDocument {
  state.store.read().await.document().clone()
}

pub async fn progress_stats(state: &AppState) -> StatsSummary {
  state.store.read().await.stats()
}

pub async fn settings(state: &AppState) -> Settings {
  state.store.read().await.settings().clone()
}

pub async fn update_settings(state: &AppState, patch: serde_json::Value) -> Result<Settings, ApiError> {
  let patch = crate::progress::settings_from_value(patch)?;
  let mut store = state.store.write().await;
  Ok(store.update_settings(patch)?.clone())
}

pub async fn export_progress(state: &AppState) -> Result<String, ApiError> {
  Ok(state.store.read().await.export_data()?)
}

#[instrument(level = "info", skip(state, raw), fields(raw_len = raw.len()))]
pub async fn import_progress(state: &AppState, raw: &str) -> Result<(), ApiError> {
  state.store.write().await.import_data(raw)?;
  Ok(())
}

pub async fn reset_progress(state: &AppState) -> Result<(), ApiError> {
  state.store.write().await.clear()?;
  Ok(())
}

pub fn new_drill(state: &AppState) -> Result<DrillOut, ApiError> {
  if state.drills.is_empty() {
    return Err(ApiError::NotFound("No drills configured".into()));
  }
  let idx = rand::thread_rng().gen_range(0..state.drills.len());
  Ok(drill_out(idx, &state.drills[idx]))
}

pub fn check_drill(state: &AppState, drill_id: usize, input: &str) -> Result<DrillVerdict, ApiError> {
  let drill = state
    .drills
    .get(drill_id)
    .ok_or_else(|| ApiError::NotFound(format!("Unknown drillId: {}", drill_id)))?;
  Ok(validator::check_drill(input, drill))
}
