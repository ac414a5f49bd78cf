//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::logic::{self, ApiError};
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Locked(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorOut { message: self.message().to_string() })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(OkOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_games(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::list_games(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_challenges(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::list_challenges(&state))
}

#[instrument(level = "info", skip(state, body), fields(challenge_id = body.challenge_id, pattern_len = body.pattern.len()))]
pub async fn http_post_validate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ValidateIn>,
) -> Result<impl IntoResponse, ApiError> {
  let result = logic::validate_pattern(&state, body.challenge_id, &body.pattern)?;
  info!(target: "challenge", id = body.challenge_id, valid = result.is_valid_regex, matched = result.matched_count, total = result.total_count, all_pass = result.all_pass, "HTTP validate evaluated");
  Ok(Json(result))
}

#[instrument(level = "info", skip(state), fields(challenge_id = q.challenge_id))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HintQuery>,
) -> Result<impl IntoResponse, ApiError> {
  let hints = logic::hints_for(&state, q.challenge_id)?;
  info!(target: "challenge", id = q.challenge_id, "HTTP hint served");
  Ok(Json(HintOut { hints }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::start_session(&state).await?))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id, pattern_len = body.pattern.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = logic::submit_answer(&state, &body.session_id, &body.pattern).await?;
  info!(target: "challenge", session = %body.session_id, accepted = out.accepted, awarded = out.awarded, finished = out.session.finished, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id))]
pub async fn http_post_session_hint(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionRef>,
) -> Result<impl IntoResponse, ApiError> {
  let hints = logic::session_hints(&state, &body.session_id).await?;
  Ok(Json(HintOut { hints }))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id))]
pub async fn http_post_session_restart(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionRef>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::restart_session(&state, &body.session_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::progress_document(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_progress(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  logic::reset_progress(&state).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(%body.game_id, score = body.score))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteIn>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = logic::record_completion(&state, &body.game_id, body.score).await?;
  info!(target: "progress", game = %body.game_id, best = outcome.record.best_score, unlocked_next = ?outcome.unlocked_next, "HTTP completion recorded");
  Ok(Json(outcome))
}

#[instrument(level = "info", skip(state, body), fields(%body.game_id, score = body.score))]
pub async fn http_post_score(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ScoreIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::record_score(&state, &body.game_id, body.score).await?))
}

#[instrument(level = "info", skip(state), fields(%q.game_id))]
pub async fn http_get_scores(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ScoresQuery>,
) -> impl IntoResponse {
  Json(logic::high_scores(&state, &q.game_id).await)
}

#[instrument(level = "info", skip(state, body), fields(seconds = body.seconds))]
pub async fn http_post_play_time(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PlayTimeIn>,
) -> Result<impl IntoResponse, ApiError> {
  let earned = logic::add_play_time(&state, body.seconds).await?;
  if !earned.is_empty() {
    info!(target: "progress", count = earned.len(), "Milestones earned from play time");
  }
  Ok(Json(earned))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_achievements(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::achievements(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::progress_stats(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::settings(&state).await)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_put_settings(
  State(state): State<Arc<AppState>>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::update_settings(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let text = logic::export_progress(&state).await?;
  Ok(([(header::CONTENT_TYPE, "application/json")], text))
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_post_import(State(state): State<Arc<AppState>>, body: String) -> Result<impl IntoResponse, ApiError> {
  logic::import_progress(&state, &body).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_drill(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::new_drill(&state)?))
}

#[instrument(level = "info", skip(state, body), fields(drill_id = body.drill_id, input_len = body.input.len()))]
pub async fn http_post_drill_check(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DrillCheckIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::check_drill(&state, body.drill_id, &body.input)?))
}
