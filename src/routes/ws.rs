//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//! The client sends `validate` on every keystroke, so that path stays cheap and stateless.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::{self, ApiError};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "vibe_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "vibe_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "vibe_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "vibe_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "vibe_backend", "WebSocket disconnected");
}

fn error_msg(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.message().to_string() }
}

#[instrument(level = "debug", skip(state))]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Validate { challenge_id, pattern } => match logic::validate_pattern(state, challenge_id, &pattern) {
      Ok(result) => ServerWsMessage::Validation { challenge_id, result },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::StartSession => match logic::start_session(state).await {
      Ok(session) => {
        info!(target: "challenge", session = %session.session_id, "WS session started");
        ServerWsMessage::Session { session }
      }
      Err(e) => error_msg(e),
    },

    ClientWsMessage::SubmitAnswer { session_id, pattern } => match logic::submit_answer(state, &session_id, &pattern).await {
      Ok(outcome) => {
        info!(target: "challenge", session = %session_id, accepted = outcome.accepted, "WS submit_answer evaluated");
        ServerWsMessage::AnswerResult { outcome }
      }
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Hint { session_id } => match logic::session_hints(state, &session_id).await {
      Ok(hints) => ServerWsMessage::Hint { hints },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::RestartSession { session_id } => match logic::restart_session(state, &session_id).await {
      Ok(session) => ServerWsMessage::Session { session },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::NewDrill => match logic::new_drill(state) {
      Ok(drill) => ServerWsMessage::Drill { drill },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::DrillCheck { drill_id, input } => match logic::check_drill(state, drill_id, &input) {
      Ok(verdict) => ServerWsMessage::DrillResult { verdict },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Progress => ServerWsMessage::Progress { games: logic::list_games(state).await },
  }
}
