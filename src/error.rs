//! Domain errors. Both kinds are recoverable: callers turn them into inline
//! feedback (bad pattern) or fall back to defaults / reject an import (bad data).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
  /// The user's pattern does not compile (usually: still typing).
  #[error("Invalid regex pattern: {0}")]
  InvalidPattern(String),
  /// Stored or imported progress is corrupt or of an unsupported schema.
  #[error("Malformed persisted data: {0}")]
  MalformedPersistedData(String),
}

impl GameError {
  pub fn malformed(msg: impl Into<String>) -> Self {
    GameError::MalformedPersistedData(msg.into())
  }
}

impl From<serde_json::Error> for GameError {
  fn from(e: serde_json::Error) -> Self {
    GameError::MalformedPersistedData(e.to_string())
  }
}
