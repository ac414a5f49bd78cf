//! Versioned decoding of stored and imported progress.
//!
//! Documents without `schemaVersion` are the legacy browser layout (v1). They
//! are mapped field by field into the current schema; anything that does not
//! type-check is rejected instead of being merged in.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::document::{
  default_settings, Achievement, GameProgress, ProgressDocument, ScoreEntry, Settings, Stats, SCHEMA_VERSION,
};
use crate::error::GameError;

/// Legacy layout. Every field is optional since older saves were partial.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LegacyDocumentV1 {
  current_level: Option<u32>,
  unlocked_levels: Option<Vec<u32>>,
  scores: BTreeMap<String, Vec<ScoreEntry>>,
  achievements: Vec<Achievement>,
  settings: Option<Settings>,
  stats: Stats,
  game_progress: BTreeMap<String, LegacyGameProgressV1>,
  last_played: Option<DateTime<Utc>>,
}

/// Per-game counters (linesCleared, wins, ...) are not carried over.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LegacyGameProgressV1 {
  level: Option<u32>,
  completed: bool,
  best_score: u32,
  best_time: u64,
}

impl LegacyDocumentV1 {
  fn into_current(self) -> ProgressDocument {
    let mut unlocked_levels: BTreeSet<u32> =
      self.unlocked_levels.unwrap_or_default().into_iter().filter(|l| *l > 0).collect();
    unlocked_levels.insert(1);

    let mut settings = default_settings();
    if let Some(stored) = self.settings {
      settings.extend(stored);
    }

    let game_progress = self
      .game_progress
      .into_iter()
      .map(|(id, p)| {
        let level = p.level.filter(|l| *l > 0).unwrap_or(1);
        (id, GameProgress { level, completed: p.completed, best_score: p.best_score, best_time: p.best_time })
      })
      .collect();

    ProgressDocument {
      schema_version: SCHEMA_VERSION,
      current_level: self.current_level.filter(|l| *l > 0).unwrap_or(1),
      unlocked_levels,
      scores: self.scores,
      achievements: self.achievements,
      settings,
      stats: self.stats,
      game_progress,
      last_played: self.last_played,
    }
  }
}

/// Bring any supported schema version up to the current one.
pub fn migrate(value: Value) -> Result<ProgressDocument, GameError> {
  let obj = value.as_object().ok_or_else(|| GameError::malformed("document is not a JSON object"))?;
  let version = match obj.get("schemaVersion") {
    None => 1,
    Some(v) => v
      .as_u64()
      .ok_or_else(|| GameError::malformed("schemaVersion is not an integer"))?,
  };

  let doc = match version {
    1 => serde_json::from_value::<LegacyDocumentV1>(value)?.into_current(),
    v if v == u64::from(SCHEMA_VERSION) => serde_json::from_value::<ProgressDocument>(value)?,
    other => return Err(GameError::malformed(format!("unsupported schemaVersion {}", other))),
  };
  doc.check()?;
  Ok(doc)
}

/// Decode a stored blob.
pub fn decode_document(raw: &str) -> Result<ProgressDocument, GameError> {
  let value: Value = serde_json::from_str(raw)?;
  migrate(value)
}

/// Decode an export. `version` and `gameProgress` are required; export metadata is stripped.
pub fn decode_export(raw: &str) -> Result<ProgressDocument, GameError> {
  let mut value: Value = serde_json::from_str(raw)?;
  let obj = value
    .as_object_mut()
    .ok_or_else(|| GameError::malformed("export is not a JSON object"))?;
  if !obj.get("version").map_or(false, Value::is_string) {
    return Err(GameError::malformed("missing version"));
  }
  if !obj.get("gameProgress").map_or(false, Value::is_object) {
    return Err(GameError::malformed("missing gameProgress"));
  }
  obj.remove("version");
  obj.remove("exportedAt");
  migrate(value)
}
