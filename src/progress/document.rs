//! The persisted progress document (current schema) and the import merge rules.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::GameInfo;
use crate::error::GameError;

pub const SCHEMA_VERSION: u32 = 2;
/// Version string stamped on exports.
pub const APP_VERSION: &str = "2.0.0";
pub const TOP_SCORES: usize = 10;

pub type Settings = BTreeMap<String, Value>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgressDocument {
  pub schema_version: u32,
  pub current_level: u32,
  pub unlocked_levels: BTreeSet<u32>,
  pub scores: BTreeMap<String, Vec<ScoreEntry>>,
  pub achievements: Vec<Achievement>,
  pub settings: Settings,
  pub stats: Stats,
  pub game_progress: BTreeMap<String, GameProgress>,
  pub last_played: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
  pub score: u32,
  pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Achievement {
  pub id: String,
  pub title: String,
  pub description: String,
  pub icon: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
  /// Seconds.
  pub total_play_time: u64,
  pub games_completed: u32,
  pub total_score: u64,
  pub best_streak: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameProgress {
  pub level: u32,
  pub completed: bool,
  pub best_score: u32,
  /// Seconds, 0 when never timed.
  #[serde(default)]
  pub best_time: u64,
}

impl GameProgress {
  pub fn new(level: u32) -> Self {
    Self { level, completed: false, best_score: 0, best_time: 0 }
  }
}

pub fn default_settings() -> Settings {
  let mut s = Settings::new();
  s.insert("soundEnabled".into(), Value::Bool(true));
  s.insert("musicEnabled".into(), Value::Bool(true));
  s.insert("difficulty".into(), Value::String("normal".into()));
  s.insert("theme".into(), Value::String("cyberpunk".into()));
  s
}

impl ProgressDocument {
  /// Fresh state: level 1 unlocked, nothing completed.
  pub fn new_default(catalog: &[GameInfo]) -> Self {
    let mut doc = Self {
      schema_version: SCHEMA_VERSION,
      current_level: 1,
      unlocked_levels: BTreeSet::from([1]),
      scores: BTreeMap::new(),
      achievements: Vec::new(),
      settings: default_settings(),
      stats: Stats::default(),
      game_progress: BTreeMap::new(),
      last_played: None,
    };
    doc.ensure_catalog(catalog);
    doc
  }

  /// Give every catalog game a progress entry and keep level 1 open.
  pub fn ensure_catalog(&mut self, catalog: &[GameInfo]) {
    for g in catalog {
      self.game_progress.entry(g.id.clone()).or_insert_with(|| GameProgress::new(g.level));
    }
    self.unlocked_levels.insert(1);
  }

  /// Reject values the types allow but the game never produces.
  pub fn check(&self) -> Result<(), GameError> {
    if self.schema_version != SCHEMA_VERSION {
      return Err(GameError::malformed(format!("unexpected schemaVersion {}", self.schema_version)));
    }
    if self.current_level == 0 || self.unlocked_levels.contains(&0) {
      return Err(GameError::malformed("levels are 1-based"));
    }
    if self.game_progress.values().any(|p| p.level == 0) {
      return Err(GameError::malformed("game progress level must be >= 1"));
    }
    Ok(())
  }

  /// Insert a score keeping the list sorted (best first) and capped.
  pub fn push_score(&mut self, game_id: &str, score: u32, at: DateTime<Utc>) {
    let list = self.scores.entry(game_id.to_string()).or_default();
    list.push(ScoreEntry { score, timestamp: at });
    list.sort_by(|a, b| b.score.cmp(&a.score));
    list.truncate(TOP_SCORES);
    self.stats.total_score += u64::from(score);
  }

  /// Add unless an achievement with the same id exists. Returns whether it was new.
  pub fn add_achievement(&mut self, achievement: Achievement) -> bool {
    if self.achievements.iter().any(|a| a.id == achievement.id) {
      return false;
    }
    self.achievements.push(achievement);
    true
  }

  /// Fold an imported document into this one without reversing any ratchet.
  pub fn merge_from(&mut self, imported: &ProgressDocument) {
    self.unlocked_levels.extend(imported.unlocked_levels.iter().copied());
    self.current_level = self.current_level.max(imported.current_level);

    for a in &imported.achievements {
      self.add_achievement(a.clone());
    }

    for (game_id, theirs) in &imported.game_progress {
      let merged = match self.game_progress.get(game_id) {
        Some(ours) => GameProgress {
          level: ours.level.max(theirs.level),
          completed: ours.completed || theirs.completed,
          best_score: ours.best_score.max(theirs.best_score),
          best_time: match (ours.best_time, theirs.best_time) {
            (0, t) | (t, 0) => t,
            (a, b) => a.min(b),
          },
        },
        None => theirs.clone(),
      };
      self.game_progress.insert(game_id.clone(), merged);
    }

    for (game_id, entries) in &imported.scores {
      let list = self.scores.entry(game_id.clone()).or_default();
      for e in entries {
        if !list.contains(e) {
          list.push(e.clone());
        }
      }
      list.sort_by(|a, b| b.score.cmp(&a.score));
      list.truncate(TOP_SCORES);
    }

    self.stats = Stats {
      total_play_time: self.stats.total_play_time.max(imported.stats.total_play_time),
      games_completed: self.stats.games_completed.max(imported.stats.games_completed),
      total_score: self.stats.total_score.max(imported.stats.total_score),
      best_streak: self.stats.best_streak.max(imported.stats.best_streak),
    };
  }
}

/// Export wire format: the document plus export metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope<'a> {
  #[serde(flatten)]
  pub document: &'a ProgressDocument,
  pub exported_at: DateTime<Utc>,
  pub version: &'static str,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::seed_catalog;
  use chrono::TimeZone;

  fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
  }

  #[test]
  fn test_default_document_shape() {
    let doc = ProgressDocument::new_default(&seed_catalog());
    assert_eq!(doc.current_level, 1);
    assert_eq!(doc.unlocked_levels, BTreeSet::from([1]));
    assert_eq!(doc.game_progress.len(), 7);
    assert_eq!(doc.game_progress["pong"].level, 4);
    assert_eq!(doc.settings["theme"], Value::String("cyberpunk".into()));
    assert!(doc.check().is_ok());
  }

  #[test]
  fn test_push_score_keeps_top_ten() {
    let mut doc = ProgressDocument::new_default(&seed_catalog());
    for i in 0..15u32 {
      doc.push_score("regex", i * 10, ts(i as i64));
    }
    let list = &doc.scores["regex"];
    assert_eq!(list.len(), TOP_SCORES);
    assert_eq!(list[0].score, 140);
    assert_eq!(list[9].score, 50);
    assert_eq!(doc.stats.total_score, (0..15u64).map(|i| i * 10).sum::<u64>());
  }

  #[test]
  fn test_merge_never_reverses() {
    let catalog = seed_catalog();
    let mut ours = ProgressDocument::new_default(&catalog);
    ours.unlocked_levels.insert(2);
    ours.current_level = 2;
    ours.game_progress.get_mut("regex").unwrap().completed = true;
    ours.game_progress.get_mut("regex").unwrap().best_score = 300;
    ours.game_progress.get_mut("regex").unwrap().best_time = 90;

    let mut theirs = ProgressDocument::new_default(&catalog);
    theirs.game_progress.get_mut("regex").unwrap().best_score = 100;
    theirs.game_progress.get_mut("regex").unwrap().best_time = 60;
    theirs.game_progress.get_mut("tetris").unwrap().completed = true;
    theirs.unlocked_levels.insert(3);
    theirs.stats.best_streak = 4;

    ours.merge_from(&theirs);
    assert_eq!(ours.unlocked_levels, BTreeSet::from([1, 2, 3]));
    assert_eq!(ours.current_level, 2);
    let regex = &ours.game_progress["regex"];
    assert!(regex.completed);
    assert_eq!(regex.best_score, 300);
    assert_eq!(regex.best_time, 60);
    assert!(ours.game_progress["tetris"].completed);
    assert_eq!(ours.stats.best_streak, 4);
  }

  #[test]
  fn test_check_rejects_zero_levels() {
    let mut doc = ProgressDocument::new_default(&seed_catalog());
    doc.current_level = 0;
    assert!(matches!(doc.check(), Err(GameError::MalformedPersistedData(_))));
  }
}
