//! Progression store: completion, scores, unlocks, achievements and settings,
//! persisted as one JSON document.
//!
//! The store is an explicit instance (`create` / `dispose`) handed to whoever
//! needs it. Mutating operations work on a copy of the document and only swap
//! it in after the backend accepted the write, so a failed write leaves the
//! in-memory state as it was.
//!
//! Per game the state only moves forward: locked -> unlocked -> completed.

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{GameInfo, ProgressRecord};
use crate::error::GameError;
use crate::util::fill_template;

pub mod backend;
pub mod document;
pub mod migrate;

pub use backend::{FileBackend, MemoryBackend, ProgressBackend};
pub use document::{Achievement, ProgressDocument, ScoreEntry, Settings, Stats};

/// Well-known key the document is stored under.
pub const STORAGE_KEY: &str = "vibeWithUs_gameData";

const PLAYTIME_MILESTONE_SECS: u64 = 3600;
const SCORE_MILESTONE: u64 = 10_000;
const GAMES_MILESTONE: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Game(#[from] GameError),
  #[error("storage backend failure: {0}")]
  Io(#[from] io::Error),
}

/// Things observers get told about.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
  DataSaved,
  DataCleared,
  DataImported,
  ProgressUpdated { game_id: String, record: ProgressRecord },
  ScoreRecorded { game_id: String, score: u32 },
  LevelUnlocked { level: u32, game_id: String },
  AchievementUnlocked(Achievement),
  SettingsUpdated,
}

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Observer = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// What a completion changed.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
  pub game_id: String,
  pub first_completion: bool,
  pub new_best: bool,
  pub record: ProgressRecord,
  pub unlocked_next: Option<String>,
  pub achievements: Vec<Achievement>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
  #[serde(flatten)]
  pub stats: Stats,
  pub current_level: u32,
  pub overall_progress: u32,
  pub achievements_count: usize,
  pub last_played: Option<DateTime<Utc>>,
}

pub struct ProgressStore {
  backend: Box<dyn ProgressBackend>,
  key: String,
  catalog: Vec<GameInfo>,
  doc: ProgressDocument,
  observers: Vec<(Subscription, Observer)>,
  next_subscription: u64,
}

impl ProgressStore {
  /// Build a store over `backend` and load whatever is stored under `key`.
  #[instrument(level = "info", skip(backend, catalog), fields(games = catalog.len()))]
  pub fn create(backend: Box<dyn ProgressBackend>, key: &str, catalog: Vec<GameInfo>) -> Self {
    let doc = ProgressDocument::new_default(&catalog);
    let mut store = Self {
      backend,
      key: key.to_string(),
      catalog,
      doc,
      observers: Vec::new(),
      next_subscription: 0,
    };
    store.load();
    store
  }

  /// Final flush. Observers are dropped with the store.
  #[instrument(level = "info", skip(self), fields(key = %self.key))]
  pub fn dispose(self) -> Result<(), StoreError> {
    self.write_blob(&self.doc)?;
    info!(target: "progress", observers = self.observers.len(), "Progress store disposed");
    Ok(())
  }

  /// Re-read the stored document. Missing data is initialized with defaults;
  /// corrupt or unsupported data falls back to defaults without failing.
  #[instrument(level = "debug", skip(self), fields(key = %self.key))]
  pub fn load(&mut self) -> &ProgressDocument {
    let default = || ProgressDocument::new_default(&self.catalog);
    let doc = match self.backend.read(&self.key) {
      Ok(None) => {
        let doc = default();
        if let Err(e) = self.write_blob(&doc) {
          error!(target: "progress", error = %e, "Failed to write initial progress document");
        }
        info!(target: "progress", "No stored progress; initialized defaults");
        doc
      }
      Ok(Some(raw)) => match migrate::decode_document(&raw) {
        Ok(mut doc) => {
          doc.ensure_catalog(&self.catalog);
          debug!(target: "progress", current_level = doc.current_level, "Loaded stored progress");
          doc
        }
        Err(e) => {
          warn!(target: "progress", error = %e, "Stored progress unreadable; using defaults");
          default()
        }
      },
      Err(e) => {
        error!(target: "progress", error = %e, "Failed to read stored progress; using defaults");
        default()
      }
    };
    self.doc = doc;
    &self.doc
  }

  /// Replace the whole document and persist it.
  pub fn save(&mut self, doc: ProgressDocument) -> Result<(), StoreError> {
    doc.check()?;
    self.commit(doc)?;
    Ok(())
  }

  pub fn document(&self) -> &ProgressDocument {
    &self.doc
  }

  pub fn catalog(&self) -> &[GameInfo] {
    &self.catalog
  }

  pub fn game(&self, game_id: &str) -> Option<&GameInfo> {
    self.catalog.iter().find(|g| g.id == game_id)
  }

  fn next_game(&self, game_id: &str) -> Option<&GameInfo> {
    let pos = self.catalog.iter().position(|g| g.id == game_id)?;
    self.catalog.get(pos + 1)
  }

  pub fn is_unlocked(&self, game_id: &str) -> bool {
    self.game(game_id).map_or(false, |g| self.doc.unlocked_levels.contains(&g.level))
  }

  pub fn get_best_score(&self, game_id: &str) -> u32 {
    self.doc.game_progress.get(game_id).map_or(0, |p| p.best_score)
  }

  pub fn progress(&self, game_id: &str) -> ProgressRecord {
    ProgressRecord {
      completed: self.doc.game_progress.get(game_id).map_or(false, |p| p.completed),
      best_score: self.get_best_score(game_id),
      unlocked: self.is_unlocked(game_id),
    }
  }

  pub fn current_level(&self) -> u32 {
    self.doc.current_level
  }

  pub fn high_scores(&self, game_id: &str) -> &[ScoreEntry] {
    self.doc.scores.get(game_id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn achievements(&self) -> &[Achievement] {
    &self.doc.achievements
  }

  pub fn settings(&self) -> &Settings {
    &self.doc.settings
  }

  /// Percentage of games completed, rounded.
  pub fn overall_progress(&self) -> u32 {
    let total = self.doc.game_progress.len();
    if total == 0 {
      return 0;
    }
    let completed = self.doc.game_progress.values().filter(|p| p.completed).count();
    ((completed as f64 / total as f64) * 100.0).round() as u32
  }

  pub fn stats(&self) -> StatsSummary {
    StatsSummary {
      stats: self.doc.stats.clone(),
      current_level: self.current_level(),
      overall_progress: self.overall_progress(),
      achievements_count: self.doc.achievements.len(),
      last_played: self.doc.last_played,
    }
  }

  /// Mark a game completed with `score`: best score ratchets up, the score is
  /// ranked, the next level unlocks and milestones are checked. One write.
  pub fn record_completion(&mut self, game_id: &str, score: u32) -> Result<CompletionOutcome, StoreError> {
    self.record_run(game_id, score, 0)
  }

  /// Completion plus the play time it took, committed together.
  #[instrument(level = "info", skip(self), fields(%game_id))]
  pub fn record_run(&mut self, game_id: &str, score: u32, play_secs: u64) -> Result<CompletionOutcome, StoreError> {
    let now = Utc::now();
    let mut doc = self.doc.clone();
    doc.stats.total_play_time += play_secs;
    let level = self.game(game_id).map_or(1, |g| g.level);

    let entry = doc
      .game_progress
      .entry(game_id.to_string())
      .or_insert_with(|| document::GameProgress::new(level));
    let first_completion = !entry.completed;
    let new_best = score > entry.best_score;
    entry.completed = true;
    entry.best_score = entry.best_score.max(score);
    if first_completion {
      doc.stats.games_completed += 1;
    }
    doc.push_score(game_id, score, now);

    let mut events = vec![ProgressEvent::ScoreRecorded { game_id: game_id.to_string(), score }];
    let mut awarded = Vec::new();
    let mut unlocked_next = None;
    if let Some(next) = self.next_game(game_id) {
      if doc.unlocked_levels.insert(next.level) {
        doc.current_level = doc.current_level.max(next.level);
        let achievement = unlock_achievement(next.level, now);
        if doc.add_achievement(achievement.clone()) {
          awarded.push(achievement);
        }
        events.push(ProgressEvent::LevelUnlocked { level: next.level, game_id: next.id.clone() });
        unlocked_next = Some(next.id.clone());
      }
    }
    awarded.extend(self.award_milestones(&mut doc, now));
    doc.last_played = Some(now);

    self.commit(doc)?;

    let record = self.progress(game_id);
    events.push(ProgressEvent::ProgressUpdated { game_id: game_id.to_string(), record: record.clone() });
    events.extend(awarded.iter().cloned().map(ProgressEvent::AchievementUnlocked));
    for ev in &events {
      self.emit(ev);
    }
    info!(target: "progress", %game_id, score, first_completion, new_best, unlocked_next = ?unlocked_next, "Completion recorded");

    Ok(CompletionOutcome {
      game_id: game_id.to_string(),
      first_completion,
      new_best,
      record,
      unlocked_next,
      achievements: awarded,
    })
  }

  /// Rank a score without touching completion.
  #[instrument(level = "debug", skip(self), fields(%game_id))]
  pub fn record_score(&mut self, game_id: &str, score: u32) -> Result<(), StoreError> {
    let mut doc = self.doc.clone();
    doc.push_score(game_id, score, Utc::now());
    self.commit(doc)?;
    self.emit(&ProgressEvent::ScoreRecorded { game_id: game_id.to_string(), score });
    Ok(())
  }

  /// Merge named options into the settings map.
  pub fn update_settings(&mut self, changes: Settings) -> Result<&Settings, StoreError> {
    let mut doc = self.doc.clone();
    doc.settings.extend(changes);
    self.commit(doc)?;
    self.emit(&ProgressEvent::SettingsUpdated);
    Ok(&self.doc.settings)
  }

  pub fn add_play_time(&mut self, seconds: u64) -> Result<(), StoreError> {
    let mut doc = self.doc.clone();
    doc.stats.total_play_time += seconds;
    self.commit(doc)?;
    Ok(())
  }

  /// Award any milestone achievements the current stats qualify for.
  pub fn check_milestones(&mut self) -> Result<Vec<Achievement>, StoreError> {
    let mut doc = self.doc.clone();
    let awarded = self.award_milestones(&mut doc, Utc::now());
    if awarded.is_empty() {
      return Ok(awarded);
    }
    self.commit(doc)?;
    for a in &awarded {
      self.emit(&ProgressEvent::AchievementUnlocked(a.clone()));
    }
    Ok(awarded)
  }

  fn award_milestones(&self, doc: &mut ProgressDocument, now: DateTime<Utc>) -> Vec<Achievement> {
    let all_games = self.catalog.len() as u32;
    let candidates = [
      (doc.stats.total_play_time >= PLAYTIME_MILESTONE_SECS, "playtime_1_hour", "Dedicated Player", "Played for 1 hour total", "⏰"),
      (doc.stats.total_score >= SCORE_MILESTONE, "score_10k", "Score Master", "Earned 10,000 total points", "💯"),
      (doc.stats.games_completed >= GAMES_MILESTONE, "games_3_complete", "Getting Good", "Completed 3 games", "🎯"),
      (all_games > 0 && doc.stats.games_completed >= all_games, "all_games_complete", "Champion of Champions", "Completed all games!", "👑"),
    ];
    let mut awarded = Vec::new();
    for (reached, id, title, description, icon) in candidates {
      if !reached {
        continue;
      }
      let a = Achievement { id: id.into(), title: title.into(), description: description.into(), icon: icon.into(), timestamp: now };
      if doc.add_achievement(a.clone()) {
        awarded.push(a);
      }
    }
    awarded
  }

  /// Drop all stored progress and start over from defaults.
  #[instrument(level = "info", skip(self), fields(key = %self.key))]
  pub fn clear(&mut self) -> Result<(), StoreError> {
    self.backend.remove(&self.key)?;
    self.doc = ProgressDocument::new_default(&self.catalog);
    self.emit(&ProgressEvent::DataCleared);
    warn!(target: "progress", "Progress cleared");
    Ok(())
  }

  /// Pretty-printed backup of the whole document.
  pub fn export_data(&self) -> Result<String, StoreError> {
    let envelope = document::ExportEnvelope {
      document: &self.doc,
      exported_at: Utc::now(),
      version: document::APP_VERSION,
    };
    Ok(serde_json::to_string_pretty(&envelope).map_err(io::Error::from)?)
  }

  /// Merge a backup into the current state. Any problem rejects the whole
  /// import and leaves the state untouched.
  #[instrument(level = "info", skip(self, raw), fields(raw_len = raw.len()))]
  pub fn import_data(&mut self, raw: &str) -> Result<(), StoreError> {
    let imported = match migrate::decode_export(raw) {
      Ok(doc) => doc,
      Err(e) => {
        warn!(target: "progress", error = %e, "Import rejected");
        return Err(e.into());
      }
    };
    let mut doc = self.doc.clone();
    doc.merge_from(&imported);
    doc.ensure_catalog(&self.catalog);
    self.save(doc)?;
    self.emit(&ProgressEvent::DataImported);
    info!(target: "progress", "Import merged");
    Ok(())
  }

  pub fn subscribe<F>(&mut self, observer: F) -> Subscription
  where
    F: Fn(&ProgressEvent) + Send + Sync + 'static,
  {
    let handle = Subscription(self.next_subscription);
    self.next_subscription += 1;
    self.observers.push((handle, Box::new(observer)));
    handle
  }

  /// Returns false when the handle was already gone.
  #[allow(dead_code)]
  pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
    let before = self.observers.len();
    self.observers.retain(|(h, _)| *h != handle);
    self.observers.len() != before
  }

  fn emit(&self, event: &ProgressEvent) {
    for (_, observer) in &self.observers {
      observer(event);
    }
  }

  fn write_blob(&self, doc: &ProgressDocument) -> io::Result<()> {
    let blob = serde_json::to_string(doc)?;
    self.backend.write(&self.key, &blob)
  }

  fn commit(&mut self, doc: ProgressDocument) -> io::Result<()> {
    self.write_blob(&doc)?;
    self.doc = doc;
    self.emit(&ProgressEvent::DataSaved);
    Ok(())
  }
}

fn unlock_achievement(level: u32, at: DateTime<Utc>) -> Achievement {
  let level_str = level.to_string();
  Achievement {
    id: fill_template("level_{level}_unlocked", &[("level", &level_str)]),
    title: "Level Unlocked!".into(),
    description: fill_template("You've unlocked level {level}", &[("level", &level_str)]),
    icon: "🔓".into(),
    timestamp: at,
  }
}

/// Settings patch from a JSON object body; anything else is rejected.
pub fn settings_from_value(value: Value) -> Result<Settings, GameError> {
  match value {
    Value::Object(map) => Ok(map.into_iter().collect()),
    _ => Err(GameError::malformed("settings must be a JSON object")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::seed_catalog;
  use std::collections::BTreeSet;
  use std::sync::{Arc, Mutex};

  fn fresh() -> (ProgressStore, MemoryBackend) {
    let backend = MemoryBackend::new();
    let store = ProgressStore::create(Box::new(backend.clone()), STORAGE_KEY, seed_catalog());
    (store, backend)
  }

  /// Backend whose writes always fail.
  struct BrokenBackend;
  impl ProgressBackend for BrokenBackend {
    fn read(&self, _key: &str) -> io::Result<Option<String>> { Ok(None) }
    fn write(&self, _key: &str, _blob: &str) -> io::Result<()> { Err(io::Error::new(io::ErrorKind::Other, "disk full")) }
    fn remove(&self, _key: &str) -> io::Result<()> { Ok(()) }
  }

  #[test]
  fn test_fresh_state_defaults() {
    let (store, backend) = fresh();
    assert!(store.is_unlocked("regex"));
    assert!(!store.is_unlocked("tetris"));
    assert!(!store.is_unlocked("unknown"));
    assert_eq!(store.get_best_score("regex"), 0);
    assert_eq!(store.current_level(), 1);
    // Missing data gets initialized on load.
    assert!(backend.read(STORAGE_KEY).unwrap().is_some());
  }

  #[test]
  fn test_record_completion_unlocks_next() {
    let (mut store, _) = fresh();
    let out = store.record_completion("regex", 100).unwrap();
    assert!(out.first_completion);
    assert!(out.new_best);
    assert_eq!(out.unlocked_next.as_deref(), Some("tetris"));
    assert_eq!(out.achievements[0].id, "level_2_unlocked");

    let p = &store.document().game_progress["regex"];
    assert!(p.completed);
    assert_eq!(p.best_score, 100);
    assert!(store.is_unlocked("tetris"));
    assert_eq!(store.current_level(), 2);
    assert_eq!(store.document().stats.games_completed, 1);
    assert_eq!(store.high_scores("regex")[0].score, 100);
    assert_eq!(store.progress("regex"), ProgressRecord { completed: true, best_score: 100, unlocked: true });
  }

  #[test]
  fn test_best_score_never_decreases() {
    let (mut store, _) = fresh();
    store.record_completion("regex", 50).unwrap();
    let out = store.record_completion("regex", 30).unwrap();
    assert!(!out.first_completion);
    assert!(!out.new_best);
    assert_eq!(out.unlocked_next, None);
    assert_eq!(store.get_best_score("regex"), 50);
    assert_eq!(store.document().stats.games_completed, 1);
    assert_eq!(store.high_scores("regex").len(), 2);
  }

  #[test]
  fn test_last_level_unlocks_nothing() {
    let (mut store, _) = fresh();
    let out = store.record_completion("final", 10).unwrap();
    assert_eq!(out.unlocked_next, None);
    assert_eq!(store.document().unlocked_levels, BTreeSet::from([1]));
  }

  #[test]
  fn test_state_survives_reload() {
    let backend = MemoryBackend::new();
    let mut store = ProgressStore::create(Box::new(backend.clone()), STORAGE_KEY, seed_catalog());
    store.record_completion("regex", 250).unwrap();
    let saved = store.document().clone();
    store.dispose().unwrap();

    let reopened = ProgressStore::create(Box::new(backend), STORAGE_KEY, seed_catalog());
    assert_eq!(reopened.document(), &saved);
    assert!(reopened.is_unlocked("tetris"));
  }

  #[test]
  fn test_save_then_load_roundtrip() {
    let (mut store, _) = fresh();
    let mut doc = store.document().clone();
    doc.current_level = 3;
    doc.unlocked_levels.extend([2, 3]);
    doc.stats.best_streak = 7;
    doc.last_played = Some(Utc::now());
    doc.settings.insert("volume".into(), Value::from(7));
    store.save(doc.clone()).unwrap();
    assert_eq!(store.load(), &doc);
  }

  #[test]
  fn test_save_rejects_invalid_document() {
    let (mut store, backend) = fresh();
    let stored_before = backend.read(STORAGE_KEY).unwrap();
    let mut doc = store.document().clone();
    doc.current_level = 0;
    let err = store.save(doc).unwrap_err();
    assert!(matches!(err, StoreError::Game(GameError::MalformedPersistedData(_))));

    let mut doc = store.document().clone();
    doc.schema_version = 7;
    assert!(store.save(doc).is_err());
    assert_eq!(store.current_level(), 1);
    assert_eq!(backend.read(STORAGE_KEY).unwrap(), stored_before);
  }

  #[test]
  fn test_record_run_is_one_write() {
    let (mut store, backend) = fresh();
    let out = store.record_run("regex", 450, 95).unwrap();
    assert_eq!(out.unlocked_next.as_deref(), Some("tetris"));
    let reopened = ProgressStore::create(Box::new(backend), STORAGE_KEY, seed_catalog());
    assert_eq!(reopened.document().stats.total_play_time, 95);
    assert!(reopened.progress("regex").completed);

    let mut broken = ProgressStore::create(Box::new(BrokenBackend), STORAGE_KEY, seed_catalog());
    assert!(broken.record_run("regex", 450, 95).is_err());
    assert_eq!(broken.document().stats.total_play_time, 0);
  }

  #[test]
  fn test_corrupt_data_loads_defaults() {
    let backend = MemoryBackend::new();
    backend.write(STORAGE_KEY, "{ this is not json").unwrap();
    let store = ProgressStore::create(Box::new(backend.clone()), STORAGE_KEY, seed_catalog());
    assert_eq!(store.document(), &ProgressDocument::new_default(&seed_catalog()));
    // Corrupt blob stays until the next write.
    assert_eq!(backend.read(STORAGE_KEY).unwrap().as_deref(), Some("{ this is not json"));
  }

  #[test]
  fn test_legacy_data_gets_catalog_entries() {
    let backend = MemoryBackend::new();
    backend
      .write(STORAGE_KEY, r#"{"currentLevel":1,"unlockedLevels":[1],"gameProgress":{"regex":{"level":1,"completed":false,"bestScore":20}}}"#)
      .unwrap();
    let store = ProgressStore::create(Box::new(backend), STORAGE_KEY, seed_catalog());
    assert_eq!(store.get_best_score("regex"), 20);
    assert_eq!(store.document().game_progress.len(), 7);
  }

  #[test]
  fn test_import_malformed_leaves_state() {
    let (mut store, backend) = fresh();
    store.record_completion("regex", 80).unwrap();
    let before = store.document().clone();
    let stored_before = backend.read(STORAGE_KEY).unwrap();

    for bad in ["{ nope", r#"{"gameProgress":{}}"#, r#"{"version":"2.0.0"}"#, r#"{"version":"2.0.0","gameProgress":{"regex":{"completed":"yes"}}}"#] {
      let err = store.import_data(bad).unwrap_err();
      assert!(matches!(err, StoreError::Game(GameError::MalformedPersistedData(_))));
      assert_eq!(store.document(), &before);
      assert_eq!(backend.read(STORAGE_KEY).unwrap(), stored_before);
    }
  }

  #[test]
  fn test_export_import_merges_without_relocking() {
    let (mut source, _) = fresh();
    source.record_completion("regex", 300).unwrap();
    source.record_completion("tetris", 40).unwrap();
    let exported = source.export_data().unwrap();
    assert!(exported.contains("\"exportedAt\""));
    assert!(exported.contains("\"version\": \"2.0.0\""));

    let (mut target, _) = fresh();
    target.record_completion("regex", 500).unwrap();
    target.import_data(&exported).unwrap();
    assert_eq!(target.get_best_score("regex"), 500);
    assert!(target.progress("tetris").completed);
    assert!(target.is_unlocked("snake"));
    assert_eq!(target.current_level(), 3);
  }

  #[test]
  fn test_import_legacy_export() {
    let (mut store, _) = fresh();
    let legacy = r#"{
      "currentLevel": 2, "unlockedLevels": [1, 2], "scores": {}, "achievements": [],
      "stats": { "totalPlayTime": 10, "gamesCompleted": 1, "totalScore": 100, "bestStreak": 0 },
      "gameProgress": { "regex": { "level": 1, "completed": true, "bestScore": 100, "bestTime": 0 } },
      "exportedAt": "2024-05-01T12:00:00.000Z", "version": "1.0.0"
    }"#;
    store.import_data(legacy).unwrap();
    assert!(store.is_unlocked("tetris"));
    assert_eq!(store.get_best_score("regex"), 100);
  }

  #[test]
  fn test_failed_write_keeps_memory_state() {
    let mut store = ProgressStore::create(Box::new(BrokenBackend), STORAGE_KEY, seed_catalog());
    let err = store.record_completion("regex", 10).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    assert!(!store.progress("regex").completed);
    assert!(!store.is_unlocked("tetris"));
  }

  #[test]
  fn test_observers_and_unsubscribe() {
    let (mut store, _) = fresh();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handle = store.subscribe(move |ev| sink.lock().unwrap().push(ev.clone()));

    store.record_completion("regex", 10).unwrap();
    {
      let events = seen.lock().unwrap();
      assert!(events.contains(&ProgressEvent::DataSaved));
      assert!(events.contains(&ProgressEvent::LevelUnlocked { level: 2, game_id: "tetris".into() }));
      assert!(events.iter().any(|e| matches!(e, ProgressEvent::ProgressUpdated { game_id, .. } if game_id == "regex")));
    }

    assert!(store.unsubscribe(handle));
    assert!(!store.unsubscribe(handle));
    let count = seen.lock().unwrap().len();
    store.record_score("regex", 5).unwrap();
    assert_eq!(seen.lock().unwrap().len(), count);
  }

  #[test]
  fn test_milestones_awarded_once() {
    let (mut store, _) = fresh();
    store.add_play_time(3600).unwrap();
    let first = store.check_milestones().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "playtime_1_hour");
    assert!(store.check_milestones().unwrap().is_empty());

    for id in ["regex", "tetris", "snake"] {
      store.record_completion(id, 4000).unwrap();
    }
    let ids: Vec<_> = store.achievements().iter().map(|a| a.id.as_str()).collect();
    assert!(ids.contains(&"score_10k"));
    assert!(ids.contains(&"games_3_complete"));
    assert!(!ids.contains(&"all_games_complete"));
    assert_eq!(ids.iter().filter(|id| **id == "playtime_1_hour").count(), 1);
  }

  #[test]
  fn test_settings_and_stats() {
    let (mut store, _) = fresh();
    let mut patch = Settings::new();
    patch.insert("soundEnabled".into(), Value::Bool(false));
    store.update_settings(patch).unwrap();
    assert_eq!(store.settings()["soundEnabled"], Value::Bool(false));
    assert_eq!(store.settings()["theme"], Value::String("cyberpunk".into()));

    store.record_completion("regex", 100).unwrap();
    let stats = store.stats();
    assert_eq!(stats.overall_progress, 14);
    assert_eq!(stats.achievements_count, 1);
    assert!(stats.last_played.is_some());

    assert!(settings_from_value(Value::from(3)).is_err());
  }

  #[test]
  fn test_clear_resets() {
    let (mut store, backend) = fresh();
    store.record_completion("regex", 100).unwrap();
    store.clear().unwrap();
    assert!(!store.is_unlocked("tetris"));
    assert_eq!(backend.read(STORAGE_KEY).unwrap(), None);
  }
}
