//! Application state: challenge bank, drills, validator strictness, the progress store and live sessions.
//!
//! This module owns:
//!   - the challenge bank (TOML bank if configured and valid, else built-in seeds)
//!   - the drill list
//!   - the progress store instance (built here, injected into `AppState`)
//!   - in-memory regex sessions keyed by id

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AppConfig, ChallengeCfg};
use crate::domain::{Challenge, DrillPattern, Strictness};
use crate::progress::{FileBackend, MemoryBackend, ProgressBackend, ProgressEvent, ProgressStore};
use crate::seeds::{seed_catalog, seed_challenges, seed_drills};
use crate::session::RegexSession;
use crate::validator::{compile, validate};

#[derive(Clone)]
pub struct AppState {
    pub challenges: Arc<Vec<Challenge>>,
    pub drills: Arc<Vec<DrillPattern>>,
    pub strictness: Strictness,
    pub store: Arc<RwLock<ProgressStore>>,
    pub sessions: Arc<RwLock<HashMap<String, RegexSession>>>,
}

impl AppState {
    /// Build state from config around an already created store.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &AppConfig, store: ProgressStore) -> Self {
        let challenges = build_challenge_bank(&cfg.challenges);
        let drills = if cfg.drills.is_empty() { seed_drills() } else { cfg.drills.clone() };

        let total_points: u32 = challenges.iter().map(|c| c.points).sum();
        info!(target: "challenge", challenges = challenges.len(), drills = drills.len(), total_points, strictness = ?cfg.strictness, "Startup challenge inventory");

        Self {
            challenges: Arc::new(challenges),
            drills: Arc::new(drills),
            strictness: cfg.strictness,
            store: Arc::new(RwLock::new(store)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Read-only access to a challenge by id.
    pub fn challenge(&self, id: u32) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }
}

/// Create the progress store the config asks for (file-backed unless ephemeral).
#[instrument(level = "info", skip_all, fields(ephemeral = cfg.ephemeral, data_dir = %cfg.data_dir.display()))]
pub fn build_store(cfg: &AppConfig) -> ProgressStore {
    let backend: Box<dyn ProgressBackend> = if cfg.ephemeral {
        warn!(target: "progress", "Ephemeral mode: progress is kept in memory only");
        Box::new(MemoryBackend::new())
    } else {
        Box::new(FileBackend::new(cfg.data_dir.clone()))
    };
    let mut store = ProgressStore::create(backend, &cfg.storage_key, seed_catalog());
    store.subscribe(log_progress_event);
    store
}

fn log_progress_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::LevelUnlocked { level, game_id } => {
            info!(target: "progress", level, %game_id, "Level unlocked")
        }
        ProgressEvent::AchievementUnlocked(a) => {
            info!(target: "progress", id = %a.id, title = %a.title, "Achievement unlocked")
        }
        ProgressEvent::DataImported => info!(target: "progress", "Progress imported"),
        other => debug!(target: "progress", event = ?other, "Progress event"),
    }
}

/// Turn config entries into challenges. Entries whose solution does not
/// compile are skipped; an empty result falls back to the built-in seeds.
pub fn build_challenge_bank(entries: &[ChallengeCfg]) -> Vec<Challenge> {
    let mut bank = Vec::new();
    for (i, cc) in entries.iter().enumerate() {
        let id = cc.id.unwrap_or(i as u32 + 1);
        if bank.iter().any(|c: &Challenge| c.id == id) {
            error!(target: "challenge", id, title = %cc.title, "Skipping bank item: duplicate id.");
            continue;
        }
        if cc.should_match.is_empty() && cc.should_not_match.is_empty() {
            error!(target: "challenge", id, title = %cc.title, "Skipping bank item: no examples.");
            continue;
        }
        if let Some(sol) = &cc.canonical_solution {
            if let Err(e) = compile(sol, false) {
                error!(target: "challenge", id, title = %cc.title, error = %e, "Skipping bank item: canonical solution does not compile.");
                continue;
            }
        }
        let ch = Challenge {
            id,
            title: cc.title.clone(),
            description: cc.description.clone(),
            should_match: cc.should_match.clone(),
            should_not_match: cc.should_not_match.clone(),
            canonical_solution: cc.canonical_solution.clone(),
            hints: cc.hints.clone(),
            points: cc.points,
        };
        if let Some(sol) = &ch.canonical_solution {
            if !validate(sol, &ch, Strictness::AnyCorrectPattern).all_pass {
                warn!(target: "challenge", id, title = %ch.title, "Canonical solution does not classify its own examples");
            }
        }
        bank.push(ch);
    }

    if bank.is_empty() {
        if !entries.is_empty() {
            error!(target: "challenge", "No usable bank items; using built-in challenges");
        }
        return seed_challenges();
    }
    bank
}
