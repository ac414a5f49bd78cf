//! Loading app configuration (validator strictness, storage, optional challenge bank) from TOML.
//!
//! See `AppConfig` and `ChallengeCfg` for expected schema. Example:
//!
//! ```toml
//! strictness = "canonical_only"
//! data_dir = "/var/lib/vibe"
//!
//! [[challenges]]
//! title = "Hex Colors"
//! description = "Match #RGB and #RRGGBB"
//! should_match = ["#fff", "#00ff00"]
//! should_not_match = ["fff", "#ffff"]
//! canonical_solution = "^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$"
//! points = 120
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{DrillPattern, Strictness};
use crate::progress::STORAGE_KEY;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub strictness: Strictness,
  pub storage_key: String,
  /// Directory for the progress file. VIBE_DATA_DIR overrides it.
  pub data_dir: PathBuf,
  /// Keep progress in memory only (nothing survives a restart).
  pub ephemeral: bool,
  /// Replaces the built-in challenges when non-empty.
  pub challenges: Vec<ChallengeCfg>,
  /// Replaces the built-in drills when non-empty.
  pub drills: Vec<DrillPattern>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      strictness: Strictness::default(),
      storage_key: STORAGE_KEY.into(),
      data_dir: PathBuf::from("./data"),
      ephemeral: false,
      challenges: Vec::new(),
      drills: Vec::new(),
    }
  }
}

/// Challenge entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  #[serde(default)] pub id: Option<u32>,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub should_match: Vec<String>,
  #[serde(default)] pub should_not_match: Vec<String>,
  #[serde(default)] pub canonical_solution: Option<String>,
  #[serde(default)] pub hints: Vec<String>,
  pub points: u32,
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Load `AppConfig` from VIBE_CONFIG_PATH (defaults when unset or broken), then apply env overrides.
pub fn load_app_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("VIBE_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_app_config(&s) {
        Ok(cfg) => {
          info!(target: "vibe_backend", %path, challenges = cfg.challenges.len(), "Loaded app config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "vibe_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          AppConfig::default()
        }
      },
      Err(e) => {
        error!(target: "vibe_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };

  if let Ok(dir) = std::env::var("VIBE_DATA_DIR") {
    cfg.data_dir = PathBuf::from(dir);
  }
  cfg
}
