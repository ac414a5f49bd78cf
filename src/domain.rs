//! Domain models: regex challenges, validation results, the level catalog and progress views.

use serde::{Deserialize, Serialize};

/// How strictly a submitted pattern is judged.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
  /// Any pattern that classifies every example correctly passes (unanchored).
  AnyCorrectPattern,
  /// Pattern is anchored and must equal the challenge's canonical solution.
  CanonicalOnly,
}
impl Default for Strictness {
  fn default() -> Self { Strictness::AnyCorrectPattern }
}

/// One regex puzzle. Immutable once loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
  pub id: u32,
  pub title: String,
  pub description: String,
  #[serde(default)] pub should_match: Vec<String>,
  #[serde(default)] pub should_not_match: Vec<String>,
  #[serde(default)] pub canonical_solution: Option<String>,
  #[serde(default)] pub hints: Vec<String>,
  pub points: u32,
}

impl Challenge {
  pub fn total_examples(&self) -> usize {
    self.should_match.len() + self.should_not_match.len()
  }
}

/// Which way an example string is supposed to go.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
  Match,
  NoMatch,
}

/// Per-example verdict, so the client can highlight each string.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ExampleOutcome {
  pub text: String,
  pub expected: Expectation,
  pub passed: bool,
}

/// Result of checking a pattern against a challenge. Never persisted.
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
  pub is_valid_regex: bool,
  pub matched_count: usize,
  pub total_count: usize,
  pub all_pass: bool,
  /// Only set in canonical-only mode when the challenge has a canonical solution.
  pub canonical_match: Option<bool>,
  /// Compile error message when `is_valid_regex` is false.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub outcomes: Vec<ExampleOutcome>,
}

impl ValidationResult {
  pub fn invalid(message: String) -> Self {
    Self { error: Some(message), ..Self::default() }
  }
}

/// A level in the collection. Catalog order defines which level unlocks next.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameInfo {
  pub id: String,
  pub name: String,
  pub description: String,
  pub level: u32,
  pub color: String,
  pub icon: String,
}

/// Single-text drill from the quick-play variant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrillPattern {
  pub text: String,
  pub solution: String,
  pub hint: String,
}

/// Per-game progress view derived from the persisted document.
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  pub completed: bool,
  pub best_score: u32,
  pub unlocked: bool,
}
