//! Pattern validation against a challenge's example sets, plus the single-text drill check.
//!
//! Both entry points are pure: compile the pattern, run it over a handful of
//! strings, count what holds. Compile failures come back as data, not errors,
//! because the client calls this on every keystroke.

use fancy_regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{Challenge, DrillPattern, ExampleOutcome, Expectation, Strictness, ValidationResult};
use crate::error::GameError;

/// Compile a user pattern. Empty input is rejected rather than matching everything.
pub fn compile(pattern: &str, anchored: bool) -> Result<Regex, GameError> {
  if pattern.is_empty() {
    return Err(GameError::InvalidPattern("enter a regex pattern to test".into()));
  }
  let source = if anchored { format!("^(?:{})$", pattern) } else { pattern.to_string() };
  Regex::new(&source).map_err(|e| GameError::InvalidPattern(e.to_string()))
}

#[instrument(level = "debug", skip(challenge), fields(challenge_id = challenge.id, ?strictness))]
pub fn validate(pattern: &str, challenge: &Challenge, strictness: Strictness) -> ValidationResult {
  let pattern = pattern.trim();
  let canonical = match strictness {
    Strictness::CanonicalOnly => challenge.canonical_solution.as_deref(),
    Strictness::AnyCorrectPattern => None,
  };

  let re = match compile(pattern, canonical.is_some()) {
    Ok(re) => re,
    Err(e) => {
      debug!(target: "challenge", error = %e, "Pattern rejected");
      return ValidationResult::invalid(e.to_string());
    }
  };

  let expected = challenge
    .should_match
    .iter()
    .map(|s| (s, Expectation::Match))
    .chain(challenge.should_not_match.iter().map(|s| (s, Expectation::NoMatch)));

  let mut outcomes = Vec::with_capacity(challenge.total_examples());
  for (text, expectation) in expected {
    // A matcher that gives up (backtrack limit) counts as a failed example.
    let passed = match re.is_match(text) {
      Ok(hit) => hit == (expectation == Expectation::Match),
      Err(_) => false,
    };
    outcomes.push(ExampleOutcome { text: text.clone(), expected: expectation, passed });
  }

  let matched_count = outcomes.iter().filter(|o| o.passed).count();
  let total_count = outcomes.len();
  let canonical_match = canonical.map(|c| c == pattern);
  let all_pass = matched_count == total_count && canonical_match.unwrap_or(true);

  ValidationResult {
    is_valid_regex: true,
    matched_count,
    total_count,
    all_pass,
    canonical_match,
    error: None,
    outcomes,
  }
}

/// What the quick-play drill says about an input.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum DrillVerdict {
  /// Typing the target text itself is not an answer.
  Literal,
  InvalidPattern { message: String },
  Perfect,
  MatchesButNotCanonical,
  NoMatch { hint: String },
}

pub fn check_drill(input: &str, drill: &DrillPattern) -> DrillVerdict {
  if input.trim() == drill.text {
    return DrillVerdict::Literal;
  }
  let as_challenge = Challenge {
    id: 0,
    title: String::new(),
    description: String::new(),
    should_match: vec![drill.text.clone()],
    should_not_match: vec![],
    canonical_solution: Some(drill.solution.clone()),
    hints: vec![drill.hint.clone()],
    points: 1,
  };
  let result = validate(input, &as_challenge, Strictness::CanonicalOnly);
  if !result.is_valid_regex {
    return DrillVerdict::InvalidPattern { message: result.error.unwrap_or_default() };
  }
  match (result.matched_count == result.total_count, result.all_pass) {
    (true, true) => DrillVerdict::Perfect,
    (true, false) => DrillVerdict::MatchesButNotCanonical,
    _ => DrillVerdict::NoMatch { hint: drill.hint.clone() },
  }
}
