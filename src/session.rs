//! One play-through of the regex game: walk the challenges in order, award
//! points for each passing submit. The store is not touched here; callers
//! record the completion once `finished` flips.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Challenge, Strictness, ValidationResult};
use crate::validator::validate;

#[derive(Clone, Debug)]
pub struct RegexSession {
  pub id: String,
  pub index: usize,
  pub score: u32,
  pub hints_revealed: u32,
  pub started_at: DateTime<Utc>,
  finished: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
  pub result: ValidationResult,
  pub accepted: bool,
  pub awarded: u32,
  /// True on the submit that cleared the last challenge.
  pub finished: bool,
}

impl RegexSession {
  pub fn new() -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      index: 0,
      score: 0,
      hints_revealed: 0,
      started_at: Utc::now(),
      finished: false,
    }
  }

  pub fn is_finished(&self) -> bool {
    self.finished
  }

  pub fn current<'a>(&self, challenges: &'a [Challenge]) -> Option<&'a Challenge> {
    if self.finished { None } else { challenges.get(self.index) }
  }

  /// Validate against the current challenge; advance only when it passes.
  /// Returns None once the session is over.
  pub fn submit(&mut self, pattern: &str, challenges: &[Challenge], strictness: Strictness) -> Option<SubmitOutcome> {
    let challenge = self.current(challenges)?;
    let result = validate(pattern, challenge, strictness);
    if !result.all_pass {
      debug!(target: "challenge", session = %self.id, challenge_id = challenge.id, matched = result.matched_count, total = result.total_count, "Submit rejected");
      return Some(SubmitOutcome { result, accepted: false, awarded: 0, finished: false });
    }

    let awarded = challenge.points;
    self.score += awarded;
    self.index += 1;
    self.finished = self.index >= challenges.len();
    info!(target: "challenge", session = %self.id, challenge_id = challenge.id, awarded, score = self.score, finished = self.finished, "Challenge solved");
    Some(SubmitOutcome { result, accepted: true, awarded, finished: self.finished })
  }

  pub fn reveal_hints(&mut self, challenges: &[Challenge]) -> Vec<String> {
    match self.current(challenges) {
      Some(c) => {
        self.hints_revealed += 1;
        c.hints.clone()
      }
      None => Vec::new(),
    }
  }

  pub fn restart(&mut self) {
    self.index = 0;
    self.score = 0;
    self.hints_revealed = 0;
    self.started_at = Utc::now();
    self.finished = false;
  }

  /// Whole seconds since the session (re)started.
  pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
    (now - self.started_at).num_seconds().max(0) as u64
  }
}
