//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, DrillPattern, GameInfo, ProgressRecord, ValidationResult};
use crate::progress::CompletionOutcome;
use crate::session::RegexSession;
use crate::validator::DrillVerdict;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Sent on every keystroke; stateless.
    Validate {
        #[serde(rename = "challengeId")]
        challenge_id: u32,
        pattern: String,
    },
    StartSession,
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        pattern: String,
    },
    Hint {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    RestartSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    NewDrill,
    DrillCheck {
        #[serde(rename = "drillId")]
        drill_id: usize,
        input: String,
    },
    Progress,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Validation {
        #[serde(rename = "challengeId")]
        challenge_id: u32,
        result: ValidationResult,
    },
    Session {
        session: SessionOut,
    },
    AnswerResult {
        #[serde(flatten)]
        outcome: SubmitOut,
    },
    Hint {
        hints: Vec<String>,
    },
    Drill {
        drill: DrillOut,
    },
    DrillResult {
        #[serde(flatten)]
        verdict: DrillVerdict,
    },
    Progress {
        games: Vec<GameOut>,
    },
    Error {
        message: String,
    },
}

/// Challenge as shown to the player: no canonical solution, hints on request.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOut {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub should_match: Vec<String>,
    pub should_not_match: Vec<String>,
    pub points: u32,
    pub hint_count: usize,
}

/// Convert full `Challenge` (internal) to the public DTO.
pub fn to_out(c: &Challenge) -> ChallengeOut {
    ChallengeOut {
        id: c.id,
        title: c.title.clone(),
        description: c.description.clone(),
        should_match: c.should_match.clone(),
        should_not_match: c.should_not_match.clone(),
        points: c.points,
        hint_count: c.hints.len(),
    }
}

/// Level card: catalog entry plus the player's progress on it.
#[derive(Debug, Serialize)]
pub struct GameOut {
    #[serde(flatten)]
    pub info: GameInfo,
    #[serde(flatten)]
    pub progress: ProgressRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: String,
    pub index: usize,
    pub total: usize,
    pub score: u32,
    pub finished: bool,
    pub challenge: Option<ChallengeOut>,
}

pub fn session_out(s: &RegexSession, challenges: &[Challenge]) -> SessionOut {
    SessionOut {
        session_id: s.id.clone(),
        index: s.index,
        total: challenges.len(),
        score: s.score,
        finished: s.is_finished(),
        challenge: s.current(challenges).map(to_out),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillOut {
    pub drill_id: usize,
    pub text: String,
    pub hint: String,
}

pub fn drill_out(drill_id: usize, d: &DrillPattern) -> DrillOut {
    DrillOut { drill_id, text: d.text.clone(), hint: d.hint.clone() }
}

//
// HTTP request/response DTOs
//

#[derive(Deserialize)]
pub struct ValidateIn {
    #[serde(rename = "challengeId")]
    pub challenge_id: u32,
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    #[serde(rename = "challengeId")]
    pub challenge_id: u32,
}
#[derive(Serialize)]
pub struct HintOut {
    pub hints: Vec<String>,
}

#[derive(Deserialize)]
pub struct SessionRef {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct SubmitIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub pattern: String,
}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub accepted: bool,
    pub awarded: u32,
    pub result: ValidationResult,
    pub session: SessionOut,
    /// Present on the submit that finished the game.
    pub completion: Option<CompletionOutcome>,
}

#[derive(Deserialize)]
pub struct CompleteIn {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub score: u32,
}

#[derive(Deserialize)]
pub struct ScoreIn {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub score: u32,
}

#[derive(Debug, Deserialize)]
pub struct ScoresQuery {
    #[serde(rename = "gameId")]
    pub game_id: String,
}

#[derive(Deserialize)]
pub struct PlayTimeIn {
    pub seconds: u64,
}

#[derive(Deserialize)]
pub struct DrillCheckIn {
    #[serde(rename = "drillId")]
    pub drill_id: usize,
    pub input: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

/// Acknowledgement for health, import and reset.
#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}
