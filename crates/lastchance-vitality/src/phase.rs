//! Session Phase State Machine
//!
//! ```text
//! NewUser
//!   ↓ begin session (60s countdown)
//! Writing
//!   ↓ sentence committed
//! Success
//!   ↓ cooldown elapsed, begin session
//! Writing ...
//!
//! any ─ timer expiry / prolonged absence → Failed
//! Failed ─ acknowledgment → NewUser
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No accepted sentence yet (also the "returning, ready to write" state)
    NewUser,
    /// A 60-second session is running
    Writing,
    /// Sentence accepted, cooling down until the next day
    Success,
    /// Progress erased; waiting for the user to acknowledge
    Failed,
}

impl Phase {
    /// Check if transition to another phase is valid
    pub fn can_transition_to(&self, target: Phase) -> bool {
        match (self, target) {
            // Any phase can die
            (_, Phase::Failed) => true,
            // Begin a session from fresh or after the cooldown
            (Phase::NewUser, Phase::Writing) => true,
            (Phase::Success, Phase::Writing) => true,
            // Commit a sentence
            (Phase::Writing, Phase::Success) => true,
            // Acknowledge failure and start over
            (Phase::Failed, Phase::NewUser) => true,
            // Same phase is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// Returns true if a countdown should be running
    pub fn is_writing(&self) -> bool {
        matches!(self, Phase::Writing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NewUser => "new_user",
            Phase::Writing => "writing",
            Phase::Success => "success",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new_user" => Ok(Phase::NewUser),
            "writing" => Ok(Phase::Writing),
            "success" => Ok(Phase::Success),
            "failed" => Ok(Phase::Failed),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}
