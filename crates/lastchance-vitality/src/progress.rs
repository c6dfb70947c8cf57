//! Cumulative writing progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many trailing words of the history are shown when resuming writing
const SNIPPET_WORDS: usize = 10;

/// Everything the user has ever written, plus the streak bookkeeping.
///
/// Invariant: `last_write_at` is `None` iff `streak == 0` iff `history` is
/// empty. The three fields only ever change together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Concatenation of all accepted sentences, space-joined
    pub history: String,
    /// Count of accepted sessions
    pub streak: u32,
    /// When the last sentence was accepted
    pub last_write_at: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted sentence and stamp the write time.
    ///
    /// The caller validates sentence completeness; `sentence` is expected to
    /// be trimmed already.
    pub fn append(&mut self, sentence: &str, now: DateTime<Utc>) {
        if self.history.is_empty() {
            self.history = sentence.to_string();
        } else {
            self.history = format!("{} {}", self.history, sentence);
        }
        self.streak += 1;
        self.last_write_at = Some(now);
    }

    /// Erase everything. The three fields are never cleared independently.
    pub fn clear(&mut self) {
        self.history.clear();
        self.streak = 0;
        self.last_write_at = None;
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The day being written, 1-based ("Day N" in the returning view)
    pub fn day_number(&self) -> u32 {
        self.streak + 1
    }

    /// Last few words of the history, shown above the editor for context
    pub fn preview_snippet(&self) -> Option<String> {
        if self.history.is_empty() {
            return None;
        }

        let words: Vec<&str> = self.history.split(' ').collect();
        let start = words.len().saturating_sub(SNIPPET_WORDS);
        Some(format!("... {}", words[start..].join(" ")))
    }

    /// Check the all-or-nothing invariant across the three fields
    pub fn is_consistent(&self) -> bool {
        let empty = self.history.is_empty();
        (self.streak == 0) == empty && self.last_write_at.is_none() == empty
    }
}

/// A sentence is complete when its trimmed form ends in `.`, `!` or `?`.
pub fn is_complete_sentence(input: &str) -> bool {
    matches!(
        input.trim().chars().next_back(),
        Some('.') | Some('!') | Some('?')
    )
}
