//! Word-level data model shared by the agreement strategies and the session
//! layer.

use serde::{Deserialize, Serialize};

/// A single recognized word with absolute stream timestamps in seconds.
///
/// Words are immutable once created; time shifts produce new values via
/// [`Word::shifted`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    /// Create a word, normalizing defensively: surrounding whitespace is
    /// trimmed and `end` is clamped so it never precedes `start`. A single
    /// malformed decode must not corrupt a long-running transcript.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        let text = text.into().trim().to_string();
        Self {
            text,
            start,
            end: end.max(start),
        }
    }

    /// The same word placed `offset` seconds later on the absolute timeline.
    pub fn shifted(&self, offset: f64) -> Self {
        Self::new(self.text.clone(), self.start + offset, self.end + offset)
    }
}

/// One recognizer invocation's output for the current audio window.
///
/// Recognizers that produce word-level timestamps emit `Timed` hypotheses
/// with times relative to the decoded window; legacy recognizers without
/// timestamps emit `Plain` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Hypothesis {
    Timed(Vec<Word>),
    Plain(String),
}

impl Hypothesis {
    pub fn is_empty(&self) -> bool {
        match self {
            Hypothesis::Timed(words) => words.is_empty(),
            Hypothesis::Plain(text) => text.trim().is_empty(),
        }
    }
}

/// Result of one reconciliation round.
///
/// `committed` is the full stable transcript so far, `tentative` the
/// provisional tail that the next hypothesis may still rewrite. Both are
/// word texts joined by single spaces. `newly_committed` carries the words
/// fixed during this round so consumers can append instead of re-rendering;
/// the plain-text strategy has no word timestamps and leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptUpdate {
    pub committed: String,
    pub tentative: String,
    pub newly_committed: Vec<Word>,
}
