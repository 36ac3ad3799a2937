//! Position-counted plain-text agreement, for recognizers that cannot supply
//! word-level timestamps.
//!
//! Instead of per-word times, this strategy matches suffix/prefix word
//! windows directly: the head of a new hypothesis is de-duplicated against
//! the last `lookback_words` committed words by the longest common run, then
//! reconciled against the previous hypothesis in lock-step. It is less
//! robust to window shifts than the timestamp-aware core (repeated common
//! words can fool the window match) and exists as the fallback strategy.

use crate::config::AgreementConfig;
use crate::text::{tokenize, tokens_equal_fold};
use crate::words::TranscriptUpdate;
use log::debug;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct TextAgreement {
    /// How many committed words the de-duplication window looks back over.
    lookback_words: usize,

    /// The full committed transcript, one token per entry. Append-only.
    committed: Vec<String>,

    /// The previous hypothesis's uncommitted tail.
    previous: Vec<String>,
}

impl TextAgreement {
    pub fn new(config: &AgreementConfig) -> Self {
        Self {
            lookback_words: config.committed_lookback_words,
            committed: Vec::new(),
            previous: Vec::new(),
        }
    }

    /// Ingest one plain-text hypothesis for the current audio window.
    pub fn process(&mut self, text: &str) -> TranscriptUpdate {
        let mut incoming: VecDeque<String> =
            tokenize(text).into_iter().map(str::to_string).collect();

        self.dedup_overlap(&mut incoming);

        // Lock-step agreement against the previous hypothesis; an empty
        // previous hypothesis commits nothing.
        let mut previous: VecDeque<String> = std::mem::take(&mut self.previous).into();
        let mut committed_count = 0;
        while let (Some(prev), Some(next)) = (previous.front(), incoming.front()) {
            if !tokens_equal_fold(prev, next) {
                break;
            }
            let agreed = incoming.pop_front().expect("front checked above");
            previous.pop_front();
            self.committed.push(agreed);
            committed_count += 1;
        }

        if committed_count > 0 {
            debug!("committed {} word(s) by text agreement", committed_count);
        }

        self.previous = incoming.into_iter().collect();

        TranscriptUpdate {
            committed: self.committed.join(" "),
            tentative: self.previous.join(" "),
            newly_committed: Vec::new(),
        }
    }

    /// Accept the remaining tentative words unconditionally. Idempotent.
    pub fn finalize(&mut self) -> String {
        if !self.previous.is_empty() {
            debug!(
                "finalize: committing {} tentative word(s)",
                self.previous.len()
            );
            self.committed.append(&mut self.previous);
        }
        self.committed.join(" ")
    }

    pub fn reset(&mut self) {
        self.committed.clear();
        self.previous.clear();
    }

    pub fn committed_text(&self) -> String {
        self.committed.join(" ")
    }

    pub fn tentative_text(&self) -> String {
        self.previous.join(" ")
    }

    /// Current state as an update, without mutating anything.
    pub fn snapshot(&self) -> TranscriptUpdate {
        TranscriptUpdate {
            committed: self.committed.join(" "),
            tentative: self.previous.join(" "),
            newly_committed: Vec::new(),
        }
    }

    /// Remove the longest run of words at the head of `incoming` that
    /// matches the tail of the committed transcript, looking back at most
    /// `lookback_words`. Without timestamps there is no frontier proximity
    /// check, so the longest match is the safer removal here.
    fn dedup_overlap(&self, incoming: &mut VecDeque<String>) {
        let window = self.lookback_words.min(self.committed.len());
        let max_run = window.min(incoming.len());
        for n in (1..=max_run).rev() {
            let tail = &self.committed[self.committed.len() - n..];
            let matches = tail
                .iter()
                .zip(incoming.iter())
                .all(|(a, b)| tokens_equal_fold(a, b));
            if matches {
                debug!("overlap de-dup: removing {}-word run", n);
                for _ in 0..n {
                    incoming.pop_front();
                }
                return;
            }
        }
    }
}

impl Default for TextAgreement {
    fn default() -> Self {
        Self::new(&AgreementConfig::default())
    }
}
