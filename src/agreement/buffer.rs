//! Timestamp-aware local-agreement core.
//!
//! A word only becomes permanent once two consecutive, overlapping decoding
//! passes have produced it identically at the committed frontier. This hides
//! the instability of autoregressive decoders near the right edge of their
//! context window while still converging quickly.

use crate::config::AgreementConfig;
use crate::text::{join_words, tokens_equal_fold};
use crate::words::{TranscriptUpdate, Word};
use log::debug;
use std::collections::VecDeque;

/// Reconciles overlapping recognizer hypotheses into committed and tentative
/// transcript halves.
///
/// One instance per active recording stream, owned by the session that
/// created it. All timestamps are absolute stream time in seconds.
#[derive(Debug)]
pub struct HypothesisBuffer {
    config: AgreementConfig,

    /// The previous hypothesis's uncommitted tail; the reference the next
    /// hypothesis is checked against.
    buffer: Vec<Word>,

    /// Suffix cache of recently committed words, used only for n-gram
    /// de-duplication against re-fed window overlap. Bounded lookback,
    /// not the full transcript.
    committed_tail: VecDeque<Word>,

    /// The full ordered transcript committed so far. Append-only.
    all_committed: Vec<Word>,

    /// End time of the most recently committed word. Never decreases.
    last_committed_time: f64,
}

impl HypothesisBuffer {
    pub fn new(config: AgreementConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            committed_tail: VecDeque::new(),
            all_committed: Vec::new(),
            last_committed_time: 0.0,
        }
    }

    /// Ingest one hypothesis whose word times are relative to the decoded
    /// window starting at `window_offset` absolute seconds.
    ///
    /// Safe to call repeatedly with overlapping hypotheses; words at or
    /// before the committed frontier are filtered out, and words the
    /// recognizer re-emitted from the overlap region are removed by the
    /// n-gram boundary check before agreement runs.
    pub fn process(&mut self, words: Vec<Word>, window_offset: f64) -> TranscriptUpdate {
        // Shift to absolute time and drop words behind the committed
        // frontier. The tolerance absorbs boundary timestamp jitter.
        let stale_cutoff = self.last_committed_time - self.config.stale_tolerance_secs;
        let mut pending: VecDeque<Word> = words
            .into_iter()
            .map(|w| w.shifted(window_offset))
            .filter(|w| w.start > stale_cutoff)
            .collect();

        self.dedup_boundary(&mut pending);

        // Agreement pass: lock-step walk of the previous hypothesis and the
        // new one. With an empty previous buffer (first call, or fully
        // consumed last round) nothing can agree, so nothing commits.
        let mut previous: VecDeque<Word> = std::mem::take(&mut self.buffer).into();
        let mut newly_committed = Vec::new();
        while let (Some(prev), Some(next)) = (previous.front(), pending.front()) {
            if !tokens_equal_fold(&prev.text, &next.text) {
                break;
            }
            // Take the new word: its timestamps come from the fresher pass.
            let agreed = pending.pop_front().expect("front checked above");
            previous.pop_front();
            self.last_committed_time = self.last_committed_time.max(agreed.end);
            newly_committed.push(agreed);
        }

        if !newly_committed.is_empty() {
            debug!(
                "committed {} word(s), frontier now {:.2}s: '{}'",
                newly_committed.len(),
                self.last_committed_time,
                join_words(&newly_committed)
            );
        }

        for word in &newly_committed {
            self.all_committed.push(word.clone());
            self.committed_tail.push_back(word.clone());
        }
        self.trim_committed_tail();

        // Whatever the new hypothesis still claims past the frontier becomes
        // the reference for the next round. The previous hypothesis's
        // disagreeing residue is discarded, never committed.
        self.buffer = pending.into_iter().collect();

        TranscriptUpdate {
            committed: join_words(&self.all_committed),
            tentative: join_words(&self.buffer),
            newly_committed,
        }
    }

    /// Flush every remaining tentative word into the committed transcript.
    ///
    /// At end of stream there is no next hypothesis to agree with, so the
    /// current best guess is accepted unconditionally. Idempotent.
    pub fn finalize(&mut self) -> String {
        if !self.buffer.is_empty() {
            debug!(
                "finalize: committing {} tentative word(s)",
                self.buffer.len()
            );
            for word in self.buffer.drain(..) {
                self.last_committed_time = self.last_committed_time.max(word.end);
                self.committed_tail.push_back(word.clone());
                self.all_committed.push(word);
            }
            self.trim_committed_tail();
        }
        join_words(&self.all_committed)
    }

    /// Clear all state. Used when starting a new recording or discarding the
    /// current one.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.committed_tail.clear();
        self.all_committed.clear();
        self.last_committed_time = 0.0;
    }

    /// Drop words from the de-duplication lookback cache whose `end` is at
    /// or before `before_time`. Housekeeping for callers that trim audio
    /// history; the full transcript is unaffected.
    pub fn pop_committed(&mut self, before_time: f64) {
        while let Some(word) = self.committed_tail.front() {
            if word.end <= before_time {
                self.committed_tail.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn committed_text(&self) -> String {
        join_words(&self.all_committed)
    }

    pub fn committed_words(&self) -> &[Word] {
        &self.all_committed
    }

    pub fn tentative_words(&self) -> &[Word] {
        &self.buffer
    }

    pub fn last_committed_time(&self) -> f64 {
        self.last_committed_time
    }

    /// Current state as an update, without mutating anything.
    pub fn snapshot(&self) -> TranscriptUpdate {
        TranscriptUpdate {
            committed: join_words(&self.all_committed),
            tentative: join_words(&self.buffer),
            newly_committed: Vec::new(),
        }
    }

    /// Remove words from the front of `pending` that duplicate the tail of
    /// the committed transcript.
    ///
    /// Only attempted when the hypothesis restarts near the committed
    /// frontier, which happens when the window-shift policy re-feeds a few
    /// already-committed seconds of audio for decoding context. The scan is
    /// ascending and stops at the first (smallest) matching n-gram: the most
    /// conservative removal wins.
    fn dedup_boundary(&self, pending: &mut VecDeque<Word>) {
        let first_start = match pending.front() {
            Some(word) => word.start,
            None => return,
        };
        if first_start > self.last_committed_time + self.config.dedup_window_secs {
            return;
        }

        let max_n = self
            .config
            .max_ngram
            .min(self.committed_tail.len())
            .min(pending.len());
        for n in 1..=max_n {
            let tail: Vec<String> = self
                .committed_tail
                .iter()
                .skip(self.committed_tail.len() - n)
                .map(|w| w.text.to_lowercase())
                .collect();
            let head: Vec<String> = pending
                .iter()
                .take(n)
                .map(|w| w.text.to_lowercase())
                .collect();
            if tail == head {
                debug!("boundary de-dup: removing re-emitted {}-gram '{}'", n, head.join(" "));
                for _ in 0..n {
                    pending.pop_front();
                }
                break;
            }
        }
    }

    fn trim_committed_tail(&mut self) {
        while self.committed_tail.len() > self.config.committed_lookback_words {
            self.committed_tail.pop_front();
        }
    }
}

impl Default for HypothesisBuffer {
    fn default() -> Self {
        Self::new(AgreementConfig::default())
    }
}
