//! Hypothesis reconciliation strategies.
//!
//! Two strategies share one interface:
//!
//! - [`HypothesisBuffer`] — timestamp-aware local agreement (canonical).
//!   Words carry absolute stream times; the commit frontier and the n-gram
//!   boundary de-dup both key off those times.
//! - [`TextAgreement`] — position-counted plain-text agreement, for
//!   recognizers without word-level timestamps.
//!
//! [`AgreementPolicy`] is the tagged-variant dispatch a session holds; each
//! strategy guarantees the same contract: committed text is never rewritten,
//! and `committed ++ tentative` is always the full running transcript.

mod buffer;
mod textual;

pub use buffer::HypothesisBuffer;
pub use textual::TextAgreement;

use crate::config::{AgreementConfig, PolicyKind};
use crate::text::join_words;
use crate::words::{Hypothesis, TranscriptUpdate};
use log::warn;

/// One reconciliation strategy behind a uniform interface.
#[derive(Debug)]
pub enum AgreementPolicy {
    Timestamped(HypothesisBuffer),
    Textual(TextAgreement),
}

impl AgreementPolicy {
    pub fn for_kind(kind: PolicyKind, config: &AgreementConfig) -> Self {
        match kind {
            PolicyKind::Timestamped => {
                AgreementPolicy::Timestamped(HypothesisBuffer::new(config.clone()))
            }
            PolicyKind::Textual => AgreementPolicy::Textual(TextAgreement::new(config)),
        }
    }

    /// Reconcile one hypothesis. `window_offset` is the absolute start time
    /// of the decoded window in seconds; the textual strategy ignores it.
    ///
    /// A `Plain` hypothesis handed to the timestamped strategy cannot be
    /// placed on the timeline; it is logged and dropped, leaving state
    /// unchanged rather than corrupting the transcript.
    pub fn process(&mut self, hypothesis: Hypothesis, window_offset: f64) -> TranscriptUpdate {
        match (self, hypothesis) {
            (AgreementPolicy::Timestamped(buffer), Hypothesis::Timed(words)) => {
                buffer.process(words, window_offset)
            }
            (AgreementPolicy::Timestamped(buffer), Hypothesis::Plain(_)) => {
                warn!("timestamped policy received a plain-text hypothesis; ignoring it");
                buffer.snapshot()
            }
            (AgreementPolicy::Textual(agreement), Hypothesis::Plain(text)) => {
                agreement.process(&text)
            }
            (AgreementPolicy::Textual(agreement), Hypothesis::Timed(words)) => {
                agreement.process(&join_words(&words))
            }
        }
    }

    /// Flush all tentative words to committed. Idempotent.
    pub fn finalize(&mut self) -> String {
        match self {
            AgreementPolicy::Timestamped(buffer) => buffer.finalize(),
            AgreementPolicy::Textual(agreement) => agreement.finalize(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            AgreementPolicy::Timestamped(buffer) => buffer.reset(),
            AgreementPolicy::Textual(agreement) => agreement.reset(),
        }
    }

    pub fn committed_text(&self) -> String {
        match self {
            AgreementPolicy::Timestamped(buffer) => buffer.committed_text(),
            AgreementPolicy::Textual(agreement) => agreement.committed_text(),
        }
    }

    pub fn snapshot(&self) -> TranscriptUpdate {
        match self {
            AgreementPolicy::Timestamped(buffer) => buffer.snapshot(),
            AgreementPolicy::Textual(agreement) => agreement.snapshot(),
        }
    }

    /// End time of the most recently committed word, when the strategy
    /// tracks time at all.
    pub fn last_committed_time(&self) -> Option<f64> {
        match self {
            AgreementPolicy::Timestamped(buffer) => Some(buffer.last_committed_time()),
            AgreementPolicy::Textual(_) => None,
        }
    }

    /// Housekeeping for callers that trim audio history; a no-op for the
    /// textual strategy.
    pub fn pop_committed(&mut self, before_time: f64) {
        if let AgreementPolicy::Timestamped(buffer) = self {
            buffer.pop_committed(before_time);
        }
    }
}
