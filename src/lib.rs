//! Incremental reconciliation of streaming speech-to-text hypotheses into a
//! stable, growing transcript.
//!
//! A recognizer is invoked repeatedly on a sliding, overlapping window of
//! audio; every invocation re-decodes from scratch and may disagree with the
//! last one about the overlapping region. The agreement core decides, after
//! each invocation, which prefix of words is permanently fixed (committed)
//! and which remainder is still provisional (tentative): a word commits only
//! once two consecutive overlapping passes produced it identically at the
//! frontier. Committed text is never rewritten.
//!
//! The crate has two layers:
//!
//! - [`agreement`] — the in-memory reconciliation engine. No I/O, no
//!   threads; safe to drive entirely from the caller's thread.
//! - [`session`] — one recording stream's worth of plumbing around the
//!   engine: window-shift bookkeeping, a worker thread per decode with a
//!   busy flag, bounded-timeout finalize, and cancellation.
//!
//! Audio capture, resampling, model selection, persistence, and rendering
//! all stay outside; audio arrives as `f32` samples and recognizers plug in
//! behind [`session::TranscriptionSource`].

pub mod agreement;
pub mod config;
pub mod session;
pub mod text;
pub mod words;

pub use agreement::{AgreementPolicy, HypothesisBuffer, TextAgreement};
pub use config::{AgreementConfig, PolicyKind, SessionConfig};
pub use session::{SessionController, SessionEvent, TranscriptionSource};
pub use words::{Hypothesis, TranscriptUpdate, Word};
