//! The recognizer boundary.

use crate::words::Hypothesis;
use anyhow::Result;

/// A speech recognizer that decodes one audio window per invocation.
///
/// Implementations re-decode the supplied window from scratch and return an
/// independent hypothesis with word times relative to the window start; the
/// session shifts them onto the absolute stream timeline. Implementations
/// are expected to:
///
/// - Return `Timed` hypotheses when the engine produces word-level
///   timestamps, `Plain` text otherwise (the session's policy must match).
/// - Report engine failures as errors; the session logs them and leaves the
///   transcript unchanged for that round.
pub trait TranscriptionSource: Send {
    /// Decode one window of mono `f32` samples in `[-1.0, 1.0]`.
    fn decode(&mut self, window: &[f32]) -> Result<Hypothesis>;
}
