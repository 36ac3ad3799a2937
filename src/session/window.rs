//! Sliding decode-window bookkeeping.
//!
//! Accumulates recorded samples, hands out the current decoding window with
//! its absolute start offset, and shifts the window forward as words are
//! committed so the buffer stays bounded. A little committed audio is kept
//! in front of the frontier on purpose: the recognizer decodes better with
//! context, and the agreement core de-duplicates the words it re-emits from
//! that overlap.

use crate::config::SessionConfig;
use log::debug;

#[derive(Debug)]
pub struct SlidingWindow {
    sample_rate: u32,
    min_window_samples: usize,
    max_window_samples: usize,
    keep_context_samples: usize,

    /// Samples not yet trimmed away; the current decoding window.
    samples: Vec<f32>,

    /// How many samples have been trimmed off the front since the stream
    /// started. Divided by the sample rate this is the window's absolute
    /// start offset.
    trimmed_samples: usize,
}

impl SlidingWindow {
    pub fn new(config: &SessionConfig) -> Self {
        let rate = config.sample_rate as f64;
        Self {
            sample_rate: config.sample_rate,
            min_window_samples: (config.min_window_secs * rate) as usize,
            max_window_samples: (config.max_window_secs * rate) as usize,
            keep_context_samples: (config.keep_context_secs * rate) as usize,
            samples: Vec::new(),
            trimmed_samples: 0,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Absolute start time of the current window, in seconds.
    pub fn offset_secs(&self) -> f64 {
        self.trimmed_samples as f64 / self.sample_rate as f64
    }

    /// Absolute end time of the buffered audio, in seconds.
    pub fn end_secs(&self) -> f64 {
        (self.trimmed_samples + self.samples.len()) as f64 / self.sample_rate as f64
    }

    pub fn window(&self) -> &[f32] {
        &self.samples
    }

    pub fn has_min_audio(&self) -> bool {
        self.samples.len() >= self.min_window_samples
    }

    /// Shift the window forward after a commit: audio up to
    /// `committed_until` seconds is dropped, minus the kept context overlap.
    /// Returns the new absolute window offset.
    pub fn advance_to(&mut self, committed_until: f64) -> f64 {
        let committed_sample =
            (committed_until * self.sample_rate as f64) as usize;
        let keep_from = committed_sample.saturating_sub(self.keep_context_samples);
        if keep_from > self.trimmed_samples {
            let drain = (keep_from - self.trimmed_samples).min(self.samples.len());
            self.samples.drain(..drain);
            self.trimmed_samples += drain;
            debug!(
                "window advanced to {:.2}s ({} samples buffered)",
                self.offset_secs(),
                self.samples.len()
            );
        }
        self.offset_secs()
    }

    /// Clamp the window to its maximum length when nothing is committing.
    /// Liveness over fidelity: unbounded windows make every decode slower
    /// and eventually stall the stream. Returns true if audio was dropped.
    pub fn clamp_to_max(&mut self) -> bool {
        if self.samples.len() <= self.max_window_samples {
            return false;
        }
        let drain = self.samples.len() - self.max_window_samples;
        self.samples.drain(..drain);
        self.trimmed_samples += drain;
        debug!(
            "window over max length, forced trim to {:.2}s offset",
            self.offset_secs()
        );
        true
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.trimmed_samples = 0;
    }
}
