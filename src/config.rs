//! Configuration for the agreement core and the session layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_stale_tolerance_secs() -> f64 {
    0.1
}

fn default_dedup_window_secs() -> f64 {
    1.0
}

fn default_max_ngram() -> usize {
    5
}

fn default_committed_lookback_words() -> usize {
    45
}

/// Tuning knobs for the reconciliation core.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AgreementConfig {
    /// Words starting at or before `last_committed_time - stale_tolerance_secs`
    /// are dropped before reconciliation; the tolerance absorbs timestamp
    /// jitter at the commit boundary.
    #[serde(default = "default_stale_tolerance_secs")]
    pub stale_tolerance_secs: f64,

    /// Boundary de-duplication is only attempted when a hypothesis restarts
    /// within this many seconds of the committed frontier.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: f64,

    /// Largest n-gram checked during boundary de-duplication.
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// How many recently committed words to keep as the de-duplication
    /// lookback cache.
    #[serde(default = "default_committed_lookback_words")]
    pub committed_lookback_words: usize,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            stale_tolerance_secs: default_stale_tolerance_secs(),
            dedup_window_secs: default_dedup_window_secs(),
            max_ngram: default_max_ngram(),
            committed_lookback_words: default_committed_lookback_words(),
        }
    }
}

/// Which reconciliation strategy a session runs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Timestamp-aware local agreement (canonical).
    Timestamped,
    /// Position-counted plain-text agreement, for recognizers that cannot
    /// supply word-level timestamps. Less robust to window shifts.
    Textual,
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Timestamped
    }
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_min_window_secs() -> f64 {
    1.0
}

fn default_max_window_secs() -> f64 {
    30.0
}

fn default_keep_context_secs() -> f64 {
    0.5
}

fn default_finalize_timeout_ms() -> u64 {
    3_000
}

/// Configuration for one recording session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionConfig {
    /// Sample rate of the audio handed to `push_samples`, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Minimum buffered audio before a decode is attempted.
    #[serde(default = "default_min_window_secs")]
    pub min_window_secs: f64,

    /// Maximum decoding window length; older audio is trimmed past this.
    #[serde(default = "default_max_window_secs")]
    pub max_window_secs: f64,

    /// Already-committed audio deliberately re-fed to the recognizer for
    /// decoding context when the window shifts. This overlap is why the core
    /// performs n-gram boundary de-duplication.
    #[serde(default = "default_keep_context_secs")]
    pub keep_context_secs: f64,

    /// How long `finalize` waits for an in-flight decode before proceeding
    /// with the state it has.
    #[serde(default = "default_finalize_timeout_ms")]
    pub finalize_timeout_ms: u64,

    #[serde(default)]
    pub policy: PolicyKind,

    #[serde(default)]
    pub agreement: AgreementConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            min_window_secs: default_min_window_secs(),
            max_window_secs: default_max_window_secs(),
            keep_context_secs: default_keep_context_secs(),
            finalize_timeout_ms: default_finalize_timeout_ms(),
            policy: PolicyKind::default(),
            agreement: AgreementConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}
