//! Per-recording session controller.
//!
//! Owns one agreement policy, the sliding decode window, and the recognizer
//! handle, and enforces the sequencing contract the reconciliation core
//! relies on: at most one decode in flight (overlapping triggers are
//! dropped), finalize waits out any in-flight decode with a bounded timeout,
//! and results that arrive after a cancel are discarded.

use crate::agreement::AgreementPolicy;
use crate::config::SessionConfig;
use crate::session::source::TranscriptionSource;
use crate::session::window::SlidingWindow;
use crate::words::{Hypothesis, TranscriptUpdate};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

/// Events emitted while a session runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// The transcript changed after a reconciliation round.
    TranscriptUpdated { committed: String, tentative: String },
    /// The session was finalized; `text` is the complete transcript.
    Finalized { text: String },
    /// A decode round failed; the transcript is unchanged.
    DecodeFailed { message: String },
}

pub type EventCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

struct SessionShared {
    config: SessionConfig,
    policy: Mutex<AgreementPolicy>,
    window: Mutex<SlidingWindow>,
    source: Mutex<Box<dyn TranscriptionSource>>,

    /// Busy flag: set while a decode is in flight. Triggers that arrive
    /// while it is set are dropped, not queued.
    decoding: AtomicBool,

    /// Bumped on cancel/reset/finalize; a decode result whose generation no
    /// longer matches is discarded instead of applied.
    generation: AtomicU64,

    /// Set by the first `finalize`; cleared by cancel/reset. Keeps the
    /// `Finalized` event one-shot per session.
    finalized: AtomicBool,

    callback: Mutex<Option<EventCallback>>,
}

impl SessionShared {
    fn emit(&self, event: SessionEvent) {
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(event);
        }
    }

    /// Apply one completed decode, unless the session has moved on.
    ///
    /// The generation is compared under the policy lock — the same lock
    /// `finalize` and `cancel` mutate state under — so a bump that lands
    /// after the decode finished but before this point still discards the
    /// result. The update event is emitted while the lock is held, which
    /// means no `TranscriptUpdated` can ever land after `Finalized`.
    fn apply_decode(&self, hypothesis: Hypothesis, window_offset: f64, generation: u64) {
        let mut policy = self.policy.lock().unwrap();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding decode result from a cancelled generation");
            return;
        }
        let update = policy.process(hypothesis, window_offset);
        if let Some(frontier) = policy.last_committed_time() {
            let mut window = self.window.lock().unwrap();
            let new_offset = window.advance_to(frontier);
            // Words ending before the retained audio can never be
            // re-emitted; drop them from the de-dup cache too.
            policy.pop_committed(new_offset);
        }
        self.emit(SessionEvent::TranscriptUpdated {
            committed: update.committed,
            tentative: update.tentative,
        });
    }
}

/// Controller for one recording stream. Constructed when recording starts,
/// dropped (or `reset`) when it stops; never shared across streams.
pub struct SessionController {
    shared: Arc<SessionShared>,

    /// One-shot completion signal for the decode currently in flight, if
    /// any. `finalize` waits on it so the last hypothesis is not lost.
    decode_done: Mutex<Option<Receiver<()>>>,
}

impl SessionController {
    pub fn new(source: impl TranscriptionSource + 'static, config: SessionConfig) -> Self {
        let policy = AgreementPolicy::for_kind(config.policy, &config.agreement);
        let window = SlidingWindow::new(&config);
        Self {
            shared: Arc::new(SessionShared {
                config,
                policy: Mutex::new(policy),
                window: Mutex::new(window),
                source: Mutex::new(Box::new(source)),
                decoding: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                finalized: AtomicBool::new(false),
                callback: Mutex::new(None),
            }),
            decode_done: Mutex::new(None),
        }
    }

    /// Register the consumer callback that receives transcript updates.
    ///
    /// The callback runs on the decode worker thread, possibly with internal
    /// locks held; it must hand events off rather than call back into the
    /// controller.
    pub fn set_event_callback(&self, callback: impl Fn(SessionEvent) + Send + Sync + 'static) {
        *self.shared.callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Feed newly recorded mono samples into the decode window.
    pub fn push_samples(&self, samples: &[f32]) {
        self.shared.window.lock().unwrap().push(samples);
    }

    /// Trigger one decode of the current window on a worker thread.
    ///
    /// Returns false without doing anything when there is not enough audio
    /// yet or a decode is already in flight — the audio pipeline triggers
    /// freely and overlapping requests are dropped here.
    pub fn try_decode(&self) -> bool {
        if !self.shared.window.lock().unwrap().has_min_audio() {
            debug!("not enough audio buffered, skipping decode");
            return false;
        }
        if self.shared.decoding.swap(true, Ordering::SeqCst) {
            debug!("decode already in flight, dropping trigger");
            return false;
        }

        let (window_samples, window_offset) = {
            let mut window = self.shared.window.lock().unwrap();
            window.clamp_to_max();
            (window.window().to_vec(), window.offset_secs())
        };
        let generation = self.shared.generation.load(Ordering::SeqCst);

        let (done_tx, done_rx) = mpsc::channel();
        *self.decode_done.lock().unwrap() = Some(done_rx);

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            let result = shared.source.lock().unwrap().decode(&window_samples);
            match result {
                Ok(hypothesis) => shared.apply_decode(hypothesis, window_offset, generation),
                Err(e) => {
                    error!("decode failed, transcript unchanged for this round: {}", e);
                    shared.emit(SessionEvent::DecodeFailed {
                        message: e.to_string(),
                    });
                }
            }
            shared.decoding.store(false, Ordering::SeqCst);
            let _ = done_tx.send(());
        });

        true
    }

    /// End the stream: wait (bounded) for any in-flight decode so its words
    /// are reconciled, then flush everything tentative to committed.
    ///
    /// Always returns a transcript. If the in-flight decode misses the
    /// deadline the current state is used instead of blocking indefinitely,
    /// and the late result is discarded via the generation guard.
    pub fn finalize(&self) -> String {
        let receiver = self.decode_done.lock().unwrap().take();
        if let Some(done) = receiver {
            if self.shared.decoding.load(Ordering::SeqCst) {
                match done.recv_timeout(self.shared.config.finalize_timeout()) {
                    Ok(()) => debug!("in-flight decode completed before finalize"),
                    Err(_) => warn!(
                        "in-flight decode missed the finalize deadline, proceeding with current state"
                    ),
                }
            }
        }

        // Anything still running now belongs to a dead generation.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);

        let text = self.shared.policy.lock().unwrap().finalize();
        info!("session finalized: {} chars", text.len());
        if !self.shared.finalized.swap(true, Ordering::SeqCst) {
            self.shared.emit(SessionEvent::Finalized { text: text.clone() });
        }
        text
    }

    /// Discard the session's transcript and audio. Any in-flight decode
    /// result is dropped when it arrives.
    pub fn cancel(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.policy.lock().unwrap().reset();
        self.shared.window.lock().unwrap().reset();
        self.shared.finalized.store(false, Ordering::SeqCst);
        info!("session cancelled");
    }

    /// Clear all state to begin a new recording on the same controller.
    pub fn reset(&self) {
        self.cancel();
    }

    pub fn committed_text(&self) -> String {
        self.shared.policy.lock().unwrap().committed_text()
    }

    /// Current committed/tentative state without mutating anything.
    pub fn snapshot(&self) -> TranscriptUpdate {
        self.shared.policy.lock().unwrap().snapshot()
    }

    pub fn is_decoding(&self) -> bool {
        self.shared.decoding.load(Ordering::SeqCst)
    }

    /// Absolute start time of the current decode window, in seconds.
    pub fn window_offset_secs(&self) -> f64 {
        self.shared.window.lock().unwrap().offset_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::{Hypothesis, Word};
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::mpsc::Sender;
    use std::time::Duration;

    /// Returns each scripted entry in order, then empty hypotheses.
    struct ScriptedSource {
        script: VecDeque<Result<Hypothesis, String>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Hypothesis, String>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl TranscriptionSource for ScriptedSource {
        fn decode(&mut self, _window: &[f32]) -> anyhow::Result<Hypothesis> {
            match self.script.pop_front() {
                Some(Ok(hypothesis)) => Ok(hypothesis),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Ok(Hypothesis::Timed(vec![])),
            }
        }
    }

    /// Blocks inside decode until released, to hold the busy flag.
    struct BlockingSource {
        release: std::sync::mpsc::Receiver<Hypothesis>,
    }

    impl BlockingSource {
        fn new() -> (Self, Sender<Hypothesis>) {
            let (tx, rx) = mpsc::channel();
            (Self { release: rx }, tx)
        }
    }

    impl TranscriptionSource for BlockingSource {
        fn decode(&mut self, _window: &[f32]) -> anyhow::Result<Hypothesis> {
            Ok(self
                .release
                .recv()
                .unwrap_or(Hypothesis::Timed(vec![])))
        }
    }

    fn timed(entries: &[(&str, f64, f64)]) -> Hypothesis {
        Hypothesis::Timed(entries.iter().map(|(t, s, e)| Word::new(*t, *s, *e)).collect())
    }

    fn collect_events(controller: &SessionController) -> Arc<Mutex<Vec<SessionEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        controller.set_event_callback(move |event| sink.lock().unwrap().push(event));
        events
    }

    fn wait_until_idle(controller: &SessionController) {
        for _ in 0..400 {
            if !controller.is_decoding() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("decode did not finish in time");
    }

    fn decode_and_wait(controller: &SessionController) {
        assert!(controller.try_decode());
        wait_until_idle(controller);
    }

    #[test]
    fn test_commits_after_two_agreeing_decodes() {
        let source = ScriptedSource::new(vec![
            Ok(timed(&[("hello", 0.0, 0.5), ("world", 0.5, 1.0)])),
            Ok(timed(&[("hello", 0.0, 0.5), ("world", 0.5, 1.0), ("today", 1.0, 1.4)])),
        ]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]); // 2s
        decode_and_wait(&controller);
        assert_eq!(controller.committed_text(), "");

        decode_and_wait(&controller);
        assert_eq!(controller.committed_text(), "hello world");
        assert_eq!(controller.snapshot().tentative, "today");

        let events = events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(SessionEvent::TranscriptUpdated { committed, .. }) if committed == "hello world"
        ));
    }

    #[test]
    fn test_no_decode_without_enough_audio() {
        let source = ScriptedSource::new(vec![]);
        let controller = SessionController::new(source, SessionConfig::default());
        controller.push_samples(&vec![0.0; 1_000]);
        assert!(!controller.try_decode());
    }

    #[test]
    fn test_overlapping_trigger_is_dropped() {
        let (source, release) = BlockingSource::new();
        let controller = SessionController::new(source, SessionConfig::default());
        controller.push_samples(&vec![0.0; 32_000]);

        assert!(controller.try_decode());
        assert!(!controller.try_decode()); // in flight: dropped, not queued

        release.send(timed(&[("hi", 0.0, 0.4)])).unwrap();
        wait_until_idle(&controller);
        assert_eq!(controller.snapshot().tentative, "hi");
    }

    #[test]
    fn test_decode_failure_leaves_state_unchanged() {
        let source = ScriptedSource::new(vec![
            Ok(timed(&[("stable", 0.0, 0.5)])),
            Ok(timed(&[("stable", 0.0, 0.5)])),
            Err("engine exploded".to_string()),
        ]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]);
        decode_and_wait(&controller);
        decode_and_wait(&controller);
        assert_eq!(controller.committed_text(), "stable");

        decode_and_wait(&controller);
        assert_eq!(controller.committed_text(), "stable");

        let events = events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(SessionEvent::DecodeFailed { message }) if message == "engine exploded"
        ));
    }

    #[test]
    fn test_finalize_flushes_tentative() {
        let source = ScriptedSource::new(vec![Ok(timed(&[
            ("today", 0.0, 0.5),
            ("is", 0.5, 0.9),
            ("great", 0.9, 1.3),
        ]))]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]);
        decode_and_wait(&controller);
        assert_eq!(controller.committed_text(), "");

        let text = controller.finalize();
        assert_eq!(text, "today is great");
        assert_eq!(controller.committed_text(), "today is great");

        // Nothing pending: a second finalize is a no-op.
        assert_eq!(controller.finalize(), "today is great");

        let events = events.lock().unwrap();
        assert!(matches!(
            events.iter().find(|e| matches!(e, SessionEvent::Finalized { .. })),
            Some(SessionEvent::Finalized { text }) if text == "today is great"
        ));
    }

    #[test]
    fn test_finalize_times_out_on_stuck_decode() {
        let (source, release) = BlockingSource::new();
        let config = SessionConfig {
            finalize_timeout_ms: 50,
            ..SessionConfig::default()
        };
        let controller = SessionController::new(source, config);
        controller.push_samples(&vec![0.0; 32_000]);
        assert!(controller.try_decode());

        // The decode never completes in time; finalize proceeds anyway.
        let text = controller.finalize();
        assert_eq!(text, "");

        // The late result belongs to a dead generation and is discarded.
        release.send(timed(&[("late", 0.0, 0.4)])).unwrap();
        wait_until_idle(&controller);
        assert_eq!(controller.committed_text(), "");
    }

    #[test]
    fn test_cancel_discards_inflight_result() {
        let (source, release) = BlockingSource::new();
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]);
        assert!(controller.try_decode());
        controller.cancel();

        release.send(timed(&[("ghost", 0.0, 0.4)])).unwrap();
        wait_until_idle(&controller);

        assert_eq!(controller.committed_text(), "");
        assert_eq!(controller.snapshot().tentative, "");
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_result_completed_before_cancel_is_not_applied() {
        let source = ScriptedSource::new(vec![]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        // A decode finished against this generation, but the cancel lands
        // before its result reaches the policy.
        let generation = controller.shared.generation.load(Ordering::SeqCst);
        controller.cancel();
        controller
            .shared
            .apply_decode(timed(&[("ghost", 0.0, 0.4)]), 0.0, generation);

        assert_eq!(controller.committed_text(), "");
        assert_eq!(controller.snapshot().tentative, "");
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_update_event_after_finalized() {
        let source = ScriptedSource::new(vec![Ok(timed(&[("done", 0.0, 0.5)]))]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]);
        decode_and_wait(&controller);

        let generation = controller.shared.generation.load(Ordering::SeqCst);
        let text = controller.finalize();
        assert_eq!(text, "done");

        // A decode that missed the finalize deadline still carries the old
        // generation; it must not touch the finalized transcript or emit.
        controller
            .shared
            .apply_decode(timed(&[("done", 0.0, 0.5), ("late", 0.5, 0.9)]), 0.0, generation);

        assert_eq!(controller.committed_text(), "done");
        let events = events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Finalized { text }) if text == "done"
        ));
    }

    #[test]
    fn test_repeated_finalize_emits_one_event() {
        let source = ScriptedSource::new(vec![Ok(timed(&[("only", 0.0, 0.4)]))]);
        let controller = SessionController::new(source, SessionConfig::default());
        let events = collect_events(&controller);

        controller.push_samples(&vec![0.0; 32_000]);
        decode_and_wait(&controller);

        assert_eq!(controller.finalize(), "only");
        assert_eq!(controller.finalize(), "only");

        let events = events.lock().unwrap();
        let finalized = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Finalized { .. }))
            .count();
        assert_eq!(finalized, 1);
    }

    #[test]
    fn test_window_advances_after_commit() {
        let source = ScriptedSource::new(vec![
            Ok(timed(&[("one", 0.0, 1.0), ("two", 1.0, 2.0)])),
            Ok(timed(&[("one", 0.0, 1.0), ("two", 1.0, 2.0), ("three", 2.0, 2.8)])),
        ]);
        let controller = SessionController::new(source, SessionConfig::default());
        controller.push_samples(&vec![0.0; 48_000]); // 3s

        decode_and_wait(&controller);
        assert_eq!(controller.window_offset_secs(), 0.0);

        decode_and_wait(&controller);
        // Committed through 2.0s; default 0.5s of context stays in front.
        assert_eq!(controller.committed_text(), "one two");
        assert_eq!(controller.window_offset_secs(), 1.5);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = SessionEvent::TranscriptUpdated {
            committed: "a".to_string(),
            tentative: "b".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TranscriptUpdated");
        assert_eq!(json["data"]["committed"], "a");
        assert_eq!(json["data"]["tentative"], "b");
    }
}
