//! Scan session: scan machine + blink reducer + training coordinator
//!
//! Every mutation is a `&mut self` step, so a session has exactly one writer.
//! The async runtime wraps it in a mutex to serialize clock ticks against
//! eye samples and commands.
//!
//! Wiring between the parts:
//! - BLINK_START → pause the scan
//! - BLINK_END   → reset the scan (the held character was selected)
//! - training match → reset the scan

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::DEFAULT_TICK_INTERVAL_MS;
use crate::core::{BlinkReducer, ScanMachine, TrainingCoordinator};
use crate::core::blink_reducer::gate_sample;
use crate::core::frame_log::build_log_entry;
use crate::core::training::{highlight_color, text_color};
use crate::types::{
    Alphabet, BlinkEdge, BlinkState, CellHighlight, CellText, Character, ConfigurationError,
    EyeSample, FrameLogEntry, ScanState, Sensitivity, SessionMode, TickReport, TrainingCursor,
};

/// Session parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub mode: SessionMode,
    pub tick_interval_ms: u32,
    pub sensitivity: Sensitivity,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Talk,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            sensitivity: Sensitivity::default(),
        }
    }
}

/// Identifier of the form `<mode prefix>-<unix ms>`
pub fn new_session_id(mode: SessionMode, now: DateTime<Utc>) -> String {
    format!("{}-{}", mode.id_prefix(), now.timestamp_millis())
}

/// One user's scan loop
#[derive(Debug)]
pub struct ScanSession {
    id: String,
    alphabet: Arc<Alphabet>,
    config: SessionConfig,
    machine: ScanMachine,
    blink: BlinkReducer,
    training: Option<TrainingCoordinator>,
}

impl ScanSession {
    pub fn new(
        id: impl Into<String>,
        alphabet: Arc<Alphabet>,
        config: SessionConfig,
    ) -> Result<Self, ConfigurationError> {
        let machine = ScanMachine::new(alphabet.len(), config.tick_interval_ms)?;
        let training = match config.mode {
            SessionMode::Talk => None,
            SessionMode::Train if !alphabet.has_training() => {
                return Err(ConfigurationError::NoTrainingWords)
            }
            SessionMode::Train => Some(TrainingCoordinator::new()),
        };

        Ok(Self {
            id: id.into(),
            alphabet,
            config,
            machine,
            blink: BlinkReducer::new(),
            training,
        })
    }

    /// Prepare for the first tick. In training mode an initial highlight that
    /// already sits on the target requests a reset; returns whether it did.
    pub fn start(&mut self) -> bool {
        info!(session = %self.id, mode = %self.config.mode, interval_ms = self.config.tick_interval_ms, "scan started");
        let matched = self
            .training
            .as_ref()
            .map(|t| t.check(&self.alphabet, self.machine.state()))
            .unwrap_or(false);
        if matched {
            self.machine.enqueue_reset();
        }
        matched
    }

    /// Apply one clock tick
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let reason = self.machine.advance(now);

        let training = self.training.as_mut().map(|t| t.on_tick(&self.alphabet, self.machine.state()));
        if training.map(|t| t.matched).unwrap_or(false) {
            self.machine.enqueue_reset();
        }

        TickReport {
            state: self.machine.state().clone(),
            reason,
            training,
            cursor: self.cursor(),
        }
    }

    /// Feed one "eye open enough" reading and apply the blink policy
    pub fn eye_signal(&mut self, eye_open_enough: bool) -> Option<BlinkEdge> {
        let edge = self.blink.step(eye_open_enough)?;
        match edge {
            BlinkEdge::BlinkStart => self.machine.enqueue_pause(),
            BlinkEdge::BlinkEnd => self.machine.enqueue_reset(),
        }
        debug!(session = %self.id, ?edge, pending = %self.machine.pending_command(), "blink edge applied");
        Some(edge)
    }

    /// Gate a raw face-tracker sample, then feed it. Ignored samples return `None`.
    pub fn eye_sample(&mut self, sample: &EyeSample) -> Option<BlinkEdge> {
        let open = gate_sample(sample, self.config.sensitivity)?;
        self.eye_signal(open)
    }

    pub fn pause(&mut self) {
        self.machine.enqueue_pause();
    }

    pub fn reset(&mut self) {
        self.machine.enqueue_reset();
    }

    pub fn resume(&mut self) {
        self.machine.clear_pause();
    }

    /// Current frame log record
    pub fn build_log_entry(&self) -> FrameLogEntry {
        build_log_entry(self.machine.state(), &self.alphabet, self.cursor())
    }

    /// Return the last state, then tear down to the zero state stamped at `now`
    pub fn stop(&mut self, now: DateTime<Utc>) -> ScanState {
        let last = self.machine.teardown(now);
        self.blink.reset();
        info!(session = %self.id, ticks = last.tick_index, "scan stopped");
        last
    }

    /// Change the cadence. Callers restart the clock afterwards.
    pub fn set_interval(&mut self, tick_interval_ms: u32) -> Result<(), ConfigurationError> {
        self.machine.set_interval(tick_interval_ms)?;
        self.config.tick_interval_ms = tick_interval_ms;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.config.mode
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn state(&self) -> &ScanState {
        self.machine.state()
    }

    pub fn tick_interval_ms(&self) -> u32 {
        self.config.tick_interval_ms
    }

    pub fn highlighted(&self) -> Option<&Character> {
        self.alphabet.char_at(self.machine.highlighted_index())
    }

    pub fn blink_state(&self) -> BlinkState {
        self.blink.state()
    }

    /// Training cursor (training sessions only)
    pub fn cursor(&self) -> Option<TrainingCursor> {
        self.training.as_ref().map(TrainingCoordinator::cursor)
    }

    pub fn training_target(&self) -> Option<&Character> {
        self.training.as_ref().and_then(|t| t.target_char(&self.alphabet))
    }

    pub fn training_word(&self) -> Option<&str> {
        self.training
            .as_ref()
            .and_then(|t| t.target_word(&self.alphabet))
            .map(|w| w.label.as_str())
    }

    pub fn highlight_color(&self, index: usize) -> CellHighlight {
        highlight_color(index, self.machine.state(), &self.alphabet, self.cursor())
    }

    pub fn text_color(&self, index: usize) -> CellText {
        text_color(index, &self.alphabet, self.cursor())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::types::{PendingCommand, Word};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
    }

    fn alphabet(labels: &str, words: &[&str]) -> Arc<Alphabet> {
        let chars = labels
            .chars()
            .map(|c| Character::new(format!("char-{}", c), c.to_string()))
            .collect();
        let words = words.iter().map(|w| Word::new(format!("word-{}", w), *w)).collect();
        Arc::new(Alphabet::new(chars, words).unwrap())
    }

    fn train() -> SessionConfig {
        SessionConfig {
            mode: SessionMode::Train,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_train_mode_requires_words() {
        let err = ScanSession::new("s", alphabet("ab", &[]), train()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoTrainingWords));
    }

    #[test]
    fn test_blink_pauses_then_resets() {
        let mut session = ScanSession::new("s", alphabet("abcd", &[]), SessionConfig::default()).unwrap();
        session.start();
        session.tick(t(0));
        session.tick(t(300));
        assert_eq!(session.state().highlighted_index, 2);

        assert_eq!(session.eye_signal(false), Some(BlinkEdge::BlinkStart));
        session.tick(t(600));
        session.tick(t(900));
        assert_eq!(session.state().highlighted_index, 2);

        assert_eq!(session.eye_signal(true), Some(BlinkEdge::BlinkEnd));
        assert_eq!(session.state().pending_command, PendingCommand::Reset);
        session.tick(t(1200));
        assert_eq!(session.state().highlighted_index, 0);
    }

    #[test]
    fn test_initial_match_requests_reset() {
        let mut session = ScanSession::new("s", alphabet("ab", &["ab"]), train()).unwrap();
        assert!(session.start());
        assert_eq!(session.state().pending_command, PendingCommand::Reset);
    }

    #[test]
    fn test_talk_log_entry_has_no_training() {
        let session = ScanSession::new("s", alphabet("ab", &["ab"]), SessionConfig::default()).unwrap();
        let entry = session.build_log_entry();
        assert_eq!(entry.training_word_id, None);
        assert_eq!(entry.highlighted_character_label, "a");
    }

    #[test]
    fn test_session_id_format() {
        assert_eq!(new_session_id(SessionMode::Train, t(0)), "training-1700000000000");
        assert_eq!(new_session_id(SessionMode::Talk, t(5)), "talk-1700000000005");
    }
}
