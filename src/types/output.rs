//! Per-tick reports and session events

use serde::{Deserialize, Serialize};
use crate::types::{BlinkEdge, ScanState, TickReason, TrainingCursor, TrainingOutcome};

/// Result of one tick, handed to every `on_tick` subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// State after the tick was applied
    pub state: ScanState,
    pub reason: TickReason,
    /// Present only in training sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingOutcome>,
    /// Cursor after the tick (training sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<TrainingCursor>,
}

impl TickReport {
    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let mut line = format!(
            "tick={} | index={} | pending={} | reason={}",
            self.state.tick_index,
            self.state.highlighted_index,
            self.state.pending_command,
            self.reason.code()
        );
        if let Some(cursor) = self.cursor {
            line.push_str(&format!(" | word={} char={}", cursor.word_index, cursor.char_index));
        }
        if self.training.map(|t| t.matched).unwrap_or(false) {
            line.push_str(" | MATCH");
        }
        line
    }
}

/// Event published on a session's broadcast channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Tick(TickReport),
    BlinkStart,
    BlinkEnd,
    /// Last state before teardown
    Stopped(ScanState),
}

impl From<BlinkEdge> for SessionEvent {
    fn from(edge: BlinkEdge) -> Self {
        match edge {
            BlinkEdge::BlinkStart => SessionEvent::BlinkStart,
            BlinkEdge::BlinkEnd => SessionEvent::BlinkEnd,
        }
    }
}
