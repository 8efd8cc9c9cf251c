//! Frame log record
//!
//! One JSON object per line in a session log file. Field order is fixed by
//! the struct, so identical entries always encode to identical bytes.

use serde::{Deserialize, Serialize};
use crate::types::LogError;

/// Snapshot of scan + training state at one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLogEntry {
    pub tick_index: u64,
    /// Unix milliseconds of the tick, null before the first tick
    pub timestamp: Option<i64>,
    /// Milliseconds covered by the tick
    pub delta: u32,
    pub highlighted_index: usize,
    pub highlighted_character_id: String,
    pub highlighted_character_label: String,
    /// Training fields are null in talk mode
    pub training_word_index: Option<usize>,
    pub training_word_id: Option<String>,
    pub training_word_label: Option<String>,
    pub training_char_index: Option<usize>,
    pub training_char_id: Option<String>,
    pub training_char_label: Option<String>,
}

impl FrameLogEntry {
    /// Encode as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> Result<String, LogError> {
        serde_json::to_string(self).map_err(LogError::Encode)
    }

    /// Compact form for terminal output
    pub fn to_parseable_string(&self) -> String {
        let target = match (&self.training_word_label, &self.training_char_label) {
            (Some(word), Some(ch)) => format!(" | word={} [{}]", word, ch),
            _ => String::new(),
        };
        format!(
            "tick={} | char={:?} ({}) | delta={}ms{}",
            self.tick_index,
            self.highlighted_character_label,
            self.highlighted_index,
            self.delta,
            target
        )
    }
}
