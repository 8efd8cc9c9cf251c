//! Scan state definitions

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Command queued for the next tick. Reset outranks Pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingCommand {
    #[default]
    None,
    /// Hold the highlight in place until cleared or reset
    Pause,
    /// Jump back to the first character on the next tick
    Reset,
}

impl std::fmt::Display for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PendingCommand::None => "NONE",
            PendingCommand::Pause => "PAUSE",
            PendingCommand::Reset => "RESET",
        };
        write!(f, "{}", name)
    }
}

/// Mutable state of one running scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    /// Ticks since the scan started
    pub tick_index: u64,
    /// Wall-clock time of the last tick (or of teardown)
    pub last_tick_timestamp: Option<DateTime<Utc>>,
    /// Configured cadence
    pub tick_interval_ms: u32,
    /// Time covered by the last tick
    pub delta_ms: u32,
    /// Currently highlighted character
    pub highlighted_index: usize,
    pub pending_command: PendingCommand,
}

impl ScanState {
    /// Fresh state at index 0 with no ticks
    pub fn new(tick_interval_ms: u32) -> Self {
        Self {
            tick_index: 0,
            last_tick_timestamp: None,
            tick_interval_ms,
            delta_ms: tick_interval_ms,
            highlighted_index: 0,
            pending_command: PendingCommand::None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pending_command == PendingCommand::Pause
    }

    /// Timestamp as Unix milliseconds, the unit used in frame logs
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.last_tick_timestamp.map(|t| t.timestamp_millis())
    }
}

/// What a scan session is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Free selection, no training targets
    #[default]
    Talk,
    /// Guided selection of the training words
    Train,
}

impl SessionMode {
    /// Prefix of session identifiers and log file names
    pub fn id_prefix(&self) -> &'static str {
        match self {
            SessionMode::Talk => "talk",
            SessionMode::Train => "training",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionMode::Talk => "TALK",
            SessionMode::Train => "TRAIN",
        };
        write!(f, "{}", name)
    }
}
