//! Reason codes for what a tick did to the highlight

use serde::{Deserialize, Serialize};

/// Outcome of one scan tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TickReason {
    /// Highlight moved to the next character (possibly wrapping)
    Advanced,
    /// Pause pending, highlight kept in place
    Held,
    /// Reset pending, highlight returned to the first character
    Reset,
}

impl TickReason {
    /// Code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Advanced => "T001_ADVANCED",
            Self::Held => "T002_HELD",
            Self::Reset => "T003_RESET",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Advanced => "Highlight advanced",
            Self::Held => "Paused - highlight held",
            Self::Reset => "Scan restarted from first character",
        }
    }
}

impl std::fmt::Display for TickReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
