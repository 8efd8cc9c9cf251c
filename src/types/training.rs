//! Training cursor and presentation hints

use serde::{Deserialize, Serialize};

/// Position inside the training word list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainingCursor {
    pub word_index: usize,
    pub char_index: usize,
}

impl TrainingCursor {
    pub fn new(word_index: usize, char_index: usize) -> Self {
        Self { word_index, char_index }
    }
}

/// Background hint for one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellHighlight {
    Normal,
    /// Cell is under the scan
    Highlighted,
    /// Cell is under the scan and is the training target
    Match,
}

/// Foreground hint for one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellText {
    Normal,
    /// Cell holds the training target, highlighted or not
    Target,
}

/// What the training coordinator did on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// Cursor moved (scan wrapped to the first character)
    pub advanced: bool,
    /// The current word was finished and the cursor moved to the next word
    pub word_completed: bool,
    /// Highlighted character equals the target; a reset was requested
    pub matched: bool,
}
