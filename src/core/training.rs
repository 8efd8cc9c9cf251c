//! Training coordinator: guides the user through the training word list
//!
//! After every tick:
//! - highlight back at index 0 → cursor moves to the next glyph, rolling over
//!   to the next word (and from the last word to the first)
//! - highlighted character equals the target → request a scan reset, so the
//!   next target starts from the top without waiting for a full pass
//!
//! While a pause is pending the coordinator does nothing.

use tracing::info;
use crate::types::{
    Alphabet, CellHighlight, CellText, Character, ScanState, TrainingCursor, TrainingOutcome, Word,
};

/// Owner of the training cursor
#[derive(Debug, Default, Clone)]
pub struct TrainingCoordinator {
    cursor: TrainingCursor,
}

impl TrainingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> TrainingCursor {
        self.cursor
    }

    /// Char index of the current target glyph
    pub fn target_index(&self, alphabet: &Alphabet) -> Option<usize> {
        alphabet.target_index(self.cursor.word_index, self.cursor.char_index)
    }

    pub fn target_char<'a>(&self, alphabet: &'a Alphabet) -> Option<&'a Character> {
        self.target_index(alphabet).and_then(|i| alphabet.char_at(i))
    }

    pub fn target_word<'a>(&self, alphabet: &'a Alphabet) -> Option<&'a Word> {
        alphabet.word_at(self.cursor.word_index)
    }

    /// Does the character at `highlighted_index` equal the current target?
    pub fn is_match(&self, alphabet: &Alphabet, highlighted_index: usize) -> bool {
        self.target_index(alphabet) == Some(highlighted_index)
    }

    /// Check the state as it stands, without a tick (used when a scan starts)
    pub fn check(&self, alphabet: &Alphabet, state: &ScanState) -> bool {
        !state.is_paused() && self.is_match(alphabet, state.highlighted_index)
    }

    /// React to a completed tick. The caller must enqueue a reset when
    /// `matched` is set.
    pub fn on_tick(&mut self, alphabet: &Alphabet, state: &ScanState) -> TrainingOutcome {
        let mut outcome = TrainingOutcome::default();
        if !alphabet.has_training() || state.is_paused() {
            return outcome;
        }

        if state.highlighted_index == 0 {
            outcome.advanced = true;
            outcome.word_completed = self.advance_cursor(alphabet);
        }

        outcome.matched = self.is_match(alphabet, state.highlighted_index);
        if outcome.matched {
            info!(
                tick = state.tick_index,
                word = self.cursor.word_index,
                glyph = self.cursor.char_index,
                "training target matched, requesting reset"
            );
        }
        outcome
    }

    /// Next glyph; returns true when the word rolled over
    fn advance_cursor(&mut self, alphabet: &Alphabet) -> bool {
        let len = alphabet.word_len(self.cursor.word_index);
        if self.cursor.char_index + 1 < len {
            self.cursor.char_index += 1;
            return false;
        }

        self.cursor.char_index = 0;
        self.cursor.word_index = if self.cursor.word_index + 1 < alphabet.training_words().len() {
            self.cursor.word_index + 1
        } else {
            0
        };
        info!(word = self.cursor.word_index, "training word completed");
        true
    }
}

/// Background hint for grid cell `index`
pub fn highlight_color(
    index: usize,
    state: &ScanState,
    alphabet: &Alphabet,
    cursor: Option<TrainingCursor>,
) -> CellHighlight {
    if index != state.highlighted_index {
        return CellHighlight::Normal;
    }
    match cursor.and_then(|c| alphabet.target_index(c.word_index, c.char_index)) {
        Some(target) if target == index => CellHighlight::Match,
        _ => CellHighlight::Highlighted,
    }
}

/// Foreground hint for grid cell `index`
pub fn text_color(index: usize, alphabet: &Alphabet, cursor: Option<TrainingCursor>) -> CellText {
    match cursor.and_then(|c| alphabet.target_index(c.word_index, c.char_index)) {
        Some(target) if target == index => CellText::Target,
        _ => CellText::Normal,
    }
}

// =============================================================================
// TESTS
// =============================================================================
