//! Alphabet catalog types
//!
//! An `Alphabet` can only be built through validation, so every training
//! glyph is guaranteed to resolve to a character of the scan grid.

use serde::{Deserialize, Serialize};
use crate::types::ConfigurationError;

/// One selectable cell of the scan grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier (e.g. "char-a")
    pub id: String,
    /// Single glyph shown in the grid
    pub label: String,
}

impl Character {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A training word: the glyphs the user is guided to select, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub label: String,
}

impl Word {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// On-disk shape of a catalog: `{"chars": [...], "training": {"words": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphabetSource {
    pub chars: Vec<Character>,
    #[serde(default)]
    pub training: TrainingSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSource {
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Validated alphabet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AlphabetSource", into = "AlphabetSource")]
pub struct Alphabet {
    chars: Vec<Character>,
    training_words: Vec<Word>,
    /// For each training word, the char index of every glyph
    targets: Vec<Vec<usize>>,
}

impl Alphabet {
    /// Validate and build. Labels are compared case-insensitively, both for
    /// uniqueness and for resolving training glyphs.
    pub fn new(chars: Vec<Character>, training_words: Vec<Word>) -> Result<Self, ConfigurationError> {
        if chars.is_empty() {
            return Err(ConfigurationError::EmptyAlphabet);
        }

        let mut folded: Vec<String> = Vec::with_capacity(chars.len());
        for ch in &chars {
            let mut glyphs = ch.label.chars();
            match (glyphs.next(), glyphs.next()) {
                (None, _) => return Err(ConfigurationError::EmptyLabel { id: ch.id.clone() }),
                (Some(_), Some(_)) => {
                    return Err(ConfigurationError::MultiGlyphLabel {
                        id: ch.id.clone(),
                        label: ch.label.clone(),
                    })
                }
                (Some(_), None) => {}
            }

            let key = ch.label.to_lowercase();
            if folded.contains(&key) {
                return Err(ConfigurationError::DuplicateLabel { label: ch.label.clone() });
            }
            folded.push(key);
        }

        let mut targets = Vec::with_capacity(training_words.len());
        for word in &training_words {
            if word.label.is_empty() {
                return Err(ConfigurationError::EmptyWord { id: word.id.clone() });
            }
            let resolved = word
                .label
                .chars()
                .map(|glyph| {
                    let key: String = glyph.to_lowercase().collect();
                    folded
                        .iter()
                        .position(|label| *label == key)
                        .ok_or_else(|| ConfigurationError::UnknownGlyph {
                            word: word.label.clone(),
                            glyph,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            targets.push(resolved);
        }

        Ok(Self {
            chars,
            training_words,
            targets,
        })
    }

    /// Number of characters in the scan (always ≥ 1)
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[Character] {
        &self.chars
    }

    pub fn char_at(&self, index: usize) -> Option<&Character> {
        self.chars.get(index)
    }

    pub fn training_words(&self) -> &[Word] {
        &self.training_words
    }

    pub fn word_at(&self, index: usize) -> Option<&Word> {
        self.training_words.get(index)
    }

    pub fn has_training(&self) -> bool {
        !self.training_words.is_empty()
    }

    /// Glyph count of a training word (0 if out of range)
    pub fn word_len(&self, word_index: usize) -> usize {
        self.targets.get(word_index).map(Vec::len).unwrap_or(0)
    }

    /// Char index targeted by glyph `char_index` of word `word_index`
    pub fn target_index(&self, word_index: usize, char_index: usize) -> Option<usize> {
        self.targets.get(word_index)?.get(char_index).copied()
    }

    /// Case-insensitive lookup of a label
    pub fn find_label(&self, label: &str) -> Option<usize> {
        let key = label.to_lowercase();
        self.chars.iter().position(|c| c.label.to_lowercase() == key)
    }
}

impl TryFrom<AlphabetSource> for Alphabet {
    type Error = ConfigurationError;

    fn try_from(source: AlphabetSource) -> Result<Self, Self::Error> {
        Alphabet::new(source.chars, source.training.words)
    }
}

impl From<Alphabet> for AlphabetSource {
    fn from(alphabet: Alphabet) -> Self {
        Self {
            chars: alphabet.chars,
            training: TrainingSource {
                words: alphabet.training_words,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(labels: &[&str]) -> Vec<Character> {
        labels
            .iter()
            .map(|l| Character::new(format!("char-{}", l), *l))
            .collect()
    }

    #[test]
    fn test_empty_alphabet_rejected() {
        let err = Alphabet::new(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyAlphabet));
    }

    #[test]
    fn test_multi_glyph_label_rejected() {
        let err = Alphabet::new(chars(&["a", "ch"]), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MultiGlyphLabel { .. }));
    }

    #[test]
    fn test_duplicate_label_is_case_insensitive() {
        let err = Alphabet::new(chars(&["a", "A"]), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateLabel { .. }));
    }

    #[test]
    fn test_unknown_training_glyph_rejected() {
        let err = Alphabet::new(chars(&["a", "b"]), vec![Word::new("w1", "abc")]).unwrap_err();
        match err {
            ConfigurationError::UnknownGlyph { word, glyph } => {
                assert_eq!(word, "abc");
                assert_eq!(glyph, 'c');
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_training_glyphs_resolve_case_insensitively() {
        let alphabet = Alphabet::new(chars(&["a", "b", "h", "i"]), vec![Word::new("w1", "Hi")]).unwrap();
        assert_eq!(alphabet.word_len(0), 2);
        assert_eq!(alphabet.target_index(0, 0), Some(2));
        assert_eq!(alphabet.target_index(0, 1), Some(3));
        assert_eq!(alphabet.target_index(0, 2), None);
    }

    #[test]
    fn test_json_shape_round_trips_through_validation() {
        let json = r#"{"chars":[{"id":"c1","label":"x"}],"training":{"words":[{"id":"w1","label":"X"}]}}"#;
        let alphabet: Alphabet = serde_json::from_str(json).unwrap();
        assert_eq!(alphabet.len(), 1);
        assert_eq!(alphabet.target_index(0, 0), Some(0));

        let bad = r#"{"chars":[]}"#;
        assert!(serde_json::from_str::<Alphabet>(bad).is_err());
    }
}
