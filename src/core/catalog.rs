//! Alphabet catalog: built-in default or a JSON file

use lazy_static::lazy_static;
use tracing::info;
use crate::types::{Alphabet, AlphabetSource, Character, ConfigurationError, Word};

/// Glyphs of the built-in grid: a-z, space, question mark (4 × 7 cells)
const DEFAULT_GLYPHS: &str = "abcdefghijklmnopqrstuvwxyz ?";

/// Built-in training words
const DEFAULT_TRAINING_WORDS: [&str; 6] = ["ja", "nee", "hallo", "help", "dank je", "pijn"];

lazy_static! {
    static ref DEFAULT_ALPHABET: Alphabet = build_default();
}

fn build_default() -> Alphabet {
    let chars = DEFAULT_GLYPHS
        .chars()
        .map(|c| {
            let id = match c {
                ' ' => "char-space".to_string(),
                '?' => "char-question".to_string(),
                other => format!("char-{}", other),
            };
            Character::new(id, c.to_string())
        })
        .collect();

    let words = DEFAULT_TRAINING_WORDS
        .iter()
        .enumerate()
        .map(|(i, w)| Word::new(format!("word-{}", i + 1), *w))
        .collect();

    // The constants above satisfy every catalog invariant
    match Alphabet::new(chars, words) {
        Ok(alphabet) => alphabet,
        Err(e) => unreachable!("built-in alphabet is invalid: {}", e),
    }
}

/// The built-in alphabet
pub fn default_alphabet() -> Alphabet {
    DEFAULT_ALPHABET.clone()
}

/// Parse and validate a catalog from JSON text
pub fn parse_alphabet(json: &str) -> Result<Alphabet, ConfigurationError> {
    let source: AlphabetSource = serde_json::from_str(json)?;
    Alphabet::try_from(source)
}

/// Load the catalog: from `path` when given, otherwise the built-in one
pub fn load_alphabet(path: Option<&str>) -> Result<Alphabet, ConfigurationError> {
    let alphabet = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
                path: path.to_string(),
                source,
            })?;
            parse_alphabet(&json)?
        }
        None => default_alphabet(),
    };

    info!(
        chars = alphabet.len(),
        words = alphabet.training_words().len(),
        source = path.unwrap_or("built-in"),
        "alphabet loaded"
    );
    Ok(alphabet)
}

// =============================================================================
// TESTS
// =============================================================================
