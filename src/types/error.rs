//! Error types
//!
//! `ConfigurationError` is the only error the core can raise, and only while
//! an alphabet or session is being built. `LogError` belongs to the frame-log
//! file writer.

use thiserror::Error;

/// Catalog or session configuration rejected at load time
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("alphabet has no characters")]
    EmptyAlphabet,

    #[error("character '{id}' has an empty label")]
    EmptyLabel { id: String },

    #[error("character '{id}' label {label:?} is not a single glyph")]
    MultiGlyphLabel { id: String, label: String },

    #[error("label {label:?} appears more than once in the alphabet")]
    DuplicateLabel { label: String },

    #[error("training word '{id}' has no glyphs")]
    EmptyWord { id: String },

    #[error("training word '{word}' uses {glyph:?}, which is not in the alphabet")]
    UnknownGlyph { word: String, glyph: char },

    #[error("training mode needs at least one training word")]
    NoTrainingWords,

    #[error("tick interval must be greater than zero")]
    ZeroInterval,

    #[error("cannot read alphabet from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("alphabet JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure writing or reading a frame log file
#[derive(Debug, Error)]
pub enum LogError {
    #[error("frame log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame log entry could not be encoded: {0}")]
    Encode(serde_json::Error),

    #[error("frame log line {line} is not a valid entry: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
