//! Core types for Blinkscan

mod error;
mod alphabet;
mod scan;
mod reason;
mod blink;
mod training;
mod log_entry;
mod output;

pub use error::{ConfigurationError, LogError};
pub use alphabet::{Alphabet, AlphabetSource, TrainingSource, Character, Word};
pub use scan::{ScanState, PendingCommand, SessionMode};
pub use reason::TickReason;
pub use blink::{BlinkState, BlinkEdge, EyeSample, Sensitivity};
pub use training::{TrainingCursor, TrainingOutcome, CellHighlight, CellText};
pub use log_entry::FrameLogEntry;
pub use output::{TickReport, SessionEvent};
