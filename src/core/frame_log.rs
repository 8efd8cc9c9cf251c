//! Frame log: pure entry builder plus the append-only session log file
//!
//! File format: UTF-8, every entry written as "\n" + one JSON object, so a
//! fresh file starts with an empty line. Lines are appended; existing content
//! is never rewritten.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use crate::types::{Alphabet, FrameLogEntry, LogError, ScanState, TrainingCursor};

/// Build the log record for the given state. Pure: same inputs, same entry.
pub fn build_log_entry(
    state: &ScanState,
    alphabet: &Alphabet,
    cursor: Option<TrainingCursor>,
) -> FrameLogEntry {
    let highlighted = alphabet.char_at(state.highlighted_index);

    // Training fields only exist when there is a word to point at
    let cursor = cursor.filter(|c| alphabet.word_at(c.word_index).is_some());
    let word = cursor.and_then(|c| alphabet.word_at(c.word_index));
    let target = cursor
        .and_then(|c| alphabet.target_index(c.word_index, c.char_index))
        .and_then(|i| alphabet.char_at(i));

    FrameLogEntry {
        tick_index: state.tick_index,
        timestamp: state.timestamp_ms(),
        delta: state.delta_ms,
        highlighted_index: state.highlighted_index,
        highlighted_character_id: highlighted.map(|c| c.id.clone()).unwrap_or_default(),
        highlighted_character_label: highlighted.map(|c| c.label.clone()).unwrap_or_default(),
        training_word_index: cursor.map(|c| c.word_index),
        training_word_id: word.map(|w| w.id.clone()),
        training_word_label: word.map(|w| w.label.clone()),
        training_char_index: cursor.map(|c| c.char_index),
        training_char_id: target.map(|c| c.id.clone()),
        training_char_label: target.map(|c| c.label.clone()),
    }
}

/// Location of a session's log file
pub fn log_path(dir: impl AsRef<Path>, session_id: &str) -> PathBuf {
    dir.as_ref().join(format!("{}.txt", session_id))
}

/// Read a log file back, skipping blank lines
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<FrameLogEntry>, LogError> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| LogError::Decode { line: i + 1, source })
        })
        .collect()
}

/// Background appender. `record` never blocks; the file is written on a
/// separate tokio task.
#[derive(Debug)]
pub struct FrameLogWriter {
    path: PathBuf,
    tx: mpsc::UnboundedSender<FrameLogEntry>,
    task: JoinHandle<Result<u64, LogError>>,
}

impl FrameLogWriter {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(dir: impl AsRef<Path>, session_id: &str) -> Self {
        let path = log_path(dir, session_id);
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_loop(path.clone(), rx));
        info!(path = %path.display(), "frame log opened");
        Self { path, tx, task }
    }

    /// Queue an entry; false if the writer already stopped
    pub fn record(&self, entry: FrameLogEntry) -> bool {
        self.tx.send(entry).is_ok()
    }

    /// Extra sender for producers on other tasks. Every sink must be dropped
    /// before `close` can finish.
    pub fn sink(&self) -> mpsc::UnboundedSender<FrameLogEntry> {
        self.tx.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything queued so far and return the number of lines written
    pub async fn close(self) -> Result<u64, LogError> {
        drop(self.tx);
        match self.task.await {
            Ok(result) => result,
            Err(join) => Err(LogError::Io(std::io::Error::new(std::io::ErrorKind::Other, join))),
        }
    }
}

async fn write_loop(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<FrameLogEntry>,
) -> Result<u64, LogError> {
    let result = append_all(&path, &mut rx).await;
    if let Err(e) = &result {
        error!(path = %path.display(), error = %e, "frame log write failed");
    }
    result
}

async fn append_all(
    path: &Path,
    rx: &mut mpsc::UnboundedReceiver<FrameLogEntry>,
) -> Result<u64, LogError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut written = 0u64;
    while let Some(entry) = rx.recv().await {
        let line = format!("\n{}", entry.to_json_line()?);
        file.write_all(line.as_bytes()).await?;
        written += 1;
    }
    file.flush().await?;
    Ok(written)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::types::{Character, Word};

    fn alphabet() -> Alphabet {
        Alphabet::new(
            vec![Character::new("c-a", "a"), Character::new("c-b", "b")],
            vec![Word::new("w-ab", "ab"), Word::new("w-ba", "BA")],
        )
        .unwrap()
    }

    fn state() -> ScanState {
        let mut state = ScanState::new(300);
        state.tick_index = 4;
        state.highlighted_index = 1;
        state.last_tick_timestamp = Some(Utc.timestamp_millis_opt(1_700_000_001_200).unwrap());
        state
    }

    #[test]
    fn test_entry_resolves_labels() {
        let entry = build_log_entry(&state(), &alphabet(), Some(TrainingCursor::new(1, 0)));
        assert_eq!(entry.tick_index, 4);
        assert_eq!(entry.timestamp, Some(1_700_000_001_200));
        assert_eq!(entry.delta, 300);
        assert_eq!(entry.highlighted_character_id, "c-b");
        assert_eq!(entry.training_word_label.as_deref(), Some("BA"));
        // Glyph 'B' resolves to the lower-case character
        assert_eq!(entry.training_char_id.as_deref(), Some("c-b"));
        assert_eq!(entry.training_char_label.as_deref(), Some("b"));
    }

    #[test]
    fn test_entry_without_training() {
        let entry = build_log_entry(&state(), &alphabet(), None);
        assert_eq!(entry.training_word_id, None);
        assert_eq!(entry.training_char_index, None);
    }

    #[test]
    fn test_builder_is_deterministic() {
        let a = build_log_entry(&state(), &alphabet(), Some(TrainingCursor::default()));
        let b = build_log_entry(&state(), &alphabet(), Some(TrainingCursor::default()));
        assert_eq!(a.to_json_line().unwrap(), b.to_json_line().unwrap());
    }

    #[test]
    fn test_log_path_uses_session_id() {
        let path = log_path("/tmp/logs", "training-42");
        assert_eq!(path, PathBuf::from("/tmp/logs/training-42.txt"));
    }
}
