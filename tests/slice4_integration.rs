//! Integration tests for Slice 4 - Async runtime
//!
//! Tests ScanClock → SessionHandle driver → events and the frame log file

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use blinkscan::core::{default_alphabet, read_log, FrameLogWriter, ScanClock, ScanSession, SessionConfig, SessionHandle};
use blinkscan::types::{Alphabet, BlinkEdge, Character, SessionEvent, SessionMode, TickReport};

fn abc() -> Arc<Alphabet> {
    let chars = "abc"
        .chars()
        .map(|c| Character::new(format!("char-{}", c), c.to_string()))
        .collect();
    Arc::new(Alphabet::new(chars, Vec::new()).unwrap())
}

fn handle(interval_ms: u32) -> SessionHandle {
    let config = SessionConfig {
        tick_interval_ms: interval_ms,
        ..SessionConfig::default()
    };
    SessionHandle::new(ScanSession::new("talk-runtime", abc(), config).unwrap())
}

async fn next_tick(events: &mut broadcast::Receiver<SessionEvent>) -> TickReport {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Tick(report)) => return report,
            Ok(_) => continue,
            Err(e) => panic!("event stream ended: {}", e),
        }
    }
}

fn temp_log_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("blinkscan-{}-{}", name, nanos))
}

#[tokio::test(start_paused = true)]
async fn test_clock_ticks_in_order() {
    let mut clock = ScanClock::new();
    let mut ticks = clock.start(300).unwrap();

    let first = ticks.recv().await.unwrap();
    let second = ticks.recv().await.unwrap();
    assert_eq!(first.seq + 1, second.seq);
    assert!(second.at >= first.at);

    assert!(clock.stop());
    assert!(!clock.stop());
    assert!(!clock.is_running());

    // At most one buffered tick, then the channel closes
    let mut drained = 0;
    while ticks.recv().await.is_some() {
        drained += 1;
    }
    assert!(drained <= 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_ticks_in_sequence() {
    let handle = handle(300);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    for expected in 1..=7u64 {
        let report = next_tick(&mut events).await;
        assert_eq!(report.state.tick_index, expected);
        assert_eq!(report.state.highlighted_index, (expected % 3) as usize);
    }

    let last = handle.stop().await.unwrap();
    assert!(last.tick_index >= 7);
    assert!(!handle.is_running().await);
    assert_eq!(handle.with_session(|s| s.state().tick_index).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_publishes_last_state() {
    let handle = handle(100);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();
    next_tick(&mut events).await;
    next_tick(&mut events).await;

    let last = handle.stop().await.unwrap();
    loop {
        match events.recv().await.unwrap() {
            SessionEvent::Stopped(state) => {
                assert_eq!(state, last);
                break;
            }
            _ => continue,
        }
    }

    // Second stop is a no-op
    assert!(handle.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_blink_holds_then_selects() {
    let handle = handle(300);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    let report = next_tick(&mut events).await;
    assert_eq!(report.state.highlighted_index, 1);

    assert_eq!(handle.eye_signal(false).await, Some(BlinkEdge::BlinkStart));
    for _ in 0..3 {
        let report = next_tick(&mut events).await;
        assert_eq!(report.state.highlighted_index, 1);
    }

    assert_eq!(handle.eye_signal(true).await, Some(BlinkEdge::BlinkEnd));
    let report = next_tick(&mut events).await;
    assert_eq!(report.state.highlighted_index, 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_set_interval_restarts_clock() {
    let handle = handle(300);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();
    next_tick(&mut events).await;

    handle.set_interval(150).await.unwrap();
    assert!(handle.is_running().await);

    // Skip ticks published before the restart
    let mut report = next_tick(&mut events).await;
    while report.state.tick_interval_ms != 150 {
        report = next_tick(&mut events).await;
    }
    assert_eq!(report.state.tick_index, 1);
    assert_eq!(report.state.delta_ms, 150);

    assert!(handle.set_interval(0).await.is_err());
    handle.stop().await;
}

#[tokio::test]
async fn test_frame_log_written_per_tick() {
    let dir = temp_log_dir("frames");
    let config = SessionConfig {
        mode: SessionMode::Train,
        tick_interval_ms: 5,
        ..SessionConfig::default()
    };
    let session = ScanSession::new("training-frames", Arc::new(default_alphabet()), config).unwrap();
    let writer = FrameLogWriter::spawn(&dir, session.id());
    let path = writer.path().to_path_buf();

    let handle = SessionHandle::with_log(session, writer);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();
    for _ in 0..5 {
        tokio::time::timeout(Duration::from_secs(5), next_tick(&mut events))
            .await
            .unwrap();
    }

    let written = handle.shutdown().await.unwrap().unwrap();
    assert!(written >= 5);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with('\n'));

    let entries = read_log(&path).unwrap();
    assert_eq!(entries.len() as u64, written);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.tick_index, i as u64 + 1);
        assert_eq!(entry.delta, 5);
        assert!(entry.training_word_id.is_some());
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_writer_appends_to_existing_file() {
    let dir = temp_log_dir("append");
    let alphabet = default_alphabet();
    let state = blinkscan::types::ScanState::new(300);

    for _ in 0..2 {
        let writer = FrameLogWriter::spawn(&dir, "talk-append");
        assert!(writer.record(blinkscan::core::build_log_entry(&state, &alphabet, None)));
        assert_eq!(writer.close().await.unwrap(), 1);
    }

    let entries = read_log(blinkscan::core::log_path(&dir, "talk-append")).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], entries[1]);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_stops_ticking() {
    let handle = handle(100);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();
    next_tick(&mut events).await;
    drop(handle);

    let ticks_after_drop = tokio::time::timeout(Duration::from_secs(60), async {
        let mut ticks = 0;
        loop {
            match events.recv().await {
                Ok(SessionEvent::Tick(_)) => ticks += 1,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return ticks,
            }
        }
    })
    .await
    .expect("event stream still open after the last handle was dropped");
    assert!(ticks_after_drop <= 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_starts_restart_cleanly() {
    let handle = handle(300);
    let mut events = handle.subscribe();

    let (first, second) = tokio::join!(handle.start(), handle.start());
    first.unwrap();
    second.unwrap();
    assert!(handle.is_running().await);
    handle.stop().await.unwrap();

    // One stop for the restart, one for the explicit stop
    let mut stopped = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::Stopped(_)) {
            stopped += 1;
        }
    }
    assert_eq!(stopped, 2);
    assert!(!handle.is_running().await);
}
