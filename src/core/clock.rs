//! Scan clock: periodic ticks on a tokio task
//!
//! Each tick is scheduled one interval after the previous one was handed
//! over, so a slow consumer delays the scan instead of piling up ticks.
//! Drift is accepted; every tick carries the wall-clock time it fired.

use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::debug;
use crate::types::ConfigurationError;

/// One clock firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// 1-based count since `start`
    pub seq: u64,
    pub at: DateTime<Utc>,
}

/// Start/stop owner of the tick task
#[derive(Debug, Default)]
pub struct ScanClock {
    stop_tx: Option<watch::Sender<bool>>,
    interval_ms: Option<u32>,
}

impl ScanClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin ticking every `interval_ms`. A running clock is stopped first.
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self, interval_ms: u32) -> Result<mpsc::Receiver<ClockTick>, ConfigurationError> {
        if interval_ms == 0 {
            return Err(ConfigurationError::ZeroInterval);
        }
        self.stop();

        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let interval = Duration::from_millis(u64::from(interval_ms));

        tokio::spawn(run(interval, tick_tx, stop_rx));
        self.stop_tx = Some(stop_tx);
        self.interval_ms = Some(interval_ms);
        debug!(interval_ms, "scan clock started");
        Ok(tick_rx)
    }

    /// Halt ticking. Idempotent; returns whether a running clock was stopped.
    pub fn stop(&mut self) -> bool {
        self.interval_ms = None;
        match self.stop_tx.take() {
            Some(tx) => {
                // Receiver may already be gone if the consumer hung up
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    pub fn interval_ms(&self) -> Option<u32> {
        self.interval_ms
    }
}

impl Drop for ScanClock {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(interval: Duration, ticks: mpsc::Sender<ClockTick>, mut stop: watch::Receiver<bool>) {
    let mut seq = 0u64;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.changed() => break,
        }

        seq += 1;
        let tick = ClockTick { seq, at: Utc::now() };
        tokio::select! {
            sent = ticks.send(tick) => {
                if sent.is_err() {
                    break;
                }
            }
            _ = stop.changed() => break,
        }
    }
    debug!(ticks = seq, "scan clock task finished");
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_sequential() {
        let mut clock = ScanClock::new();
        let mut rx = clock.start(300).unwrap();

        for expected in 1..=5 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick.seq, expected);
        }
        assert!(clock.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_stream_and_is_idempotent() {
        let mut clock = ScanClock::new();
        let mut rx = clock.start(100).unwrap();
        rx.recv().await.unwrap();

        assert!(clock.stop());
        assert!(!clock.stop());
        assert!(!clock.is_running());

        // At most one buffered tick remains, then the channel closes
        let mut remaining = 0;
        while rx.recv().await.is_some() {
            remaining += 1;
        }
        assert!(remaining <= 1);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let mut clock = ScanClock::new();
        assert!(!clock.stop());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let mut clock = ScanClock::new();
        assert!(matches!(clock.start(0), Err(ConfigurationError::ZeroInterval)));
    }
}
