//! Async driver for a scan session
//!
//! The clock task, eye samples and commands all go through one
//! `tokio::sync::Mutex<ScanSession>`, so steps never interleave. The lock is
//! held only for the synchronous step itself; log writes are queued to the
//! frame log task and events go out on a broadcast channel.

use std::sync::{Arc, Weak};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::EVENT_CHANNEL_CAPACITY;
use crate::core::{FrameLogWriter, ScanClock, ScanSession};
use crate::core::clock::ClockTick;
use crate::types::{
    BlinkEdge, ConfigurationError, EyeSample, FrameLogEntry, LogError, ScanState, SessionEvent,
};

#[derive(Debug, Default)]
struct Control {
    clock: ScanClock,
    driver: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    session: Mutex<ScanSession>,
    events: broadcast::Sender<SessionEvent>,
    control: Mutex<Control>,
    log: Mutex<Option<FrameLogWriter>>,
}

/// Cloneable handle to a running (or stopped) session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn new(session: ScanSession) -> Self {
        Self::build(session, None)
    }

    /// Record a log entry for every tick
    pub fn with_log(session: ScanSession, writer: FrameLogWriter) -> Self {
        Self::build(session, Some(writer))
    }

    fn build(session: ScanSession, log: Option<FrameLogWriter>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                events,
                control: Mutex::new(Control::default()),
                log: Mutex::new(log),
            }),
        }
    }

    /// Tick, blink and stop events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Start the clock. A running session is restarted.
    pub async fn start(&self) -> Result<(), ConfigurationError> {
        let mut control = self.shared.control.lock().await;
        self.stop_locked(&mut control).await;
        self.start_locked(&mut control).await
    }

    /// Stop the clock, publish the last state, then tear down.
    /// Returns `None` when the session was not running.
    pub async fn stop(&self) -> Option<ScanState> {
        let mut control = self.shared.control.lock().await;
        self.stop_locked(&mut control).await
    }

    /// Change cadence: stop, update, restart if it was running
    pub async fn set_interval(&self, interval_ms: u32) -> Result<(), ConfigurationError> {
        if interval_ms == 0 {
            return Err(ConfigurationError::ZeroInterval);
        }
        let mut control = self.shared.control.lock().await;
        let was_running = self.stop_locked(&mut control).await.is_some();
        self.shared.session.lock().await.set_interval(interval_ms)?;
        info!(interval_ms, "scan interval changed");
        if was_running {
            self.start_locked(&mut control).await?;
        }
        Ok(())
    }

    async fn start_locked(&self, control: &mut Control) -> Result<(), ConfigurationError> {
        let interval_ms = {
            let mut session = self.shared.session.lock().await;
            session.start();
            session.tick_interval_ms()
        };

        let ticks = control.clock.start(interval_ms)?;
        let sink = self.shared.log.lock().await.as_ref().map(FrameLogWriter::sink);
        let shared = Arc::downgrade(&self.shared);
        control.driver = Some(tokio::spawn(drive(shared, ticks, sink)));
        Ok(())
    }

    async fn stop_locked(&self, control: &mut Control) -> Option<ScanState> {
        let was_running = control.clock.stop();
        if let Some(driver) = control.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "tick driver ended abnormally");
            }
        }
        if !was_running {
            return None;
        }

        let mut session = self.shared.session.lock().await;
        let last = session.state().clone();
        let _ = self.shared.events.send(SessionEvent::Stopped(last.clone()));
        session.stop(Utc::now());
        Some(last)
    }

    pub async fn is_running(&self) -> bool {
        self.shared.control.lock().await.clock.is_running()
    }

    /// Feed an "eye open enough" reading
    pub async fn eye_signal(&self, eye_open_enough: bool) -> Option<BlinkEdge> {
        let edge = self.shared.session.lock().await.eye_signal(eye_open_enough);
        self.publish_edge(edge)
    }

    /// Feed a raw face-tracker sample
    pub async fn eye_sample(&self, sample: EyeSample) -> Option<BlinkEdge> {
        let edge = self.shared.session.lock().await.eye_sample(&sample);
        self.publish_edge(edge)
    }

    fn publish_edge(&self, edge: Option<BlinkEdge>) -> Option<BlinkEdge> {
        if let Some(edge) = edge {
            let _ = self.shared.events.send(SessionEvent::from(edge));
        }
        edge
    }

    pub async fn pause(&self) {
        self.shared.session.lock().await.pause();
    }

    pub async fn reset(&self) {
        self.shared.session.lock().await.reset();
    }

    pub async fn resume(&self) {
        self.shared.session.lock().await.resume();
    }

    pub async fn build_log_entry(&self) -> FrameLogEntry {
        self.shared.session.lock().await.build_log_entry()
    }

    /// Read-only access to the session under the step lock
    pub async fn with_session<R>(&self, f: impl FnOnce(&ScanSession) -> R) -> R {
        let session = self.shared.session.lock().await;
        f(&session)
    }

    /// Stop and flush the frame log. Returns the number of lines written.
    pub async fn shutdown(&self) -> Result<Option<u64>, LogError> {
        self.stop().await;
        let writer = self.shared.log.lock().await.take();
        match writer {
            Some(writer) => writer.close().await.map(Some),
            None => Ok(None),
        }
    }
}

/// Tick handler: one step per clock tick, never awaiting I/O under the lock.
/// Holds the session weakly; once every handle is gone the clock is dropped
/// with it and the loop ends.
async fn drive(
    shared: Weak<Shared>,
    mut ticks: mpsc::Receiver<ClockTick>,
    sink: Option<mpsc::UnboundedSender<FrameLogEntry>>,
) {
    while let Some(tick) = ticks.recv().await {
        let Some(live) = shared.upgrade() else {
            break;
        };
        let (report, entry) = {
            let mut session = live.session.lock().await;
            let report = session.tick(tick.at);
            (report, sink.as_ref().map(|_| session.build_log_entry()))
        };

        if let (Some(sink), Some(entry)) = (&sink, entry) {
            if sink.send(entry).is_err() {
                warn!(seq = tick.seq, "frame log closed, entry dropped");
            }
        }
        let _ = live.events.send(SessionEvent::Tick(report));
    }
    debug!("tick driver finished");
}
