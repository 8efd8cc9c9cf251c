//! Scan state machine: one highlighted character per tick
//!
//! Per tick, in order:
//! - RESET pending → index 0, command cleared, no normal step
//! - PAUSE pending → index held, command stays queued
//! - otherwise     → index + 1, wrapping to 0
//!
//! `tick_index`, timestamp and delta advance on every tick, paused or not.

use chrono::{DateTime, Utc};
use tracing::debug;
use crate::types::{ConfigurationError, PendingCommand, ScanState, TickReason};

/// Owner of the scan state
#[derive(Debug, Clone)]
pub struct ScanMachine {
    state: ScanState,
    alphabet_len: usize,
}

impl ScanMachine {
    /// Create a machine for an alphabet of `alphabet_len` characters
    pub fn new(alphabet_len: usize, tick_interval_ms: u32) -> Result<Self, ConfigurationError> {
        if alphabet_len == 0 {
            return Err(ConfigurationError::EmptyAlphabet);
        }
        if tick_interval_ms == 0 {
            return Err(ConfigurationError::ZeroInterval);
        }
        Ok(Self {
            state: ScanState::new(tick_interval_ms),
            alphabet_len,
        })
    }

    /// Apply one tick stamped at `now`
    pub fn advance(&mut self, now: DateTime<Utc>) -> TickReason {
        let state = &mut self.state;

        let reason = match state.pending_command {
            PendingCommand::Reset => {
                state.highlighted_index = 0;
                state.pending_command = PendingCommand::None;
                TickReason::Reset
            }
            PendingCommand::Pause => TickReason::Held,
            PendingCommand::None => {
                state.highlighted_index = (state.highlighted_index + 1) % self.alphabet_len;
                TickReason::Advanced
            }
        };

        state.tick_index += 1;
        state.last_tick_timestamp = Some(now);
        state.delta_ms = state.tick_interval_ms;

        debug!(
            tick = state.tick_index,
            index = state.highlighted_index,
            reason = reason.code(),
            "scan tick"
        );
        reason
    }

    /// Queue a pause unless a reset is already queued
    pub fn enqueue_pause(&mut self) {
        if self.state.pending_command != PendingCommand::Reset {
            self.state.pending_command = PendingCommand::Pause;
        }
    }

    /// Queue a reset, replacing any pause
    pub fn enqueue_reset(&mut self) {
        self.state.pending_command = PendingCommand::Reset;
    }

    /// Drop a queued pause so the scan resumes from where it was held
    pub fn clear_pause(&mut self) {
        if self.state.pending_command == PendingCommand::Pause {
            self.state.pending_command = PendingCommand::None;
        }
    }

    /// Return the last state and reset to the canonical zero state stamped at `now`
    pub fn teardown(&mut self, now: DateTime<Utc>) -> ScanState {
        let mut zero = ScanState::new(self.state.tick_interval_ms);
        zero.last_tick_timestamp = Some(now);
        std::mem::replace(&mut self.state, zero)
    }

    /// Change cadence; only valid between teardown and the next start
    pub fn set_interval(&mut self, tick_interval_ms: u32) -> Result<(), ConfigurationError> {
        if tick_interval_ms == 0 {
            return Err(ConfigurationError::ZeroInterval);
        }
        self.state.tick_interval_ms = tick_interval_ms;
        self.state.delta_ms = tick_interval_ms;
        Ok(())
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn highlighted_index(&self) -> usize {
        self.state.highlighted_index
    }

    pub fn pending_command(&self) -> PendingCommand {
        self.state.pending_command
    }

    pub fn alphabet_len(&self) -> usize {
        self.alphabet_len
    }
}

// =============================================================================
// TESTS
// =============================================================================
