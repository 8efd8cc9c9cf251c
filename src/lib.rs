//! Blinkscan: blink-gated alphabet scanner
//!
//! Clock → ScanMachine → TrainingCoordinator → FrameLogEntry,
//! with the BlinkReducer feeding pause/reset commands back into the scan.

pub mod core;
pub mod types;

// =============================================================================
// SCAN TIMING
// =============================================================================

/// Default scan cadence (milliseconds per highlighted character)
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 300;

// =============================================================================
// EYE THRESHOLDS
// =============================================================================

/// The reference (left) eye must be at least this open for a sample to count.
/// Below it both eyes are closing, which is a natural blink, not a wink.
pub const REFERENCE_EYE_OPEN_THRESHOLD: f64 = 0.75;

/// Strict sensitivity: the winking eye must be nearly shut
pub const EYE_CLOSED_THRESHOLD_STRICT: f64 = 0.4;

/// Lenient sensitivity: any noticeable squint counts
pub const EYE_CLOSED_THRESHOLD_LENIENT: f64 = 0.75;

// =============================================================================
// PRESENTATION / RUNTIME
// =============================================================================

/// Characters per row when the grid is rendered
pub const GRID_COLUMNS: usize = 4;

/// Capacity of the per-session event broadcast
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
