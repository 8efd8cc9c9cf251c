//! Blink reducer: per-frame eye readings → debounced blink edges
//!
//! State transitions (reading = "eye open enough"):
//! - OPEN    + closed → CLOSING, emits BLINK_START
//! - CLOSING + closed → CLOSED
//! - CLOSED  + open   → OPENING, emits BLINK_END
//! - OPENING + open   → OPEN
//! - CLOSING + open   → OPENING, emits BLINK_END (one-frame blink)
//! - OPENING + closed → CLOSING, emits BLINK_START (new episode)
//!
//! Repeated identical readings never emit twice, so every BLINK_START is
//! followed by exactly one BLINK_END.

use tracing::{debug, warn};
use crate::REFERENCE_EYE_OPEN_THRESHOLD;
use crate::types::{BlinkEdge, BlinkState, EyeSample, Sensitivity};

/// Debouncing edge detector for one eye
#[derive(Debug, Default, Clone)]
pub struct BlinkReducer {
    state: BlinkState,
}

impl BlinkReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading, return the edge it produced (if any)
    pub fn step(&mut self, eye_open_enough: bool) -> Option<BlinkEdge> {
        let (next, edge) = match (self.state, eye_open_enough) {
            (BlinkState::Open, false) => (BlinkState::Closing, Some(BlinkEdge::BlinkStart)),
            (BlinkState::Closing, false) => (BlinkState::Closed, None),
            (BlinkState::Closed, true) => (BlinkState::Opening, Some(BlinkEdge::BlinkEnd)),
            (BlinkState::Opening, true) => (BlinkState::Open, None),
            (BlinkState::Closing, true) => (BlinkState::Opening, Some(BlinkEdge::BlinkEnd)),
            (BlinkState::Opening, false) => (BlinkState::Closing, Some(BlinkEdge::BlinkStart)),
            (state, _) => (state, None),
        };

        if next != self.state {
            debug!(from = %self.state, to = %next, ?edge, "blink transition");
            self.state = next;
        }
        edge
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    /// Back to OPEN without emitting anything
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Turn a face-tracker sample into a reducer reading.
///
/// Returns `None` when the sample must be ignored: no face, a probability
/// outside 0..=1, or the reference eye is closing too (a natural two-eye blink).
pub fn gate_sample(sample: &EyeSample, sensitivity: Sensitivity) -> Option<bool> {
    if sample.face_count == 0 {
        return None;
    }
    if !is_probability(sample.left_open_probability) || !is_probability(sample.right_open_probability) {
        warn!(?sample, "eye sample outside 0..=1 ignored");
        return None;
    }
    if sample.face_count > 1 {
        warn!(faces = sample.face_count, "more than one face visible, reading the first");
    }
    if sample.left_open_probability < REFERENCE_EYE_OPEN_THRESHOLD {
        return None;
    }
    Some(sample.right_open_probability >= sensitivity.closed_below())
}

/// Finite and within 0..=1
pub fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(reducer: &mut BlinkReducer, readings: &[bool]) -> Vec<(usize, BlinkEdge)> {
        readings
            .iter()
            .enumerate()
            .filter_map(|(i, open)| reducer.step(*open).map(|e| (i, e)))
            .collect()
    }

    #[test]
    fn test_initial_state_is_open() {
        assert_eq!(BlinkReducer::new().state(), BlinkState::Open);
    }

    #[test]
    fn test_canonical_sequence() {
        let mut reducer = BlinkReducer::new();
        let edges = feed(&mut reducer, &[true, false, false, false, true, true]);
        assert_eq!(edges, vec![(1, BlinkEdge::BlinkStart), (4, BlinkEdge::BlinkEnd)]);
        assert_eq!(reducer.state(), BlinkState::Open);
    }

    #[test]
    fn test_long_closure_emits_once() {
        let mut reducer = BlinkReducer::new();
        let mut readings = vec![false; 50];
        readings.extend(vec![true; 50]);
        let edges = feed(&mut reducer, &readings);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].1, BlinkEdge::BlinkStart);
        assert_eq!(edges[1].1, BlinkEdge::BlinkEnd);
    }

    #[test]
    fn test_one_frame_blink_is_paired() {
        let mut reducer = BlinkReducer::new();
        let edges = feed(&mut reducer, &[false, true, true]);
        assert_eq!(edges, vec![(0, BlinkEdge::BlinkStart), (1, BlinkEdge::BlinkEnd)]);
        assert_eq!(reducer.state(), BlinkState::Open);
    }

    #[test]
    fn test_flicker_keeps_edges_alternating() {
        let mut reducer = BlinkReducer::new();
        let edges = feed(&mut reducer, &[false, false, true, false, false, true, true]);
        let kinds: Vec<BlinkEdge> = edges.into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            kinds,
            vec![BlinkEdge::BlinkStart, BlinkEdge::BlinkEnd, BlinkEdge::BlinkStart, BlinkEdge::BlinkEnd]
        );
    }

    #[test]
    fn test_gate_ignores_two_eye_blink_and_missing_face() {
        let both_closed = EyeSample::new(0.2, 0.1);
        assert_eq!(gate_sample(&both_closed, Sensitivity::Lenient), None);

        let mut no_face = EyeSample::new(0.9, 0.1);
        no_face.face_count = 0;
        assert_eq!(gate_sample(&no_face, Sensitivity::Lenient), None);
    }

    #[test]
    fn test_gate_sensitivity_thresholds() {
        let squint = EyeSample::new(0.95, 0.5);
        assert_eq!(gate_sample(&squint, Sensitivity::Lenient), Some(false));
        assert_eq!(gate_sample(&squint, Sensitivity::Strict), Some(true));

        let shut = EyeSample::new(0.95, 0.1);
        assert_eq!(gate_sample(&shut, Sensitivity::Strict), Some(false));
    }

    #[test]
    fn test_gate_reads_first_of_several_faces() {
        let mut crowded = EyeSample::new(0.95, 0.1);
        crowded.face_count = 2;
        assert_eq!(gate_sample(&crowded, Sensitivity::Lenient), Some(false));
        assert_eq!(gate_sample(&crowded, Sensitivity::Strict), Some(false));

        let mut open = EyeSample::new(0.95, 0.9);
        open.face_count = 3;
        assert_eq!(gate_sample(&open, Sensitivity::Lenient), Some(true));
        assert_eq!(gate_sample(&open, Sensitivity::Strict), Some(true));
    }

    #[test]
    fn test_gate_rejects_invalid_probabilities() {
        for bad in [f64::NAN, f64::INFINITY, -0.1, 1.5] {
            assert_eq!(gate_sample(&EyeSample::new(0.95, bad), Sensitivity::Lenient), None);
            assert_eq!(gate_sample(&EyeSample::new(bad, 0.1), Sensitivity::Strict), None);
        }
        assert!(is_probability(0.0));
        assert!(is_probability(1.0));
    }
}
