//! Blink signal types

use serde::{Deserialize, Serialize};
use crate::{EYE_CLOSED_THRESHOLD_LENIENT, EYE_CLOSED_THRESHOLD_STRICT};

/// Debounce state of the watched eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlinkState {
    /// Eye open, no episode in progress
    #[default]
    Open,
    /// First closed reading seen, BlinkStart already emitted
    Closing,
    /// Eye held closed
    Closed,
    /// First open reading after an episode, BlinkEnd already emitted
    Opening,
}

impl std::fmt::Display for BlinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlinkState::Open => "OPEN",
            BlinkState::Closing => "CLOSING",
            BlinkState::Closed => "CLOSED",
            BlinkState::Opening => "OPENING",
        };
        write!(f, "{}", name)
    }
}

/// Edge event emitted by the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlinkEdge {
    BlinkStart,
    BlinkEnd,
}

/// How far the winking eye must close before it counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Open probability below 0.4
    Strict,
    /// Open probability below 0.75
    #[default]
    Lenient,
}

impl Sensitivity {
    /// Open probability under which the eye is considered closed
    pub fn closed_below(&self) -> f64 {
        match self {
            Sensitivity::Strict => EYE_CLOSED_THRESHOLD_STRICT,
            Sensitivity::Lenient => EYE_CLOSED_THRESHOLD_LENIENT,
        }
    }
}

impl std::str::FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Sensitivity::Strict),
            "lenient" => Ok(Sensitivity::Lenient),
            other => Err(format!("unknown sensitivity '{}' (expected strict or lenient)", other)),
        }
    }
}

/// One reading from the face tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeSample {
    /// Reference eye, must stay open for the sample to count
    pub left_open_probability: f64,
    /// Watched eye
    pub right_open_probability: f64,
    /// Faces in frame; only the first is read
    #[serde(default = "one_face")]
    pub face_count: u32,
}

fn one_face() -> u32 {
    1
}

impl EyeSample {
    pub fn new(left_open_probability: f64, right_open_probability: f64) -> Self {
        Self {
            left_open_probability,
            right_open_probability,
            face_count: 1,
        }
    }
}
