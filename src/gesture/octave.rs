//! Fist-twist pitch shifting

use tracing::info;

use crate::config::OctaveConfig;
use crate::sensor::{Frame, Hand};

/// Accumulates a pitch multiplier from twisting a closed fist.
///
/// Every frame in which a hand is a fist and has turned far enough since
/// the previous frame adds a fraction of that rotation to the shift. The
/// shift persists until [`reset`](Self::reset) and is never clamped.
#[derive(Debug, Clone)]
pub struct OctaveShiftTracker {
    config: OctaveConfig,
    shift: f64,
}

impl OctaveShiftTracker {
    pub fn new(config: OctaveConfig) -> Self {
        Self { config, shift: 1.0 }
    }

    /// Current multiplier applied to every new note
    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn reset(&mut self) {
        self.shift = 1.0;
    }

    /// Check `hand` against its pose in `previous`.
    ///
    /// Returns the new shift when it changed.
    pub fn observe(&mut self, hand: &Hand, previous: &Frame) -> Option<f64> {
        if hand.grab_strength <= self.config.fist_threshold {
            return None;
        }
        let rotation = hand.rotation_angle(previous, self.config.axis);
        self.apply_rotation(hand.grab_strength, rotation)
    }

    /// Fold one frame's rotation into the shift
    pub fn apply_rotation(&mut self, grab_strength: f64, rotation: f64) -> Option<f64> {
        if grab_strength <= self.config.fist_threshold
            || rotation.abs() <= self.config.rotation_threshold
        {
            return None;
        }
        self.shift += rotation / self.config.rotation_divisor;
        info!(shift = self.shift, "key shift changed");
        Some(self.shift)
    }
}
