//! Gesture recognition: finger strikes and the fist-twist key shift

mod detector;
mod octave;

pub use detector::{FingerKey, GestureDetector, HeldNote, NoteSink, Transition};
pub use octave::OctaveShiftTracker;
