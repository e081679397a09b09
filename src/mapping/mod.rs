//! Pitch mapping: scale tables, the quantizer that snaps hand coordinates
//! onto them, and the integer pitch identity used to key voices.

mod pitch;
mod quantize;
mod scale;

pub use pitch::PitchKey;
pub use quantize::{quantize, step_index, Quantizer, GRANULARITY};
pub use scale::{semitones_from, Scale, ScaleName};
