//! Synthesis: plucked strings, envelopes and the sustain slots that let a
//! playing note be ended from another thread.

mod envelope;
mod pluck;
mod sustain;
mod voice;

pub use envelope::Ramp;
pub use pluck::PluckedString;
pub use sustain::{SlotId, SlotState, SustainTable};
pub use voice::{SoundingVoice, Voice, VoiceShape};
