//! Voice engine for airkeys
//!
//! Tracks which notes are held, mixes the sounding voices and sends the
//! result to an audio device or a WAV file.

mod controller;
mod graph;
mod player;
mod recorder;
mod registry;

pub use controller::{FrameReport, KeyboardController};
pub use graph::{GraphRenderer, MixingGraph};
pub use player::{default_device_name, list_output_devices, AudioOutput, Player};
pub use recorder::Recorder;
pub use registry::{ShiftedVoices, VoiceRegistry};
