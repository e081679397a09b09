//! airkeys - a plucked-string keyboard played in the air
//!
//! Hand-tracking frames come in, finger strikes are detected and snapped
//! to a scale, and each held pitch sounds as an enveloped plucked string
//! until the last finger on it lifts.

pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod mapping;
pub mod sensor;
pub mod synth;

pub use config::KeyboardConfig;
pub use engine::KeyboardController;
pub use error::{KeyboardError, Result};
