//! Error types for the keyboard engine

use thiserror::Error;

/// Errors raised by the sensor, voice and audio layers
#[derive(Debug, Error)]
pub enum KeyboardError {
    /// Every sustain slot is held by a sounding voice
    #[error("voice table full ({capacity} voices sounding)")]
    VoiceTableFull { capacity: usize },

    /// The hand tracker could not be reached or returned garbage
    #[error("sensor error: {0}")]
    Sensor(String),

    /// No usable audio output device
    #[error("audio device unavailable: {0}")]
    AudioDevice(String),

    /// The output stream could not be built or started
    #[error("audio stream error: {0}")]
    AudioStream(String),

    /// Unknown scale name in configuration or on the command line
    #[error("unknown scale '{0}'")]
    UnknownScale(String),
}

pub type Result<T> = std::result::Result<T, KeyboardError>;
