//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::mapping::ScaleName;
use crate::sensor::Axis;
use crate::synth::VoiceShape;

/// Main configuration for airkeys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Note envelope and polyphony
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Press/release detection thresholds
    #[serde(default)]
    pub gesture: GestureConfig,

    /// Fist-twist pitch shifting
    #[serde(default)]
    pub octave: OctaveConfig,

    /// Polling and scale selection
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl KeyboardConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }
        if !(0.0..=1.0).contains(&self.audio.master_volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }

        if !(0.0..=1.0).contains(&self.voice.level) {
            bail!("Voice level must be between 0.0 and 1.0");
        }
        if self.voice.attack_ms < 0.0 || self.voice.release_ms < 0.0 {
            bail!("Attack and release times must not be negative");
        }
        if self.voice.pluck_tau_ms <= 0.0 {
            bail!("Pluck decay time must be positive");
        }
        if self.voice.max_voices == 0 || self.voice.max_voices > 1024 {
            bail!("Max voices must be between 1 and 1024");
        }

        if !(0.0..=1.0).contains(&self.gesture.min_confidence) {
            bail!("Minimum confidence must be between 0.0 and 1.0");
        }
        if self.gesture.press_velocity >= 0.0 {
            bail!("Press velocity must be negative (downward)");
        }
        if self.gesture.thumb_release_distance <= 0.0 {
            bail!("Thumb release distance must be positive");
        }

        if !(0.0..=1.0).contains(&self.octave.fist_threshold) {
            bail!("Fist threshold must be between 0.0 and 1.0");
        }
        if self.octave.rotation_divisor == 0.0 {
            bail!("Rotation divisor must not be zero");
        }

        if self.controller.poll_interval_ms == 0 || self.controller.poll_interval_ms > 1000 {
            bail!("Poll interval must be between 1 and 1000 ms");
        }

        Ok(())
    }

    /// Envelope shape for new voices at the configured sample rate
    pub fn voice_shape(&self) -> VoiceShape {
        VoiceShape {
            attack: self.voice.attack_ms / 1000.0,
            release: self.voice.release_ms / 1000.0,
            level: self.voice.level,
            tau: self.voice.pluck_tau_ms / 1000.0,
            sample_rate: f64::from(self.audio.sample_rate),
        }
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in samples (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Gain applied to the mix 0.0-1.0 (default: 1.0)
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
            master_volume: default_master_volume(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }
fn default_master_volume() -> f64 { 1.0 }

/// Note envelope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Fade-in time in ms (default: 100)
    #[serde(default = "default_attack_ms")]
    pub attack_ms: f64,

    /// Fade-out time after the last finger lifts, in ms (default: 450)
    #[serde(default = "default_release_ms")]
    pub release_ms: f64,

    /// Sustain amplitude per note 0.0-1.0 (default: 0.5)
    #[serde(default = "default_level")]
    pub level: f64,

    /// Plucked string decay time constant in ms (default: 800)
    #[serde(default = "default_pluck_tau_ms")]
    pub pluck_tau_ms: f64,

    /// Notes that may sound at once, including fading ones (default: 64)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            attack_ms: default_attack_ms(),
            release_ms: default_release_ms(),
            level: default_level(),
            pluck_tau_ms: default_pluck_tau_ms(),
            max_voices: default_max_voices(),
        }
    }
}

fn default_attack_ms() -> f64 { 100.0 }
fn default_release_ms() -> f64 { 450.0 }
fn default_level() -> f64 { 0.5 }
fn default_pluck_tau_ms() -> f64 { 800.0 }
fn default_max_voices() -> usize { 64 }

/// Finger press/release detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Hands tracked with less confidence are ignored (default: 0.9)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Palm-to-thumbtip height (mm) beyond which the thumb counts as lifted (default: 30)
    #[serde(default = "default_thumb_release_distance")]
    pub thumb_release_distance: f64,

    /// Knuckle direction y above which a finger counts as curled (default: 0.2)
    #[serde(default = "default_curl_threshold")]
    pub curl_threshold: f64,

    /// Extra allowance above the curl threshold before a release (default: 0.03)
    #[serde(default = "default_curl_release_margin")]
    pub curl_release_margin: f64,

    /// Fingertip y velocity (mm/s) a press must be faster than (default: -300)
    #[serde(default = "default_press_velocity")]
    pub press_velocity: f64,

    /// Raw pitch added per finger slot when spreading a chord (default: 20)
    #[serde(default = "default_spread_step")]
    pub spread_step: f64,

    /// Raw pitch subtracted for left-hand notes (default: 100)
    #[serde(default = "default_left_hand_offset")]
    pub left_hand_offset: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            thumb_release_distance: default_thumb_release_distance(),
            curl_threshold: default_curl_threshold(),
            curl_release_margin: default_curl_release_margin(),
            press_velocity: default_press_velocity(),
            spread_step: default_spread_step(),
            left_hand_offset: default_left_hand_offset(),
        }
    }
}

fn default_min_confidence() -> f64 { 0.9 }
fn default_thumb_release_distance() -> f64 { 30.0 }
fn default_curl_threshold() -> f64 { 0.2 }
fn default_curl_release_margin() -> f64 { 0.03 }
fn default_press_velocity() -> f64 { -300.0 }
fn default_spread_step() -> f64 { 20.0 }
fn default_left_hand_offset() -> f64 { 100.0 }

/// Fist-twist octave shift configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OctaveConfig {
    /// Grab strength above which a hand is a fist (default: 0.95)
    #[serde(default = "default_fist_threshold")]
    pub fist_threshold: f64,

    /// Smallest per-frame rotation (radians) that counts as a twist (default: 0.06)
    #[serde(default = "default_rotation_threshold")]
    pub rotation_threshold: f64,

    /// Rotation is divided by this before adding to the shift (default: 3)
    #[serde(default = "default_rotation_divisor")]
    pub rotation_divisor: f64,

    /// Axis the twist is measured around (default: z)
    #[serde(default)]
    pub axis: Axis,
}

impl Default for OctaveConfig {
    fn default() -> Self {
        Self {
            fist_threshold: default_fist_threshold(),
            rotation_threshold: default_rotation_threshold(),
            rotation_divisor: default_rotation_divisor(),
            axis: Axis::default(),
        }
    }
}

fn default_fist_threshold() -> f64 { 0.95 }
fn default_rotation_threshold() -> f64 { 0.06 }
fn default_rotation_divisor() -> f64 { 3.0 }

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Time between tracker polls in ms (default: 25)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Scale notes are snapped to (default: b_major)
    #[serde(default)]
    pub scale: ScaleName,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            scale: ScaleName::default(),
        }
    }
}

fn default_poll_interval_ms() -> u64 { 25 }
