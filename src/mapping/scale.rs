//! Frequency tables for the playable scales
//!
//! Every scale is a flat ascending list of frequencies in Hz rather than a
//! set of intervals, so the quantizer can index straight into it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KeyboardError;

/// Ratio of one equal-tempered semitone
const SEMITONE: f64 = 1.059463;

/// B major: B, C#, D#, E, F#, G#, A#
const B_MAJOR: [f64; 19] = [
    123.47, 138.6, 155.56, 164.8, 185.0, 207.65, 233.1, 246.94, 277.18, 311.13, 329.63, 370.0,
    415.3, 466.16, 493.88, 554.37, 622.25, 659.26, 739.99,
];

const C_MAJOR_ROOT: [f64; 7] = [131.0, 147.0, 165.0, 175.0, 196.0, 220.0, 247.0];

const CHROMATIC: [f64; 28] = [
    175.0, 185.0, 196.0, 208.0, 220.0, 233.0, 247.0, 262.0, 277.0, 294.0, 311.0, 330.0, 349.0,
    370.0, 391.0, 415.0, 440.0, 466.0, 494.0, 523.0, 554.0, 587.0, 622.0, 659.0, 698.0, 740.0,
    784.0, 831.0,
];

const PENTATONIC_BASE: f64 = 175.0;
const PENTATONIC_BANDS: usize = 7;
const PENTATONIC_STEPS: usize = 5;

/// Names of the built-in scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScaleName {
    #[default]
    BMajor,
    CMajor,
    Pentatonic,
    Chromatic,
}

impl ScaleName {
    pub const ALL: [ScaleName; 4] = [
        ScaleName::BMajor,
        ScaleName::CMajor,
        ScaleName::Pentatonic,
        ScaleName::Chromatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleName::BMajor => "b_major",
            ScaleName::CMajor => "c_major",
            ScaleName::Pentatonic => "pentatonic",
            ScaleName::Chromatic => "chromatic",
        }
    }

    /// Build the frequency table for this name
    pub fn scale(&self) -> Scale {
        match self {
            ScaleName::BMajor => Scale::b_major(),
            ScaleName::CMajor => Scale::c_major(),
            ScaleName::Pentatonic => Scale::pentatonic(),
            ScaleName::Chromatic => Scale::chromatic(),
        }
    }
}

impl fmt::Display for ScaleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleName {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "b_major" | "bmajor" => Ok(ScaleName::BMajor),
            "c_major" | "cmajor" => Ok(ScaleName::CMajor),
            "pentatonic" | "penta" => Ok(ScaleName::Pentatonic),
            "chromatic" => Ok(ScaleName::Chromatic),
            _ => Err(KeyboardError::UnknownScale(s.to_string())),
        }
    }
}

/// An ordered, non-empty table of ascending frequencies
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    name: String,
    notes: Vec<f64>,
}

impl Scale {
    /// Create a scale from a frequency table.
    ///
    /// Returns `None` for an empty table or one that is not strictly ascending.
    pub fn new(name: &str, notes: Vec<f64>) -> Option<Self> {
        if notes.is_empty() || notes.windows(2).any(|w| w[0] >= w[1]) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            notes,
        })
    }

    pub fn b_major() -> Self {
        Self::from_table("b_major", B_MAJOR.to_vec())
    }

    /// C major over three octaves starting at C3
    pub fn c_major() -> Self {
        let notes = (0..3)
            .flat_map(|octave| C_MAJOR_ROOT.iter().map(move |f| f * f64::from(1u32 << octave)))
            .collect();
        Self::from_table("c_major", notes)
    }

    /// Evenly spaced steps inside octave bands starting at 175 Hz
    pub fn pentatonic() -> Self {
        let mut notes = Vec::with_capacity(PENTATONIC_BANDS * PENTATONIC_STEPS);
        let mut base = PENTATONIC_BASE;
        for _ in 0..PENTATONIC_BANDS {
            let step = base / PENTATONIC_STEPS as f64;
            for i in 0..PENTATONIC_STEPS {
                notes.push(base + step * i as f64);
            }
            base *= 2.0;
        }
        Self::from_table("pentatonic", notes)
    }

    pub fn chromatic() -> Self {
        Self::from_table("chromatic", CHROMATIC.to_vec())
    }

    fn from_table(name: &str, notes: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            notes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> &[f64] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn lowest(&self) -> f64 {
        self.notes[0]
    }

    pub fn highest(&self) -> f64 {
        self.notes[self.notes.len() - 1]
    }

    pub fn contains(&self, freq: f64) -> bool {
        self.notes.iter().any(|&n| n == freq)
    }
}

/// Frequency `halfsteps` equal-tempered semitones away from `base`
pub fn semitones_from(base: f64, halfsteps: i32) -> f64 {
    base * SEMITONE.powi(halfsteps)
}
