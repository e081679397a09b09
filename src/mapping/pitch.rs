//! Integer pitch identity

use std::fmt;

/// A frequency rounded to the nearest millihertz.
///
/// Used as the lookup key for sounding voices, so two computations of the
/// same pitch that differ only in float noise share one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchKey(i64);

impl PitchKey {
    /// Key for `hz`. The sign is kept; non-finite values map to zero.
    pub fn from_hz(hz: f64) -> Self {
        let milli = (hz * 1000.0).round();
        if milli.is_finite() {
            PitchKey(milli as i64)
        } else {
            PitchKey(0)
        }
    }

    pub fn millihertz(&self) -> i64 {
        self.0
    }

    pub fn hz(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for PitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let milli = self.0.unsigned_abs();
        write!(f, "{}{}.{:03} Hz", sign, milli / 1000, milli % 1000)
    }
}
