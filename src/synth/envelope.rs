//! Linear ramps for note attack and release

/// A linear ramp from one level to another over a fixed number of samples
#[derive(Debug, Clone)]
pub struct Ramp {
    from: f64,
    to: f64,
    length: usize,
    position: usize,
}

impl Ramp {
    /// Ramp lasting `seconds` at `sample_rate`. At least one sample long.
    pub fn new(seconds: f64, from: f64, to: f64, sample_rate: f64) -> Self {
        let length = (seconds.max(0.0) * sample_rate).round() as usize;
        Self::with_length(length.max(1), from, to)
    }

    pub fn with_length(length: usize, from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            length: length.max(1),
            position: 0,
        }
    }

    /// Next level, or `None` once the ramp is spent.
    ///
    /// The start level is emitted first; the end level is never reached, the
    /// following segment picks up from there.
    pub fn process(&mut self) -> Option<f64> {
        if self.position >= self.length {
            return None;
        }
        let t = self.position as f64 / self.length as f64;
        self.position += 1;
        Some(self.from + (self.to - self.from) * t)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.length
    }

    pub fn len(&self) -> usize {
        self.length
    }

    /// Always false; ramps are at least one sample long
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn remaining(&self) -> usize {
        self.length - self.position
    }
}
