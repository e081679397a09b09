//! Karplus-Strong plucked string
//!
//! A delay line one period long is filled with noise and fed back through a
//! two-tap average. The loop gain is chosen so the string decays by 1/e
//! every `tau` seconds.

/// Lowest frequency the string will tune to
const MIN_FREQUENCY: f64 = 20.0;

/// A single plucked string
#[derive(Debug, Clone)]
pub struct PluckedString {
    line: Vec<f64>,
    position: usize,
    /// Feedback gain applied once per trip around the delay line
    gain: f64,
    frequency: f64,
}

impl PluckedString {
    /// Pluck a string at `frequency` Hz that decays with time constant `tau`
    /// seconds.
    pub fn new(frequency: f64, tau: f64, sample_rate: f64) -> Self {
        let frequency = frequency.max(MIN_FREQUENCY);
        let period = (sample_rate / frequency).round().max(2.0) as usize;
        let tau_samples = (tau * sample_rate).max(1.0);
        let gain = (-(period as f64) / tau_samples).exp();

        // Seed the noise from the pitch so equal notes sound alike
        let mut rng = (frequency.to_bits() | 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let line = (0..period)
            .map(|_| {
                rng ^= rng << 13;
                rng ^= rng >> 7;
                rng ^= rng << 17;
                (rng as f64 / u64::MAX as f64) * 2.0 - 1.0
            })
            .collect();

        Self {
            line,
            position: 0,
            gain,
            frequency,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Delay line length in samples
    pub fn period(&self) -> usize {
        self.line.len()
    }

    pub fn process(&mut self) -> f64 {
        let len = self.line.len();
        let current = self.line[self.position];
        let next = self.line[(self.position + 1) % len];
        self.line[self.position] = 0.5 * (current + next) * self.gain;
        self.position = (self.position + 1) % len;
        current
    }
}
