//! Snapping raw hand coordinates onto a scale

use super::Scale;

/// Raw units per scale step
pub const GRANULARITY: f64 = 10.0;

/// Snap a raw coordinate-derived value onto `scale`.
///
/// The value is divided by [`GRANULARITY`], made positive and truncated to an
/// index, which is then clamped into the table. Always returns a member of
/// `scale`.
pub fn quantize(raw: f64, scale: &Scale) -> f64 {
    scale.notes()[step_index(raw, scale.len())]
}

/// Table index that `raw` lands on in a table of `len` entries
pub fn step_index(raw: f64, len: usize) -> usize {
    let step = (raw / GRANULARITY).abs().trunc();
    // NaN fails both comparisons and lands on the first entry
    if step >= (len - 1) as f64 {
        len - 1
    } else if step > 0.0 {
        step as usize
    } else {
        0
    }
}

/// A scale bound to the quantizer
#[derive(Debug, Clone)]
pub struct Quantizer {
    scale: Scale,
}

impl Quantizer {
    pub fn new(scale: Scale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn quantize(&self, raw: f64) -> f64 {
        quantize(raw, &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_zero_is_lowest() {
        let scale = Scale::b_major();
        assert_eq!(quantize(0.0, &scale), 123.47);
    }

    #[test]
    fn test_quantize_clamps_high() {
        let scale = Scale::b_major();
        assert_eq!(quantize(1.0e9, &scale), 739.99);
        assert_eq!(quantize(300.0, &scale), 739.99);
    }

    #[test]
    fn test_quantize_negative_uses_magnitude() {
        let scale = Scale::chromatic();
        for raw in [5.0, 42.0, 119.9, 270.0] {
            assert_eq!(quantize(-raw, &scale), quantize(raw, &scale));
        }
    }

    #[test]
    fn test_quantize_truncates() {
        let scale = Scale::b_major();
        // 19.9 / 10 truncates to step 1
        assert_eq!(quantize(19.9, &scale), 138.6);
        assert_eq!(quantize(20.0, &scale), 155.56);
    }

    #[test]
    fn test_quantize_always_in_scale() {
        let scale = Scale::pentatonic();
        let mut raw = -2000.0;
        while raw < 2000.0 {
            let first = quantize(raw, &scale);
            assert!(scale.contains(first), "{} not in scale", first);
            assert_eq!(first, quantize(raw, &scale));
            raw += 7.3;
        }
    }

    #[test]
    fn test_quantize_non_finite() {
        let scale = Scale::b_major();
        assert_eq!(quantize(f64::NAN, &scale), 123.47);
        assert_eq!(quantize(f64::INFINITY, &scale), 739.99);
        assert_eq!(quantize(f64::NEG_INFINITY, &scale), 739.99);
    }

    #[test]
    fn test_quantizer_wraps_scale() {
        let quantizer = Quantizer::new(Scale::c_major());
        assert_eq!(quantizer.scale().name(), "c_major");
        assert_eq!(quantizer.quantize(15.0), 147.0);
    }
}
