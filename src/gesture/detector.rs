//! Finger press/release detection

use std::collections::HashMap;

use tracing::debug;

use crate::config::GestureConfig;
use crate::mapping::{PitchKey, Quantizer, Scale};
use crate::sensor::{Finger, FingerType, Hand, Handedness};

/// Identity of one finger across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerKey {
    pub handedness: Handedness,
    pub finger: FingerType,
}

impl FingerKey {
    pub fn new(handedness: Handedness, finger: FingerType) -> Self {
        Self { handedness, finger }
    }
}

/// What a down finger is playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldNote {
    /// Quantized pitch before any octave shift
    pub pitch: f64,
    /// Key the voice was started under
    pub key: PitchKey,
}

/// A change in a finger's state during one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Pressed {
        finger: FingerKey,
        pitch: f64,
        key: PitchKey,
    },
    Released {
        finger: FingerKey,
        key: PitchKey,
    },
}

/// Receiver of the notes a detector decides to play
pub trait NoteSink {
    /// Start (or reinforce) a note at the quantized `pitch`.
    ///
    /// Returns the key to release it with later, or `None` if the note
    /// could not be started.
    fn press(&mut self, pitch: f64) -> Option<PitchKey>;

    /// Drop one reference to the note started under `key`
    fn release(&mut self, key: PitchKey);

    /// Silence everything
    fn release_all(&mut self);
}

/// Per-finger state machine turning hand geometry into note events.
///
/// A finger is pressed when it curls (or, for the thumb, tucks up to the
/// palm) while its tip moves down fast. It is released when it uncurls.
/// Fingers pressed in the same frame after the first are spread onto
/// adjacent notes relative to that first finger.
pub struct GestureDetector {
    config: GestureConfig,
    quantizer: Quantizer,
    down: HashMap<FingerKey, HeldNote>,
    /// First finger pressed this frame: (quantized pitch, finger slot)
    anchor: Option<(f64, u8)>,
}

impl GestureDetector {
    pub fn new(config: GestureConfig, scale: Scale) -> Self {
        Self {
            config,
            quantizer: Quantizer::new(scale),
            down: HashMap::new(),
            anchor: None,
        }
    }

    pub fn scale(&self) -> &Scale {
        self.quantizer.scale()
    }

    /// Forget the chord anchor; call once at the start of every frame
    pub fn begin_frame(&mut self) {
        self.anchor = None;
    }

    pub fn is_reliable(&self, hand: &Hand) -> bool {
        hand.confidence >= self.config.min_confidence
    }

    /// Run every finger of `hand` through the state machine.
    ///
    /// Unreliable hands are skipped.
    pub fn process_hand(&mut self, hand: &Hand, sink: &mut dyn NoteSink) -> Vec<Transition> {
        let mut transitions = Vec::new();
        if !self.is_reliable(hand) {
            debug!(hand = hand.id, confidence = hand.confidence, "skipping unreliable hand");
            return transitions;
        }

        for finger in &hand.fingers {
            let key = FingerKey::new(hand.handedness, finger.kind);
            let thumb_gap = (hand.palm_position.y - finger.tip().center.y).abs();

            if let Some(held) = self.down.get(&key).copied() {
                if self.is_lifted(finger, thumb_gap) {
                    self.down.remove(&key);
                    sink.release(held.key);
                    debug!(?key, pitch = held.pitch, "release");
                    transitions.push(Transition::Released {
                        finger: key,
                        key: held.key,
                    });
                }
                continue;
            }

            if !self.is_struck(finger, thumb_gap) {
                continue;
            }

            let pitch = self.pitch_for(hand, finger);
            match sink.press(pitch) {
                Some(voice_key) => {
                    if self.anchor.is_none() {
                        self.anchor = Some((pitch, finger.kind.slot()));
                    }
                    self.down.insert(key, HeldNote { pitch, key: voice_key });
                    debug!(?key, pitch, "press");
                    transitions.push(Transition::Pressed {
                        finger: key,
                        pitch,
                        key: voice_key,
                    });
                }
                None => debug!(?key, pitch, "press dropped"),
            }
        }

        transitions
    }

    /// Release every down finger at once
    pub fn release_all(&mut self, sink: &mut dyn NoteSink) -> usize {
        let count = self.down.len();
        self.down.clear();
        self.anchor = None;
        sink.release_all();
        count
    }

    pub fn held(&self, key: &FingerKey) -> Option<&HeldNote> {
        self.down.get(key)
    }

    pub fn down_count(&self) -> usize {
        self.down.len()
    }

    fn is_lifted(&self, finger: &Finger, thumb_gap: f64) -> bool {
        let uncurled = finger.knuckle().direction.y
            <= self.config.curl_threshold + self.config.curl_release_margin;
        (finger.kind.is_thumb() && thumb_gap > self.config.thumb_release_distance) || uncurled
    }

    fn is_struck(&self, finger: &Finger, thumb_gap: f64) -> bool {
        let curled = (finger.kind.is_thumb() && thumb_gap <= self.config.thumb_release_distance)
            || finger.knuckle().direction.y > self.config.curl_threshold;
        curled && finger.tip_velocity.y < self.config.press_velocity
    }

    fn pitch_for(&self, hand: &Hand, finger: &Finger) -> f64 {
        let mut raw = match self.anchor {
            Some((pitch, slot)) => {
                pitch + self.config.spread_step * (f64::from(finger.kind.slot()) - f64::from(slot))
            }
            None => finger.knuckle().center.x,
        };
        if hand.is_left() {
            raw -= self.config.left_hand_offset;
        }
        self.quantizer.quantize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{FingerPose, HandBuilder};

    /// Records what the detector asked for
    #[derive(Default)]
    struct Log {
        pressed: Vec<f64>,
        released: Vec<PitchKey>,
        flushed: usize,
        refuse: bool,
    }

    impl NoteSink for Log {
        fn press(&mut self, pitch: f64) -> Option<PitchKey> {
            if self.refuse {
                return None;
            }
            self.pressed.push(pitch);
            Some(PitchKey::from_hz(pitch))
        }

        fn release(&mut self, key: PitchKey) {
            self.released.push(key);
        }

        fn release_all(&mut self) {
            self.flushed += 1;
        }
    }

    fn detector() -> GestureDetector {
        GestureDetector::new(GestureConfig::default(), Scale::b_major())
    }

    fn frame(det: &mut GestureDetector, hands: &[Hand], sink: &mut Log) -> Vec<Transition> {
        det.begin_frame();
        hands
            .iter()
            .flat_map(|h| det.process_hand(h, sink))
            .collect()
    }

    #[test]
    fn test_index_press_maps_knuckle_x() {
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build();

        let t = frame(&mut det, &[hand], &mut sink);
        assert_eq!(t.len(), 1);
        assert_eq!(sink.pressed, vec![739.99]);
        assert_eq!(det.down_count(), 1);
    }

    #[test]
    fn test_second_finger_spreads_from_anchor() {
        let scale = Scale::b_major();
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .finger(FingerType::Middle, 0.0, FingerPose::Press)
            .build();

        frame(&mut det, &[hand], &mut sink);
        // 739.99 + 20 quantizes like a raw 759.99
        assert_eq!(sink.pressed, vec![739.99, crate::mapping::quantize(759.99, &scale)]);
    }

    #[test]
    fn test_spread_below_anchor_uses_slot_difference() {
        let scale = Scale::b_major();
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Ring, 95.0, FingerPose::Press)
            .finger(FingerType::Index, 0.0, FingerPose::Press)
            .build();

        frame(&mut det, &[hand], &mut sink);
        let anchor = scale.notes()[9];
        assert_eq!(sink.pressed[0], anchor);
        assert_eq!(sink.pressed[1], crate::mapping::quantize(anchor - 40.0, &scale));
    }

    #[test]
    fn test_anchor_resets_each_frame() {
        let scale = Scale::b_major();
        let mut det = detector();
        let mut sink = Log::default();

        let first = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build();
        frame(&mut det, &[first], &mut sink);

        let second = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Hold)
            .finger(FingerType::Middle, 45.0, FingerPose::Press)
            .build();
        frame(&mut det, &[second], &mut sink);

        assert_eq!(sink.pressed[1], scale.notes()[4]);
    }

    #[test]
    fn test_left_hand_offset() {
        let scale = Scale::b_major();
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::left(2)
            .finger(FingerType::Index, 150.0, FingerPose::Press)
            .build();

        frame(&mut det, &[hand], &mut sink);
        assert_eq!(sink.pressed, vec![scale.notes()[5]]);
    }

    #[test]
    fn test_negative_left_raw_uses_magnitude() {
        let scale = Scale::b_major();
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::left(2)
            .finger(FingerType::Thumb, -20.0, FingerPose::Press)
            .build();

        frame(&mut det, &[hand], &mut sink);
        assert_eq!(sink.pressed, vec![scale.notes()[12]]);
    }

    #[test]
    fn test_hold_does_not_retrigger() {
        let mut det = detector();
        let mut sink = Log::default();
        let press = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .build();
        frame(&mut det, &[press.clone()], &mut sink);
        // still moving down fast, but already down
        frame(&mut det, &[press], &mut sink);

        assert_eq!(sink.pressed.len(), 1);
        assert!(sink.released.is_empty());
    }

    #[test]
    fn test_slow_curl_is_not_a_press() {
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Hold)
            .build();

        assert!(frame(&mut det, &[hand], &mut sink).is_empty());
        assert_eq!(det.down_count(), 0);
    }

    #[test]
    fn test_release_uses_recorded_key() {
        let mut det = detector();
        let mut sink = Log::default();
        let press = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .build();
        frame(&mut det, &[press], &mut sink);
        let key = det
            .held(&FingerKey::new(Handedness::Right, FingerType::Index))
            .unwrap()
            .key;

        let lift = HandBuilder::right(1)
            .finger(FingerType::Index, 250.0, FingerPose::Rest)
            .build();
        let t = frame(&mut det, &[lift], &mut sink);

        assert_eq!(sink.released, vec![key]);
        assert!(matches!(t[0], Transition::Released { .. }));
        assert_eq!(det.down_count(), 0);
    }

    #[test]
    fn test_thumb_release_by_distance() {
        let mut det = detector();
        let mut sink = Log::default();
        let press = HandBuilder::right(1)
            .finger(FingerType::Thumb, 40.0, FingerPose::Press)
            .build();
        frame(&mut det, &[press], &mut sink);
        assert_eq!(det.down_count(), 1);

        let lift = HandBuilder::right(1)
            .finger(FingerType::Thumb, 40.0, FingerPose::Rest)
            .build();
        frame(&mut det, &[lift], &mut sink);
        assert_eq!(sink.released.len(), 1);
    }

    #[test]
    fn test_unreliable_hand_skipped() {
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .confidence(0.5)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .build();

        assert!(!det.is_reliable(&hand));
        assert!(frame(&mut det, &[hand], &mut sink).is_empty());
        assert!(sink.pressed.is_empty());
    }

    #[test]
    fn test_refused_press_leaves_finger_up() {
        let mut det = detector();
        let mut sink = Log {
            refuse: true,
            ..Default::default()
        };
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .build();

        assert!(frame(&mut det, &[hand], &mut sink).is_empty());
        assert_eq!(det.down_count(), 0);
    }

    #[test]
    fn test_release_all_clears_down_set() {
        let mut det = detector();
        let mut sink = Log::default();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .finger(FingerType::Ring, 100.0, FingerPose::Press)
            .build();
        frame(&mut det, &[hand], &mut sink);

        assert_eq!(det.release_all(&mut sink), 2);
        assert_eq!(det.down_count(), 0);
        assert_eq!(sink.flushed, 1);
    }
}
