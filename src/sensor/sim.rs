//! Scripted hand tracker for running without hardware
//!
//! [`HandBuilder`] and [`FingerPose`] describe hands in terms of what the
//! keyboard cares about (resting, pressing, holding) and fill in plausible
//! bone geometry. [`SimulatedTracker`] replays a list of frames, one per
//! poll.

use std::collections::VecDeque;

use super::{
    Bone, ConnectionChange, Finger, FingerType, Frame, Hand, HandTracker, Handedness, Vector,
};
use crate::error::Result;

/// Palm height used when none is given
const PALM_Y: f64 = 200.0;
/// Downward fingertip speed of a simulated keystroke (mm/s)
const STRIKE_SPEED: f64 = 500.0;

/// What a finger is doing in a simulated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerPose {
    /// Extended and still
    Rest,
    /// Curled down fast enough to strike a key
    Press,
    /// Curled and still, as after a press
    Hold,
}

/// Builder for simulated hands
#[derive(Debug, Clone)]
pub struct HandBuilder {
    hand: Hand,
}

impl HandBuilder {
    pub fn new(id: i32, handedness: Handedness) -> Self {
        Self {
            hand: Hand {
                id,
                handedness,
                confidence: 1.0,
                grab_strength: 0.0,
                palm_position: Vector::new(0.0, PALM_Y, 0.0),
                orientation: Vector::default(),
                fingers: Vec::new(),
            },
        }
    }

    pub fn right(id: i32) -> Self {
        Self::new(id, Handedness::Right)
    }

    pub fn left(id: i32) -> Self {
        Self::new(id, Handedness::Left)
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.hand.confidence = confidence;
        self
    }

    pub fn grab(mut self, strength: f64) -> Self {
        self.hand.grab_strength = strength;
        self
    }

    /// Palm roll (rotation about the z axis) in radians
    pub fn roll(mut self, radians: f64) -> Self {
        self.hand.orientation.z = radians;
        self
    }

    pub fn palm(mut self, position: Vector) -> Self {
        self.hand.palm_position = position;
        self
    }

    /// Add a finger whose middle knuckle sits at `knuckle_x`
    pub fn finger(mut self, kind: FingerType, knuckle_x: f64, pose: FingerPose) -> Self {
        let finger = pose_finger(kind, knuckle_x, pose, self.hand.palm_position.y);
        self.hand.fingers.retain(|f| f.kind != kind);
        self.hand.fingers.push(finger);
        self
    }

    /// Add all five fingers at rest, spread 20mm apart around `center_x`
    pub fn relaxed(mut self, center_x: f64) -> Self {
        for kind in FingerType::ALL {
            let x = center_x + (f64::from(kind.slot()) - 2.0) * 20.0;
            self = self.finger(kind, x, FingerPose::Rest);
        }
        self
    }

    pub fn build(self) -> Hand {
        self.hand
    }
}

fn pose_finger(kind: FingerType, knuckle_x: f64, pose: FingerPose, palm_y: f64) -> Finger {
    // Extended fingers point away from the user; curled ones tilt their
    // intermediate bone upward in device space.
    let knuckle_dir = match pose {
        FingerPose::Rest => Vector::new(0.0, 0.0, -1.0),
        FingerPose::Press | FingerPose::Hold => Vector::new(0.0, 0.6, -0.8),
    };
    // Thumbs press by tucking the tip up to palm height
    let tip_y = match (kind.is_thumb(), pose) {
        (true, FingerPose::Rest) => palm_y - 60.0,
        (true, _) => palm_y - 10.0,
        (false, FingerPose::Rest) => palm_y - 20.0,
        (false, _) => palm_y - 50.0,
    };
    let tip_velocity = match pose {
        FingerPose::Press => Vector::new(0.0, -STRIKE_SPEED, 0.0),
        _ => Vector::default(),
    };

    let base = Vector::new(knuckle_x, palm_y, -40.0);
    let knuckle_center = Vector::new(knuckle_x, palm_y - 10.0, -70.0);
    let tip_center = Vector::new(knuckle_x, tip_y, -90.0);

    Finger {
        kind,
        tip_velocity,
        bones: [
            Bone::from_joints(Vector::new(knuckle_x, palm_y, 0.0), base),
            Bone::new((base + knuckle_center) * 0.5, Vector::new(0.0, 0.0, -1.0)),
            Bone::new(knuckle_center, knuckle_dir),
            Bone::new(tip_center, knuckle_dir),
        ],
    }
}

/// Replays scripted frames, one per poll
pub struct SimulatedTracker {
    script: VecDeque<Frame>,
    /// Frames to restart from when the script runs out
    looped: Option<Vec<Frame>>,
    /// Newest first
    history: VecDeque<Frame>,
    next_id: u64,
    announced: bool,
}

/// Frames kept for `frame(history)` lookups
const HISTORY: usize = 8;

impl SimulatedTracker {
    /// Play `frames` once, then report empty frames
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            script: frames.into(),
            looped: None,
            history: VecDeque::with_capacity(HISTORY),
            next_id: 1,
            announced: false,
        }
    }

    /// Play `frames` over and over
    pub fn looping(frames: Vec<Frame>) -> Self {
        let mut tracker = Self::new(frames.clone());
        tracker.looped = Some(frames);
        tracker
    }

    /// Queue more frames behind the current script
    pub fn push(&mut self, frame: Frame) {
        self.script.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next_frame(&mut self) -> Frame {
        if self.script.is_empty() {
            if let Some(frames) = &self.looped {
                self.script.extend(frames.iter().cloned());
            }
        }
        let mut frame = self.script.pop_front().unwrap_or_default();
        frame.id = self.next_id;
        self.next_id += 1;
        frame
    }
}

impl HandTracker for SimulatedTracker {
    fn poll(&mut self) -> Result<Option<ConnectionChange>> {
        let frame = self.next_frame();
        if self.history.len() == HISTORY {
            self.history.pop_back();
        }
        self.history.push_front(frame);

        if self.announced {
            Ok(None)
        } else {
            self.announced = true;
            Ok(Some(ConnectionChange::Connected))
        }
    }

    fn frame(&self, history: usize) -> Frame {
        self.history.get(history).cloned().unwrap_or_default()
    }
}

/// A short scripted performance used by `play --simulate` and `record`.
///
/// Single notes, a three-finger chord, a left-hand thumb note, a fist twist
/// that raises the pitch, and finally both hands leaving.
pub fn demo_session() -> Vec<Frame> {
    const RIGHT: i32 = 1;
    const LEFT: i32 = 2;

    let right = || HandBuilder::right(RIGHT).relaxed(100.0);
    let left = || HandBuilder::left(LEFT).relaxed(-60.0);
    let frame = |hands: Vec<Hand>| Frame::new(0, hands);
    let mut frames = Vec::new();

    frames.extend((0..8).map(|_| frame(vec![])));
    frames.extend((0..4).map(|_| frame(vec![right().build()])));

    // single note
    frames.push(frame(vec![right()
        .finger(FingerType::Index, 150.0, FingerPose::Press)
        .build()]));
    frames.extend((0..20).map(|_| {
        frame(vec![right()
            .finger(FingerType::Index, 150.0, FingerPose::Hold)
            .build()])
    }));
    frames.extend((0..10).map(|_| frame(vec![right().build()])));

    // chord spread across adjacent fingers
    let chord = |pose| {
        right()
            .finger(FingerType::Index, 60.0, pose)
            .finger(FingerType::Middle, 80.0, pose)
            .finger(FingerType::Ring, 100.0, pose)
            .build()
    };
    frames.push(frame(vec![chord(FingerPose::Press)]));
    frames.extend((0..24).map(|_| frame(vec![chord(FingerPose::Hold)])));
    frames.extend((0..10).map(|_| frame(vec![right().build()])));

    // left thumb under a held right note, one poll later so it is not spread
    frames.push(frame(vec![
        right().finger(FingerType::Index, 120.0, FingerPose::Press).build(),
        left().build(),
    ]));
    frames.push(frame(vec![
        right().finger(FingerType::Index, 120.0, FingerPose::Hold).build(),
        left().finger(FingerType::Thumb, -20.0, FingerPose::Press).build(),
    ]));
    frames.extend((0..20).map(|_| {
        frame(vec![
            right().finger(FingerType::Index, 120.0, FingerPose::Hold).build(),
            left().finger(FingerType::Thumb, -20.0, FingerPose::Hold).build(),
        ])
    }));
    frames.extend((0..10).map(|_| frame(vec![right().build(), left().build()])));

    // twist a fist to shift every pitch up
    frames.extend((0..6).map(|i| frame(vec![right().grab(1.0).roll(0.1 * f64::from(i)).build()])));
    frames.extend((0..4).map(|_| frame(vec![right().roll(0.5).build()])));
    frames.push(frame(vec![right()
        .roll(0.5)
        .finger(FingerType::Index, 100.0, FingerPose::Press)
        .build()]));
    frames.extend((0..20).map(|_| {
        frame(vec![right()
            .roll(0.5)
            .finger(FingerType::Index, 100.0, FingerPose::Hold)
            .build()])
    }));

    // hands leave while the note is still held
    frames.extend((0..30).map(|_| frame(vec![])));
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_reports_connect_once() {
        let mut tracker = SimulatedTracker::new(vec![Frame::default(), Frame::default()]);
        assert_eq!(tracker.poll().unwrap(), Some(ConnectionChange::Connected));
        assert_eq!(tracker.poll().unwrap(), None);
    }

    #[test]
    fn test_tracker_history() {
        let mut tracker = SimulatedTracker::new(vec![
            Frame::new(0, vec![HandBuilder::right(1).build()]),
            Frame::new(0, vec![]),
        ]);
        tracker.poll().unwrap();
        tracker.poll().unwrap();

        assert!(tracker.frame(0).is_empty());
        assert_eq!(tracker.frame(1).hands.len(), 1);
        assert_eq!(tracker.frame(1).id, 1);
        assert_eq!(tracker.frame(0).id, 2);
        assert!(tracker.frame(5).is_empty());
    }

    #[test]
    fn test_tracker_runs_dry() {
        let mut tracker = SimulatedTracker::new(vec![Frame::new(0, vec![HandBuilder::left(2).build()])]);
        tracker.poll().unwrap();
        tracker.poll().unwrap();
        assert!(tracker.frame(0).is_empty());
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_tracker_looping() {
        let mut tracker = SimulatedTracker::looping(vec![Frame::new(0, vec![HandBuilder::left(2).build()])]);
        for _ in 0..3 {
            tracker.poll().unwrap();
            assert_eq!(tracker.frame(0).hands.len(), 1);
        }
    }

    #[test]
    fn test_pose_geometry() {
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 42.0, FingerPose::Press)
            .finger(FingerType::Thumb, 0.0, FingerPose::Rest)
            .build();

        let index = hand.fingers.iter().find(|f| f.kind == FingerType::Index).unwrap();
        assert_eq!(index.knuckle().center.x, 42.0);
        assert!(index.knuckle().direction.y > 0.5);
        assert!(index.tip_velocity.y < -300.0);

        let thumb = hand.fingers.iter().find(|f| f.kind == FingerType::Thumb).unwrap();
        assert!((hand.palm_position.y - thumb.tip().center.y).abs() > 30.0);
    }

    #[test]
    fn test_finger_replaces_same_slot() {
        let hand = HandBuilder::right(1)
            .relaxed(0.0)
            .finger(FingerType::Middle, 99.0, FingerPose::Hold)
            .build();
        assert_eq!(hand.fingers.len(), 5);
    }

    #[test]
    fn test_demo_session_ends_empty() {
        let frames = demo_session();
        assert!(frames.len() > 100);
        assert!(frames.last().unwrap().is_empty());
    }
}
