//! Hand-tracking frame model
//!
//! Coordinates follow the LeapMotion convention: millimetres from the
//! device, `y` pointing up, `z` pointing toward the user.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// A 3D position, direction or velocity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Self {
        let len = self.magnitude();
        if len < 1e-9 {
            Self::default()
        } else {
            *self * (1.0 / len)
        }
    }

    pub fn component(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A rotation axis in device space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handedness {
    Left,
    Right,
}

/// Finger slot on a hand, thumb first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FingerType {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerType {
    pub const ALL: [FingerType; 5] = [
        FingerType::Thumb,
        FingerType::Index,
        FingerType::Middle,
        FingerType::Ring,
        FingerType::Pinky,
    ];

    pub fn slot(&self) -> u8 {
        *self as u8
    }

    pub fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(slot as usize).copied()
    }

    pub fn is_thumb(&self) -> bool {
        *self == FingerType::Thumb
    }
}

/// Bone segments of a finger, from the wrist out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneKind {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bone {
    pub center: Vector,
    /// Unit vector from the base joint toward the tip joint
    pub direction: Vector,
}

impl Bone {
    pub fn new(center: Vector, direction: Vector) -> Self {
        Self { center, direction }
    }

    /// Build a bone from its two joint positions
    pub fn from_joints(prev: Vector, next: Vector) -> Self {
        Self {
            center: (prev + next) * 0.5,
            direction: (next - prev).normalized(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finger {
    pub kind: FingerType,
    /// Fingertip velocity in mm/s
    pub tip_velocity: Vector,
    /// Bones indexed by [`BoneKind`]
    pub bones: [Bone; 4],
}

impl Finger {
    pub fn bone(&self, kind: BoneKind) -> &Bone {
        &self.bones[kind as usize]
    }

    /// The intermediate bone, whose tilt tells how far the finger is curled
    pub fn knuckle(&self) -> &Bone {
        self.bone(BoneKind::Intermediate)
    }

    pub fn tip(&self) -> &Bone {
        self.bone(BoneKind::Distal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    /// Tracking id, stable for as long as the hand stays in view
    pub id: i32,
    pub handedness: Handedness,
    /// Tracking confidence, 0..1
    pub confidence: f64,
    /// How closed the hand is, 0 (open) to 1 (fist)
    pub grab_strength: f64,
    pub palm_position: Vector,
    /// Palm orientation as (pitch, yaw, roll) in radians
    pub orientation: Vector,
    pub fingers: Vec<Finger>,
}

impl Hand {
    pub fn is_left(&self) -> bool {
        self.handedness == Handedness::Left
    }

    /// Rotation about `axis` since the same hand was seen in `since`.
    ///
    /// Zero when the hand is not present in the earlier frame.
    pub fn rotation_angle(&self, since: &Frame, axis: Axis) -> f64 {
        match since.hand(self.id) {
            Some(earlier) => wrap_angle(
                self.orientation.component(axis) - earlier.orientation.component(axis),
            ),
            None => 0.0,
        }
    }
}

/// Fold an angle difference into (-PI, PI]
fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// One sample of everything the tracker sees
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub id: u64,
    pub hands: Vec<Hand>,
}

impl Frame {
    pub fn new(id: u64, hands: Vec<Hand>) -> Self {
        Self { id, hands }
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn hand(&self, id: i32) -> Option<&Hand> {
        self.hands.iter().find(|h| h.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with_roll(id: i32, roll: f64) -> Hand {
        Hand {
            id,
            handedness: Handedness::Right,
            confidence: 1.0,
            grab_strength: 0.0,
            palm_position: Vector::default(),
            orientation: Vector::new(0.0, 0.0, roll),
            fingers: vec![],
        }
    }

    #[test]
    fn test_bone_from_joints() {
        let bone = Bone::from_joints(Vector::new(0.0, 0.0, 0.0), Vector::new(0.0, 10.0, 0.0));
        assert_eq!(bone.center, Vector::new(0.0, 5.0, 0.0));
        assert_eq!(bone.direction, Vector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_finger_slots() {
        assert_eq!(FingerType::Thumb.slot(), 0);
        assert_eq!(FingerType::Pinky.slot(), 4);
        assert_eq!(FingerType::from_slot(2), Some(FingerType::Middle));
        assert_eq!(FingerType::from_slot(5), None);
    }

    #[test]
    fn test_rotation_angle() {
        let before = Frame::new(1, vec![hand_with_roll(7, 0.2)]);
        let now = hand_with_roll(7, 0.5);
        assert!((now.rotation_angle(&before, Axis::Z) - 0.3).abs() < 1e-12);
        assert_eq!(now.rotation_angle(&before, Axis::X), 0.0);
    }

    #[test]
    fn test_rotation_angle_missing_hand() {
        let before = Frame::new(1, vec![hand_with_roll(3, 0.2)]);
        let now = hand_with_roll(7, 0.5);
        assert_eq!(now.rotation_angle(&before, Axis::Z), 0.0);
    }

    #[test]
    fn test_rotation_angle_wraps() {
        let before = Frame::new(1, vec![hand_with_roll(7, PI - 0.05)]);
        let now = hand_with_roll(7, -PI + 0.05);
        assert!((now.rotation_angle(&before, Axis::Z) - 0.1).abs() < 1e-9);
    }
}
