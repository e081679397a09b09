//! LeapMotion hand tracker (feature = "leap")
//!
//! Requires the LeapC shared library installed on the system. LeapC does not
//! report fingertip velocity, so it is derived from consecutive tip
//! positions.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use leaprs::{Connection, ConnectionConfig, Event, HandType};
use tracing::{debug, info};

use super::{
    Bone, ConnectionChange, Finger, FingerType, Frame, Hand, HandTracker, Handedness, Vector,
};
use crate::error::{KeyboardError, Result};

/// Most LeapC messages drained by one poll
const MAX_DRAIN: usize = 64;
/// Frames kept for `frame(history)` lookups
const HISTORY: usize = 8;

/// Hand tracker backed by a real LeapMotion controller
pub struct LeapTracker {
    connection: Connection,
    history: VecDeque<Frame>,
    /// Last fingertip position per (hand id, slot), for velocity estimates
    last_tips: HashMap<(i32, u8), Vector>,
    last_frame_at: Option<Instant>,
}

impl LeapTracker {
    pub fn open() -> Result<Self> {
        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| KeyboardError::Sensor(format!("failed to create LeapC connection: {:?}", e)))?;
        connection
            .open()
            .map_err(|e| KeyboardError::Sensor(format!("failed to open LeapMotion device: {:?}", e)))?;
        info!("LeapC connection opened");

        Ok(Self {
            connection,
            history: VecDeque::with_capacity(HISTORY),
            last_tips: HashMap::new(),
            last_frame_at: None,
        })
    }
}

fn push_frame(history: &mut VecDeque<Frame>, frame: Frame) {
    if history.len() == HISTORY {
        history.pop_back();
    }
    history.push_front(frame);
}

fn convert_hand(
    hand: &leaprs::Hand,
    last_tips: &mut HashMap<(i32, u8), Vector>,
    dt: f64,
) -> Hand {
    let id = hand.id() as i32;
    let palm = hand.palm();
    let normal = to_vector(palm.normal());
    let direction = to_vector(palm.direction());

    let mut fingers = Vec::with_capacity(5);
    for (slot, digit) in hand.digits().enumerate() {
        let Some(kind) = FingerType::from_slot(slot as u8) else {
            continue;
        };
        let bones = [
            bone(&digit.metacarpal()),
            bone(&digit.proximal()),
            bone(&digit.intermediate()),
            bone(&digit.distal()),
        ];
        let tip = to_vector(digit.distal().next_joint());
        let tip_velocity = match last_tips.insert((id, kind.slot()), tip) {
            Some(prev) if dt > 0.0 => (tip - prev) * (1.0 / dt),
            _ => Vector::default(),
        };
        fingers.push(Finger {
            kind,
            tip_velocity,
            bones,
        });
    }

    Hand {
        id,
        handedness: match hand.hand_type() {
            HandType::Left => Handedness::Left,
            _ => Handedness::Right,
        },
        confidence: f64::from(hand.confidence()),
        grab_strength: f64::from(hand.grab_strength()),
        palm_position: to_vector(palm.position()),
        orientation: Vector::new(
            direction.y.atan2(-direction.z),
            direction.x.atan2(-direction.z),
            normal.x.atan2(-normal.y),
        ),
        fingers,
    }
}

impl HandTracker for LeapTracker {
    /// Drain every queued LeapC message and keep the newest tracking frame.
    ///
    /// An empty queue shows up as a poll error; that just ends the drain.
    fn poll(&mut self) -> Result<Option<ConnectionChange>> {
        let Self {
            connection,
            history,
            last_tips,
            last_frame_at,
        } = self;
        let mut change = None;
        let mut newest = None;

        for _ in 0..MAX_DRAIN {
            let Ok(msg) = connection.poll(0) else {
                break;
            };

            match msg.event() {
                Event::Connection(_) | Event::Device(_) => {
                    change = Some(ConnectionChange::Connected);
                }
                Event::ConnectionLost(_) => {
                    last_tips.clear();
                    newest = None;
                    change = Some(ConnectionChange::Disconnected);
                }
                Event::Tracking(tracking) => {
                    let now = Instant::now();
                    let dt = last_frame_at
                        .map(|t| now.duration_since(t).as_secs_f64())
                        .unwrap_or(0.0);
                    *last_frame_at = Some(now);

                    let hands: Vec<Hand> = tracking
                        .hands()
                        .map(|hand| convert_hand(&hand, last_tips, dt))
                        .collect();
                    last_tips.retain(|(id, _), _| hands.iter().any(|h| h.id == *id));
                    newest = Some(hands);
                }
                _ => debug!("ignoring LeapC event"),
            }
        }

        if let Some(hands) = newest {
            let id = history.front().map(|f| f.id + 1).unwrap_or(1);
            push_frame(history, Frame::new(id, hands));
        }
        Ok(change)
    }

    fn frame(&self, history: usize) -> Frame {
        self.history.get(history).cloned().unwrap_or_default()
    }
}

fn to_vector(v: leaprs::LeapVector) -> Vector {
    Vector::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
}

fn bone(b: &leaprs::Bone) -> Bone {
    Bone::from_joints(to_vector(b.prev_joint()), to_vector(b.next_joint()))
}
