//! Hand-tracking sensor layer
//!
//! A [`HandTracker`] produces frames; a [`SensorListener`] reacts to them.
//! [`run_poll_loop`] ties the two together at a fixed period. Trackers for
//! real hardware and for scripted simulation live in submodules.

mod frame;
#[cfg(feature = "leap")]
mod leap;
mod sim;

pub use frame::{Axis, Bone, BoneKind, Finger, FingerType, Frame, Hand, Handedness, Vector};
#[cfg(feature = "leap")]
pub use leap::LeapTracker;
pub use sim::{demo_session, FingerPose, HandBuilder, SimulatedTracker};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::Result;

/// Device connection change reported by a tracker poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    Connected,
    Disconnected,
}

/// Anything that can deliver hand-tracking frames
pub trait HandTracker {
    /// Service the device and advance to the newest frame.
    ///
    /// Returns a connection change when one happened since the last poll.
    fn poll(&mut self) -> Result<Option<ConnectionChange>>;

    /// The newest frame (`history == 0`) or one `history` polls back.
    ///
    /// Frames older than the tracker keeps are returned empty.
    fn frame(&self, history: usize) -> Frame;
}

/// Callbacks invoked by the poll loop
pub trait SensorListener {
    /// Called once before polling begins
    fn on_init(&mut self, tracker: &dyn HandTracker) -> Result<()>;

    fn on_connect(&mut self, _tracker: &dyn HandTracker) {}

    fn on_disconnect(&mut self, _tracker: &dyn HandTracker) {}

    /// Called once after the loop stops
    fn on_exit(&mut self, _tracker: &dyn HandTracker) {}

    /// Called once per poll cycle, whether or not the tracker has a new frame
    fn on_frame(&mut self, tracker: &dyn HandTracker);
}

/// Poll `tracker` every `period` and feed `listener` until `running` clears.
///
/// Poll errors are logged and polling continues; only `on_init` can fail
/// the loop.
pub fn run_poll_loop(
    tracker: &mut dyn HandTracker,
    listener: &mut dyn SensorListener,
    period: Duration,
    running: &AtomicBool,
) -> Result<()> {
    listener.on_init(tracker)?;

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        match tracker.poll() {
            Ok(Some(ConnectionChange::Connected)) => listener.on_connect(tracker),
            Ok(Some(ConnectionChange::Disconnected)) => listener.on_disconnect(tracker),
            Ok(None) => {}
            Err(e) => warn!("tracker poll failed: {}", e),
        }

        listener.on_frame(tracker);

        let elapsed = started.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }

    info!("poll loop stopped");
    listener.on_exit(tracker);
    Ok(())
}
