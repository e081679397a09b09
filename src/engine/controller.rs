//! One poll cycle: frame in, voice commands out

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{AudioOutput, GraphRenderer, MixingGraph, ShiftedVoices, VoiceRegistry};
use crate::config::KeyboardConfig;
use crate::error::{KeyboardError, Result};
use crate::gesture::{GestureDetector, OctaveShiftTracker, Transition};
use crate::mapping::Scale;
use crate::sensor::{Frame, HandTracker, SensorListener};

/// What one frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub transitions: Vec<Transition>,
    /// Voices silenced because no hands were in view
    pub flushed: usize,
    /// Hands ignored for low tracking confidence
    pub skipped_hands: usize,
    /// Key shift after the frame
    pub shift: f64,
}

/// Drives the keyboard from sensor frames.
///
/// Owns the gesture state, the voice registry and the graph the voices
/// play in. An optional [`AudioOutput`] is started on init and stopped
/// on exit.
pub struct KeyboardController {
    detector: GestureDetector,
    octave: OctaveShiftTracker,
    registry: VoiceRegistry,
    graph: Arc<MixingGraph>,
    output: Option<Box<dyn AudioOutput>>,
    frames: u64,
    /// Longest a released voice can keep sounding
    tail: Duration,
    /// Id of the last tracker frame handed to `process_frame`
    last_frame_id: Option<u64>,
}

impl KeyboardController {
    pub fn new(config: &KeyboardConfig) -> Self {
        let graph = Arc::new(MixingGraph::with_capacity(
            config.audio.master_volume,
            config.voice.max_voices,
        ));
        let registry = VoiceRegistry::new(
            Arc::clone(&graph),
            config.voice_shape(),
            config.voice.max_voices,
        );

        Self {
            detector: GestureDetector::new(config.gesture.clone(), config.controller.scale.scale()),
            octave: OctaveShiftTracker::new(config.octave.clone()),
            registry,
            graph,
            output: None,
            frames: 0,
            tail: Duration::try_from_secs_f64(
                (config.voice.attack_ms + config.voice.release_ms) / 1000.0,
            )
            .unwrap_or_default(),
            last_frame_id: None,
        }
    }

    /// Play through `output` once the poll loop starts
    pub fn with_output(mut self, output: Box<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// The renderer for offline use; `None` once taken
    pub fn take_renderer(&self) -> Option<GraphRenderer> {
        MixingGraph::take_renderer(&self.graph)
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &Arc<MixingGraph> {
        &self.graph
    }

    pub fn scale(&self) -> &Scale {
        self.detector.scale()
    }

    pub fn shift(&self) -> f64 {
        self.octave.shift()
    }

    /// Fingers currently holding a note
    pub fn down_count(&self) -> usize {
        self.detector.down_count()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Run one frame through the detectors.
    ///
    /// `previous` is the frame before, used to measure hand rotation.
    pub fn process_frame(&mut self, frame: &Frame, previous: &Frame) -> FrameReport {
        self.frames += 1;
        self.detector.begin_frame();
        let mut report = FrameReport::default();

        if frame.is_empty() {
            let sounding = self.registry.active_voices();
            let mut sink = ShiftedVoices::new(&self.registry, self.octave.shift());
            self.detector.release_all(&mut sink);
            if sounding > 0 {
                debug!(voices = sounding, "hands gone, releasing everything");
            }
            report.flushed = sounding;
            report.shift = self.octave.shift();
            return report;
        }

        for hand in &frame.hands {
            if !self.detector.is_reliable(hand) {
                debug!(hand = hand.id, confidence = hand.confidence, "skipping unreliable hand");
                report.skipped_hands += 1;
                continue;
            }

            self.octave.observe(hand, previous);

            let mut sink = ShiftedVoices::new(&self.registry, self.octave.shift());
            report
                .transitions
                .extend(self.detector.process_hand(hand, &mut sink));
        }

        report.shift = self.octave.shift();
        report
    }

    fn shutdown(&mut self) {
        let flushed = self.registry.flush_all();
        let mut sink = ShiftedVoices::new(&self.registry, self.octave.shift());
        self.detector.release_all(&mut sink);
        if let Some(output) = self.output.as_mut() {
            // let the release fades play out before the stream goes away
            if self.registry.slots_in_use() > 0 {
                thread::sleep(self.tail);
            }
            output.stop();
        }
        info!(frames = self.frames, flushed, "keyboard stopped");
    }
}

impl SensorListener for KeyboardController {
    fn on_init(&mut self, _tracker: &dyn HandTracker) -> Result<()> {
        if let Some(output) = self.output.as_mut() {
            let renderer = MixingGraph::take_renderer(&self.graph)
                .ok_or_else(|| KeyboardError::AudioStream("renderer already in use".into()))?;
            output.start(renderer)?;
        }
        info!(scale = %self.detector.scale().name(), "keyboard ready");
        Ok(())
    }

    fn on_connect(&mut self, _tracker: &dyn HandTracker) {
        info!("hand tracker connected");
    }

    fn on_disconnect(&mut self, _tracker: &dyn HandTracker) {
        warn!("hand tracker disconnected");
    }

    fn on_exit(&mut self, _tracker: &dyn HandTracker) {
        self.shutdown();
    }

    fn on_frame(&mut self, tracker: &dyn HandTracker) {
        let frame = tracker.frame(0);
        // A tracker with nothing new still reports its last frame
        if self.last_frame_id == Some(frame.id) {
            return;
        }
        self.last_frame_id = Some(frame.id);
        let previous = tracker.frame(1);
        self.process_frame(&frame, &previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{
        run_poll_loop, ConnectionChange, FingerPose, FingerType, HandBuilder, SimulatedTracker,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    fn controller() -> KeyboardController {
        KeyboardController::new(&KeyboardConfig::default())
    }

    fn frame(hands: Vec<crate::sensor::Hand>) -> Frame {
        Frame::new(0, hands)
    }

    #[test]
    fn test_press_starts_voice() {
        let mut c = controller();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build();

        let report = c.process_frame(&frame(vec![hand]), &Frame::default());
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(c.registry().refcount(crate::mapping::PitchKey::from_hz(739.99)), 1);
        assert_eq!(c.graph().pending_len(), 1);
    }

    #[test]
    fn test_empty_frame_flushes() {
        let mut c = controller();
        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .finger(FingerType::Ring, 200.0, FingerPose::Press)
            .build();
        c.process_frame(&frame(vec![hand]), &Frame::default());
        assert_eq!(c.down_count(), 2);

        let report = c.process_frame(&Frame::default(), &Frame::default());
        assert_eq!(report.flushed, 2);
        assert_eq!(c.down_count(), 0);
        assert!(c.registry().is_empty());
    }

    #[test]
    fn test_unreliable_hand_counted() {
        let mut c = controller();
        let hand = HandBuilder::right(1)
            .confidence(0.2)
            .grab(1.0)
            .roll(1.0)
            .finger(FingerType::Index, 100.0, FingerPose::Press)
            .build();
        let before = frame(vec![HandBuilder::right(1).confidence(0.2).grab(1.0).build()]);

        let report = c.process_frame(&frame(vec![hand]), &before);
        assert_eq!(report.skipped_hands, 1);
        assert!(report.transitions.is_empty());
        assert_eq!(report.shift, 1.0);
    }

    #[test]
    fn test_shift_applies_to_new_notes() {
        let mut c = controller();
        let before = frame(vec![HandBuilder::right(1).grab(1.0).build()]);
        let twist = HandBuilder::right(1).grab(1.0).roll(0.3).build();
        let report = c.process_frame(&frame(vec![twist]), &before);
        assert!((report.shift - 1.1).abs() < 1e-9);

        let press = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build();
        c.process_frame(&frame(vec![press]), &Frame::default());
        assert_eq!(
            c.registry().keys(),
            vec![crate::mapping::PitchKey::from_hz(739.99 * (1.0 + 0.3 / 3.0))]
        );
    }

    /// Delivers its script, then times out on every poll
    struct StallingTracker {
        inner: SimulatedTracker,
        polls: usize,
        stop_after: usize,
        running: &'static AtomicBool,
    }

    impl HandTracker for StallingTracker {
        fn poll(&mut self) -> Result<Option<ConnectionChange>> {
            self.polls += 1;
            if self.polls >= self.stop_after {
                self.running.store(false, Ordering::SeqCst);
            }
            if self.inner.remaining() > 0 {
                self.inner.poll()
            } else {
                Err(KeyboardError::Sensor("timeout".into()))
            }
        }

        fn frame(&self, history: usize) -> Frame {
            self.inner.frame(history)
        }
    }

    #[test]
    fn test_stalled_tracker_counts_twist_once() {
        static RUNNING: AtomicBool = AtomicBool::new(true);
        let mut tracker = StallingTracker {
            inner: SimulatedTracker::new(vec![
                frame(vec![HandBuilder::right(1).grab(1.0).build()]),
                frame(vec![HandBuilder::right(1).grab(1.0).roll(0.3).build()]),
            ]),
            polls: 0,
            stop_after: 5,
            running: &RUNNING,
        };
        let mut c = controller();

        run_poll_loop(&mut tracker, &mut c, Duration::from_millis(1), &RUNNING).unwrap();

        assert_eq!(c.frames_processed(), 2);
        assert!((c.shift() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_frame_is_skipped() {
        let mut c = controller();
        let mut tracker = SimulatedTracker::new(vec![frame(vec![HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build()])]);
        tracker.poll().unwrap();

        c.on_frame(&tracker);
        c.on_frame(&tracker);
        assert_eq!(c.frames_processed(), 1);
        assert_eq!(c.registry().refcount(crate::mapping::PitchKey::from_hz(739.99)), 1);
    }

    struct CountingOutput {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl AudioOutput for CountingOutput {
        fn start(&mut self, _renderer: GraphRenderer) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_output_lifecycle() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let mut c = controller().with_output(Box::new(CountingOutput {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
        }));
        let tracker = SimulatedTracker::new(vec![]);

        c.on_init(&tracker).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        // the output owns the renderer now
        assert!(c.take_renderer().is_none());

        c.on_exit(&tracker);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exit_waits_for_release_tails() {
        let mut config = KeyboardConfig::default();
        config.voice.attack_ms = 10.0;
        config.voice.release_ms = 30.0;
        let stops = Arc::new(AtomicUsize::new(0));
        let mut c = KeyboardController::new(&config).with_output(Box::new(CountingOutput {
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::clone(&stops),
        }));
        let tracker = SimulatedTracker::new(vec![]);
        c.on_init(&tracker).unwrap();

        let hand = HandBuilder::right(1)
            .finger(FingerType::Index, 300.0, FingerPose::Press)
            .build();
        c.process_frame(&frame(vec![hand]), &Frame::default());

        let started = Instant::now();
        c.on_exit(&tracker);
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(c.registry().is_empty());
    }

    #[test]
    fn test_graph_sized_for_voice_limit() {
        let mut config = KeyboardConfig::default();
        config.voice.max_voices = 512;
        let c = KeyboardController::new(&config);
        assert_eq!(c.graph().capacity(), 512);
    }
}
