//! The live set of sounding voices
//!
//! The control thread hands new voices to a [`MixingGraph`]; a single
//! [`GraphRenderer`] on the audio thread owns the voices that are actually
//! playing. Hand-off goes through a small pending list that the renderer
//! only ever `try_lock`s, so a busy control thread delays a new note by a
//! block at most and never stalls the callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::synth::Voice;

/// Live voices reserved for when no voice limit is given
const DEFAULT_CAPACITY: usize = 64;

/// Shared entry point for adding voices to the mix
pub struct MixingGraph {
    pending: Mutex<Vec<Box<dyn Voice>>>,
    renderer_taken: AtomicBool,
    inserted: AtomicU64,
    master_volume: f64,
    capacity: usize,
}

impl MixingGraph {
    pub fn new(master_volume: f64) -> Self {
        Self::with_capacity(master_volume, DEFAULT_CAPACITY)
    }

    /// A graph whose renderer never reallocates while at most `voices`
    /// are sounding
    pub fn with_capacity(master_volume: f64, voices: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::with_capacity(voices)),
            renderer_taken: AtomicBool::new(false),
            inserted: AtomicU64::new(0),
            master_volume,
            capacity: voices,
        }
    }

    /// Queue a voice; it starts sounding at the renderer's next block
    pub fn insert(&self, voice: Box<dyn Voice>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(voice);
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Voices queued but not yet picked up by the renderer
    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total voices ever inserted
    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Voices the renderer holds room for
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hand out the renderer. There is only ever one; later calls get `None`.
    pub fn take_renderer(graph: &Arc<Self>) -> Option<GraphRenderer> {
        if graph.renderer_taken.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(GraphRenderer {
            graph: Arc::clone(graph),
            live: Vec::with_capacity(graph.capacity),
        })
    }
}

/// Audio-thread side of the graph
pub struct GraphRenderer {
    graph: Arc<MixingGraph>,
    live: Vec<Box<dyn Voice>>,
}

impl GraphRenderer {
    /// Move queued voices into the live set without blocking.
    ///
    /// Returns how many were adopted; zero if the queue was busy.
    pub fn adopt_pending(&mut self) -> usize {
        let mut pending = match self.graph.pending.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return 0,
        };
        let adopted = pending.len();
        self.live.append(&mut pending);
        adopted
    }

    /// Mix one sample of every live voice
    pub fn next_sample(&mut self) -> f64 {
        let mix: f64 = self.live.iter_mut().map(|v| v.process()).sum();
        mix * self.graph.master_volume
    }

    /// Drop voices whose release has finished
    pub fn retire_finished(&mut self) -> usize {
        let before = self.live.len();
        self.live.retain(|v| v.is_active());
        before - self.live.len()
    }

    /// Render one block of mono samples
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        self.adopt_pending();
        for sample in buffer.iter_mut() {
            *sample = self.next_sample() as f32;
        }
        self.retire_finished();
    }

    pub fn live_voices(&self) -> usize {
        self.live.len()
    }

    pub fn graph(&self) -> &Arc<MixingGraph> {
        &self.graph
    }
}
