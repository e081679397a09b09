//! Reference-counted table of sounding notes

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::MixingGraph;
use crate::error::{KeyboardError, Result};
use crate::gesture::NoteSink;
use crate::mapping::PitchKey;
use crate::synth::{SlotId, SoundingVoice, SustainTable, VoiceShape};

#[derive(Debug, Clone, Copy)]
struct VoiceEntry {
    refcount: usize,
    slot: SlotId,
}

/// One voice per distinct pitch, shared by every finger holding it.
///
/// The first press of a pitch starts a voice; further presses only bump
/// its count. The voice is released when the last holder lets go. All
/// changes happen under one lock so a press and a release racing on the
/// same pitch can't start a duplicate or lose a release.
pub struct VoiceRegistry {
    entries: Mutex<HashMap<PitchKey, VoiceEntry>>,
    table: Arc<SustainTable>,
    graph: Arc<MixingGraph>,
    shape: VoiceShape,
}

impl VoiceRegistry {
    pub fn new(graph: Arc<MixingGraph>, shape: VoiceShape, max_voices: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            table: Arc::new(SustainTable::new(max_voices)),
            graph,
            shape,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PitchKey, VoiceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sound `pitch` scaled by `shift`, or add a holder if it already sounds.
    ///
    /// Fails only when every sustain slot is taken, including slots of
    /// notes still fading out.
    pub fn start_voice(&self, pitch: f64, shift: f64) -> Result<PitchKey> {
        let hz = pitch * shift;
        let key = PitchKey::from_hz(hz);
        let mut entries = self.entries();

        if let Some(entry) = entries.get_mut(&key) {
            entry.refcount += 1;
            debug!(%key, refcount = entry.refcount, "voice reinforced");
            return Ok(key);
        }

        let slot = match self.table.claim() {
            Some(slot) => slot,
            None => {
                let capacity = self.table.capacity();
                warn!(%key, capacity, "no free voice, dropping note");
                return Err(KeyboardError::VoiceTableFull { capacity });
            }
        };
        let voice = SoundingVoice::new(hz, self.shape, slot, Arc::clone(&self.table));
        self.graph.insert(Box::new(voice));
        entries.insert(key, VoiceEntry { refcount: 1, slot });
        debug!(%key, slot, "voice started");
        Ok(key)
    }

    /// Drop one holder of `key`.
    ///
    /// Returns true when this was the last holder and the voice began its
    /// release. Unknown keys are ignored.
    pub fn stop_voice(&self, key: PitchKey) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&key) else {
            return false;
        };

        if entry.refcount > 1 {
            entry.refcount -= 1;
            debug!(%key, refcount = entry.refcount, "voice still held");
            return false;
        }

        let slot = entry.slot;
        entries.remove(&key);
        self.table.release(slot);
        debug!(%key, slot, "voice released");
        true
    }

    /// Release every voice regardless of holders. Returns how many.
    pub fn flush_all(&self) -> usize {
        let mut entries = self.entries();
        let count = entries.len();
        for (_, entry) in entries.drain() {
            self.table.release(entry.slot);
        }
        if count > 0 {
            debug!(count, "all voices released");
        }
        count
    }

    pub fn refcount(&self, key: PitchKey) -> usize {
        self.entries().get(&key).map_or(0, |e| e.refcount)
    }

    /// Voices with at least one holder
    pub fn active_voices(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn keys(&self) -> Vec<PitchKey> {
        let mut keys: Vec<_> = self.entries().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Sustain slots in use, counting voices that are still fading out
    pub fn slots_in_use(&self) -> usize {
        self.table.in_use()
    }
}

/// Feeds detector presses into a registry at a fixed key shift
pub struct ShiftedVoices<'a> {
    registry: &'a VoiceRegistry,
    shift: f64,
}

impl<'a> ShiftedVoices<'a> {
    pub fn new(registry: &'a VoiceRegistry, shift: f64) -> Self {
        Self { registry, shift }
    }
}

impl NoteSink for ShiftedVoices<'_> {
    fn press(&mut self, pitch: f64) -> Option<PitchKey> {
        self.registry.start_voice(pitch, self.shift).ok()
    }

    fn release(&mut self, key: PitchKey) {
        self.registry.stop_voice(key);
    }

    fn release_all(&mut self) {
        self.registry.flush_all();
    }
}
