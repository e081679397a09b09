//! Swappable sustain segments
//!
//! Each sounding voice owns one slot in a [`SustainTable`]. The slot says
//! which segment the voice plays after its attack: hold at the sustain
//! level, or fade out. The control thread flips a slot from hold to release
//! and the render thread picks the change up on its next sample, so a note
//! can be ended after it has started playing without either side locking.
//!
//! Slot transitions and who makes them:
//!
//! | from      | to        | by       |
//! |-----------|-----------|----------|
//! | `Free`    | `Hold`    | control  |
//! | `Hold`    | `Release` | control  |
//! | `Release` | `Free`    | renderer |

use std::sync::atomic::{AtomicU8, Ordering};

/// Index of a slot in a [`SustainTable`]
pub type SlotId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Not owned by any voice
    Free = 0,
    /// Voice holds its sustain level
    Hold = 1,
    /// Voice is fading out and will free the slot when silent
    Release = 2,
}

impl SlotState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SlotState::Hold,
            2 => SlotState::Release,
            _ => SlotState::Free,
        }
    }
}

/// Fixed-size table of sustain slots shared between control and render
#[derive(Debug)]
pub struct SustainTable {
    slots: Box<[AtomicU8]>,
}

impl SustainTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity.max(1))
                .map(|_| AtomicU8::new(SlotState::Free as u8))
                .collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Take a free slot and set it holding. `None` when every slot is in use.
    pub fn claim(&self) -> Option<SlotId> {
        self.slots.iter().position(|slot| {
            slot.compare_exchange(
                SlotState::Free as u8,
                SlotState::Hold as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        })
    }

    /// Redirect a holding slot to its release segment.
    ///
    /// Returns false when the slot was not holding, so a release can never
    /// be scheduled twice.
    pub fn release(&self, slot: SlotId) -> bool {
        self.transition(slot, SlotState::Hold, SlotState::Release)
    }

    /// Hand a released slot back once its voice has gone silent
    pub fn retire(&self, slot: SlotId) -> bool {
        self.transition(slot, SlotState::Release, SlotState::Free)
    }

    pub fn state(&self, slot: SlotId) -> SlotState {
        self.slots
            .get(slot)
            .map(|s| SlotState::from_u8(s.load(Ordering::Acquire)))
            .unwrap_or(SlotState::Free)
    }

    /// Slots currently owned by a voice, holding or releasing
    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.load(Ordering::Acquire) != SlotState::Free as u8)
            .count()
    }

    fn transition(&self, slot: SlotId, from: SlotState, to: SlotState) -> bool {
        match self.slots.get(slot) {
            Some(s) => s
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_slot_lifecycle() {
        let table = SustainTable::new(2);
        let slot = table.claim().unwrap();
        assert_eq!(table.state(slot), SlotState::Hold);

        assert!(table.release(slot));
        assert_eq!(table.state(slot), SlotState::Release);

        assert!(table.retire(slot));
        assert_eq!(table.state(slot), SlotState::Free);
    }

    #[test]
    fn test_release_only_once() {
        let table = SustainTable::new(1);
        let slot = table.claim().unwrap();
        assert!(table.release(slot));
        assert!(!table.release(slot));
    }

    #[test]
    fn test_cannot_retire_holding_slot() {
        let table = SustainTable::new(1);
        let slot = table.claim().unwrap();
        assert!(!table.retire(slot));
        assert_eq!(table.state(slot), SlotState::Hold);
    }

    #[test]
    fn test_table_exhaustion() {
        let table = SustainTable::new(2);
        let a = table.claim().unwrap();
        let b = table.claim().unwrap();
        assert_ne!(a, b);
        assert_eq!(table.claim(), None);
        assert_eq!(table.in_use(), 2);

        table.release(a);
        // still owned until the renderer retires it
        assert_eq!(table.claim(), None);
        table.retire(a);
        assert_eq!(table.claim(), Some(a));
    }

    #[test]
    fn test_out_of_range_slot() {
        let table = SustainTable::new(1);
        assert!(!table.release(9));
        assert_eq!(table.state(9), SlotState::Free);
    }

    #[test]
    fn test_concurrent_claims_are_unique() {
        let table = Arc::new(SustainTable::new(64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || (0..8).filter_map(|_| table.claim()).collect::<Vec<_>>())
            })
            .collect();

        let mut claimed: Vec<SlotId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        claimed.sort_unstable();
        claimed.dedup();
        assert_eq!(claimed.len(), 64);
    }
}
