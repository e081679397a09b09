//! Voices rendered by the mixing graph

use std::sync::Arc;

use super::{PluckedString, Ramp, SlotId, SlotState, SustainTable};

/// Trait for anything the mixing graph can render
pub trait Voice: Send {
    /// Generate the next sample
    fn process(&mut self) -> f64;

    /// False once the voice has gone silent for good
    fn is_active(&self) -> bool;
}

/// Envelope timing and level for a sounding note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceShape {
    /// Fade-in time in seconds
    pub attack: f64,
    /// Fade-out time in seconds
    pub release: f64,
    /// Sustain amplitude
    pub level: f64,
    /// String decay time constant in seconds
    pub tau: f64,
    pub sample_rate: f64,
}

enum Stage {
    Attack(Ramp),
    Sustain,
    Release(Ramp),
    Done,
}

/// A plucked string under an attack / sustain / release envelope.
///
/// The sustain segment is read through a [`SustainTable`] slot, so the
/// control thread can end the note while it plays. A release requested
/// during the attack takes effect once the attack completes.
pub struct SoundingVoice {
    tone: PluckedString,
    shape: VoiceShape,
    stage: Stage,
    slot: SlotId,
    table: Arc<SustainTable>,
}

impl SoundingVoice {
    /// Start a note at `frequency` on an already-claimed `slot`
    pub fn new(frequency: f64, shape: VoiceShape, slot: SlotId, table: Arc<SustainTable>) -> Self {
        Self {
            tone: PluckedString::new(frequency, shape.tau, shape.sample_rate),
            stage: Stage::Attack(Ramp::new(shape.attack, 0.0, shape.level, shape.sample_rate)),
            shape,
            slot,
            table,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn frequency(&self) -> f64 {
        self.tone.frequency()
    }

    fn envelope(&mut self) -> f64 {
        loop {
            match &mut self.stage {
                Stage::Attack(ramp) => match ramp.process() {
                    Some(level) => return level,
                    None => self.stage = Stage::Sustain,
                },
                Stage::Sustain => {
                    if self.table.state(self.slot) != SlotState::Release {
                        return self.shape.level;
                    }
                    self.stage = Stage::Release(Ramp::new(
                        self.shape.release,
                        self.shape.level,
                        0.0,
                        self.shape.sample_rate,
                    ));
                }
                Stage::Release(ramp) => match ramp.process() {
                    Some(level) => return level,
                    None => {
                        self.table.retire(self.slot);
                        self.stage = Stage::Done;
                    }
                },
                Stage::Done => return 0.0,
            }
        }
    }
}

impl Voice for SoundingVoice {
    fn process(&mut self) -> f64 {
        let env = self.envelope();
        if env == 0.0 {
            // keep the string ringing in step even while silent
            self.tone.process();
            return 0.0;
        }
        env * self.tone.process()
    }

    fn is_active(&self) -> bool {
        !matches!(self.stage, Stage::Done)
    }
}
