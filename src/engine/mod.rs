//! Audio-side engine and control-side trigger scheduler.
//!
//! The [`Engine`] owns the audio clock and every live voice. It is driven one
//! block at a time from the audio callback. The [`scheduler::Scheduler`]
//! runs on the control side, decides when voices start and stop, and talks to
//! the engine only through [`EngineMessage`]s.

pub mod bus;
pub mod clock;
pub mod scheduler;

use tracing::{debug, warn};

use self::{
    bus::{EffectInsert, MixBus},
    clock::AudioClock,
};
use crate::{
    error::Result,
    synth::{
        message::{EngineMessage, MessageReceiver, MessageSender},
        voice::{Voice, VoiceId},
    },
    MAX_BLOCK_SIZE,
};

/// Initial room for live and retired voices.
const VOICE_CAPACITY: usize = 64;

pub struct Engine {
    clock: AudioClock,
    voices: Vec<Box<Voice>>,
    bus: MixBus,
    /// Finished voices waiting to be handed back and freed off this thread.
    retired: Vec<Box<Voice>>,
}

impl Engine {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_bus(sample_rate, MixBus::default())
    }

    /// Engine whose mix bus ends in `insert`.
    pub fn with_insert(sample_rate: f32, insert: Box<dyn EffectInsert>) -> Self {
        Self::with_bus(sample_rate, MixBus::new(insert))
    }

    fn with_bus(sample_rate: f32, bus: MixBus) -> Self {
        Self {
            clock: AudioClock::new(sample_rate),
            voices: Vec::with_capacity(VOICE_CAPACITY),
            bus,
            retired: Vec::with_capacity(VOICE_CAPACITY),
        }
    }

    /// Current audio-clock instant in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate()
    }

    /// Apply one control message at the current audio-clock instant.
    ///
    /// Voice errors are timing edge cases (a late release racing a finished
    /// voice, a duplicate release) and are logged, never propagated.
    pub fn handle_message(&mut self, message: EngineMessage) {
        let now = self.clock.now();
        match message {
            EngineMessage::Spawn(mut voice) => {
                let id = voice.id();
                match voice.trigger(now) {
                    Ok(()) => self.voices.push(voice),
                    Err(err) => {
                        warn!(voice = %id, %err, "retiring voice that failed to trigger");
                        self.retired.push(voice);
                    }
                }
            }
            EngineMessage::Release(id) => match self.voices.iter_mut().find(|v| v.id() == id) {
                Some(voice) => {
                    if let Err(err) = voice.release(now) {
                        warn!(voice = %id, %err, "release ignored");
                    }
                }
                None => warn!(voice = %id, "release for a voice that is no longer live"),
            },
            EngineMessage::FeedbackGain(gain) => self.bus.set_feedback_gain(gain),
        }
    }

    /// Drain pending control messages, then render one block into `out`.
    pub fn process_block(&mut self, rx: &mut impl MessageReceiver, out: &mut [f32]) {
        while let Some(message) = rx.pop() {
            self.handle_message(message);
        }
        self.render(out);
    }

    /// Render `out` (any length) from the live voices and advance the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        for block in out.chunks_mut(MAX_BLOCK_SIZE) {
            let ctx = self.clock.ctx();
            self.bus.render(&mut self.voices, block, &ctx);
            self.clock.advance(block.len());
            self.retire_finished();
        }
    }

    fn retire_finished(&mut self) {
        let mut index = 0;
        while index < self.voices.len() {
            if self.voices[index].is_finished() {
                let voice = self.voices.swap_remove(index);
                debug!(voice = %voice.id(), "voice retired");
                self.retired.push(voice);
            } else {
                index += 1;
            }
        }
    }

    /// Ids of voices that finished since the last call. The voices are
    /// dropped by the iterator, so call this from the thread that should free
    /// them.
    pub fn drain_finished(&mut self) -> impl Iterator<Item = VoiceId> + '_ {
        self.retired.drain(..).map(|voice| voice.id())
    }

    /// Pass retired voices to `send` so they are freed elsewhere. A voice
    /// `send` hands back stays queued for the next call.
    pub fn hand_off_retired(
        &mut self,
        mut send: impl FnMut(Box<Voice>) -> std::result::Result<(), Box<Voice>>,
    ) {
        while let Some(voice) = self.retired.pop() {
            if let Err(voice) = send(voice) {
                self.retired.push(voice);
                break;
            }
        }
    }

    /// Finished voices not yet drained or handed off.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().map(|voice| &**voice)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices().find(|voice| voice.id() == id)
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }
}

/// Offline/single-threaded use: messages apply immediately at the engine's
/// current instant.
impl MessageSender for Engine {
    fn send(&mut self, message: EngineMessage) -> Result<()> {
        self.handle_message(message);
        Ok(())
    }
}
