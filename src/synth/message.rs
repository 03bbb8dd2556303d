#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::{
    error::{Error, Result},
    synth::voice::{Voice, VoiceId},
};

/// Commands sent from the control side to the audio side.
///
/// Voices are built (and allocated) on the control side and handed over
/// boxed. Finished voices go back through `Engine::hand_off_retired`, so a
/// realtime host never allocates or frees on the audio thread.
pub enum EngineMessage {
    /// Take ownership of a new voice and trigger it on arrival.
    Spawn(Box<Voice>),
    Release(VoiceId),
    /// Forwarded to the bus effect insert.
    FeedbackGain(f32),
}

impl std::fmt::Debug for EngineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineMessage::Spawn(voice) => f
                .debug_struct("Spawn")
                .field("voice", &voice.id())
                .field("pitch", &voice.pitch())
                .finish(),
            EngineMessage::Release(id) => f.debug_tuple("Release").field(id).finish(),
            EngineMessage::FeedbackGain(gain) => {
                f.debug_tuple("FeedbackGain").field(gain).finish()
            }
        }
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

pub trait MessageSender {
    /// Hand a message to the audio side. Fails with `QueueFull` instead of
    /// blocking.
    fn send(&mut self, message: EngineMessage) -> Result<()>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}

#[cfg(feature = "rtrb")]
impl MessageSender for Producer<EngineMessage> {
    fn send(&mut self, message: EngineMessage) -> Result<()> {
        self.push(message).map_err(|_| Error::QueueFull)
    }
}

/// Plain queue, for tests and offline rendering.
impl MessageReceiver for std::collections::VecDeque<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        self.pop_front()
    }
}

impl MessageSender for std::collections::VecDeque<EngineMessage> {
    fn send(&mut self, message: EngineMessage) -> Result<()> {
        self.push_back(message);
        Ok(())
    }
}
