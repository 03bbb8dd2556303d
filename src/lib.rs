pub mod dsp; // Oscillator, filter and automation primitives
pub mod engine; // Audio clock, mix bus and trigger scheduler
pub mod error;
pub mod synth; // Voices and their envelope configuration

pub use engine::{
    bus::{EffectInsert, Passthrough},
    scheduler::{Scheduler, SchedulerConfig},
    Engine,
};
pub use error::{Error, Result};
pub use synth::{
    envelope::{EnvelopeConfig, Parameter, ParameterChange},
    message::{EngineMessage, MessageReceiver, MessageSender},
    voice::{Voice, VoiceId, VoiceSettings, VoiceStage},
};

pub const MAX_BLOCK_SIZE: usize = 2048;
