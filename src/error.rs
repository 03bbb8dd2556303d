use thiserror::Error;

use crate::synth::{envelope::Parameter, voice::VoiceId, voice::VoiceStage};

/// Everything that can go wrong between the control side and the audio side.
///
/// `PreconditionViolation` and `DoubleShutdown` are timing edge cases: the
/// engine logs them and carries on. `InvalidParameter` is handed back to
/// whoever issued the parameter change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{operation}() is not valid for voice {voice} in stage {stage:?}")]
    PreconditionViolation {
        voice: VoiceId,
        operation: &'static str,
        stage: VoiceStage,
    },

    #[error("generator for voice {voice} was already stopped")]
    DoubleShutdown { voice: VoiceId },

    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter {
        parameter: Parameter,
        value: f32,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("engine message queue is full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, Error>;
