use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Envelope parameters read by the scheduler at every firing.
///
/// The record is `Copy`: each voice takes its own snapshot when it is
/// created, so later edits only reach voices spawned afterwards.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    pub attack_seconds: f32,
    pub decay_seconds: f32,
    pub sustain_level: f32, // fraction of peak amplitude, 0.0 - 1.0
    pub release_seconds: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack_seconds: 0.01,
            decay_seconds: 0.1,
            sustain_level: 0.25,
            release_seconds: 0.9,
        }
    }
}

impl EnvelopeConfig {
    /// Build a config, rejecting any out-of-range field.
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Result<Self> {
        let mut config = Self::default();
        config.set(Parameter::Attack, attack)?;
        config.set(Parameter::Decay, decay)?;
        config.set(Parameter::Sustain, sustain)?;
        config.set(Parameter::Release, release)?;
        Ok(config)
    }

    /// Apply one envelope parameter. Out-of-range values are rejected, never
    /// clamped, and leave the record untouched.
    ///
    /// `FeedbackGain` does not belong to the envelope and is rejected here;
    /// the scheduler routes it to the effect insert instead.
    pub fn set(&mut self, parameter: Parameter, value: f32) -> Result<()> {
        parameter.validate(value)?;
        match parameter {
            Parameter::Attack => self.attack_seconds = value,
            Parameter::Decay => self.decay_seconds = value,
            Parameter::Sustain => self.sustain_level = value,
            Parameter::Release => self.release_seconds = value,
            Parameter::FeedbackGain => {
                return Err(Error::InvalidParameter {
                    parameter,
                    value,
                    reason: "not an envelope parameter",
                })
            }
        }
        Ok(())
    }

    pub fn get(&self, parameter: Parameter) -> Option<f32> {
        match parameter {
            Parameter::Attack => Some(self.attack_seconds),
            Parameter::Decay => Some(self.decay_seconds),
            Parameter::Sustain => Some(self.sustain_level),
            Parameter::Release => Some(self.release_seconds),
            Parameter::FeedbackGain => None,
        }
    }
}

/// Parameters the UI layer can change while the scheduler is running.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Attack,
    Decay,
    Sustain,
    Release,
    /// Routed to the bus effect insert, not to the envelope.
    FeedbackGain,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::Attack,
        Parameter::Decay,
        Parameter::Sustain,
        Parameter::Release,
        Parameter::FeedbackGain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Attack => "attack",
            Parameter::Decay => "decay",
            Parameter::Sustain => "sustain",
            Parameter::Release => "release",
            Parameter::FeedbackGain => "feedbackGain",
        }
    }

    /// Range check shared by the envelope and the feedback route.
    pub fn validate(self, value: f32) -> Result<()> {
        let reason = if !value.is_finite() {
            Some("value must be finite")
        } else {
            match self {
                Parameter::Attack | Parameter::Decay | Parameter::Release if value < 0.0 => {
                    Some("time must be >= 0 seconds")
                }
                Parameter::Sustain if !(0.0..=1.0).contains(&value) => {
                    Some("sustain must be within [0, 1]")
                }
                Parameter::FeedbackGain if !(0.0..1.0).contains(&value) => {
                    Some("feedback gain must be within [0, 1)")
                }
                _ => None,
            }
        };

        match reason {
            Some(reason) => Err(Error::InvalidParameter {
                parameter: self,
                value,
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown parameter '{s}'")))
    }
}

/// "Parameter P changed to V", as delivered by the UI layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterChange {
    pub parameter: Parameter,
    pub value: f32,
}

impl ParameterChange {
    pub fn new(parameter: Parameter, value: f32) -> Self {
        Self { parameter, value }
    }
}
