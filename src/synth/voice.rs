use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    dsp::{
        automation::ParamTimeline,
        filter::SVFilter,
        oscillator::{Generator, OscillatorWaveform, StopOutcome},
    },
    engine::clock::RenderCtx,
    error::{Error, Result},
    synth::envelope::EnvelopeConfig,
    MAX_BLOCK_SIZE,
};

/*
Voice Lifecycle
===============

One voice is one note: a generator, a low-pass filter, and two automation
streams (amplitude and filter cutoff) that are scheduled declaratively on
the audio clock.

    Idle ──trigger()──→ Attacking ··→ Decaying ··→ Sustaining
                            │             │             │
                            └─────────────┴──release()──┘
                                          ↓
                                      Releasing ──stop instant──→ Finished

Solid arrows are method calls; dotted arrows happen by themselves as the
clock moves through the scheduled ramps. Nothing fires on those dotted
transitions: the stage is read back from the trigger/release instants.

Amplitude
---------

  peak    ┐     ╱╲
          │    ╱  ╲___________
  peak·S  │   ╱               ╲
          │  ╱                 ╲
  0.0     └─●───────────────────●──→ time
         trigger            release + R

  trigger(now):  anchor, ramp → peak at now+A, ramp → peak·S at now+A+D
  release(now):  anchor, ramp → 0 at now+R, generator stop at now+R

Filter cutoff
-------------

  trigger(now):  anchor, ramp → 2·frequency at now+A+D
  release(now):  anchor (holds wherever the sweep had reached)

Both streams are re-anchored before every new ramp, so a release that lands
mid-attack or mid-decay fades from the value actually being heard.
*/

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStage {
    Idle,       // Created, nothing scheduled yet
    Attacking,  // Ramping up to peak amplitude
    Decaying,   // Ramping down to the sustain level
    Sustaining, // Holding the sustain level until release
    Releasing,  // Fading to silence, generator stop scheduled
    Finished,   // Generator stopped, ready to be dropped
}

/// Settings shared by every voice the scheduler spawns.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    /// Amplitude ceiling of a single voice. Keeps the mix of overlapping
    /// voices below full scale.
    pub peak_amplitude: f32,
    /// Cutoff before the first sweep starts.
    pub initial_cutoff_hz: f32,
    pub waveform: OscillatorWaveform,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            peak_amplitude: 0.2,
            initial_cutoff_hz: 4_000.0,
            waveform: OscillatorWaveform::Sawtooth,
        }
    }
}

impl VoiceSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.peak_amplitude.is_finite() && (0.0..=1.0).contains(&self.peak_amplitude)) {
            return Err(Error::InvalidConfig(format!(
                "peak amplitude {} must be within [0, 1]",
                self.peak_amplitude
            )));
        }
        if !(self.initial_cutoff_hz.is_finite() && self.initial_cutoff_hz > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "initial cutoff {} Hz must be positive",
                self.initial_cutoff_hz
            )));
        }
        Ok(())
    }
}

pub struct Voice {
    id: VoiceId,
    pitch: u8,
    frequency_hz: f32,
    peak_amplitude: f32,
    envelope: EnvelopeConfig,
    stage: VoiceStage,

    created_at: f64,
    triggered_at: Option<f64>,
    released_at: Option<f64>,

    generator: Generator,
    filter: SVFilter,
    amplitude: ParamTimeline,
    cutoff: ParamTimeline,

    // Scratch space for block rendering (allocated once, at creation)
    amplitude_buffer: Vec<f32>,
    cutoff_buffer: Vec<f32>,
}

impl Voice {
    /// Create an idle voice. `created_at` is a control-clock timestamp kept
    /// for diagnostics only.
    pub fn new(
        id: VoiceId,
        pitch: u8,
        envelope: EnvelopeConfig,
        settings: &VoiceSettings,
        created_at: f64,
    ) -> Self {
        Self {
            id,
            pitch,
            frequency_hz: midi_note_to_freq(pitch),
            peak_amplitude: settings.peak_amplitude,
            envelope,
            stage: VoiceStage::Idle,
            created_at,
            triggered_at: None,
            released_at: None,
            generator: Generator::new(settings.waveform),
            filter: SVFilter::lowpass(),
            amplitude: ParamTimeline::new(0.0),
            cutoff: ParamTimeline::new(settings.initial_cutoff_hz),
            amplitude_buffer: vec![0.0; MAX_BLOCK_SIZE],
            cutoff_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Start the attack/decay automation and the generator at `now`.
    ///
    /// Calling it again before `release()` re-anchors and reschedules from
    /// the live values. After `release()` the voice can't be triggered again.
    pub fn trigger(&mut self, now: f64) -> Result<()> {
        if matches!(self.stage, VoiceStage::Releasing | VoiceStage::Finished) {
            return Err(self.precondition("trigger"));
        }

        self.anchor(now);

        let EnvelopeConfig {
            attack_seconds,
            decay_seconds,
            sustain_level,
            ..
        } = self.envelope;
        let attack_end = now + attack_seconds as f64;
        let decay_end = attack_end + decay_seconds as f64;

        self.amplitude
            .linear_ramp_to_value_at_time(self.peak_amplitude, attack_end);
        self.amplitude
            .linear_ramp_to_value_at_time(self.peak_amplitude * sustain_level, decay_end);
        self.cutoff
            .linear_ramp_to_value_at_time(2.0 * self.frequency_hz, decay_end);

        self.generator.start(now);
        self.triggered_at = Some(now);
        self.stage = VoiceStage::Attacking;

        debug!(voice = %self.id, pitch = self.pitch, now, "voice triggered");
        Ok(())
    }

    /// Fade to silence from the live value and stop the generator at
    /// exactly `now + release`.
    pub fn release(&mut self, now: f64) -> Result<()> {
        match self.stage {
            VoiceStage::Idle => return Err(self.precondition("release")),
            VoiceStage::Releasing | VoiceStage::Finished => {
                return Err(Error::DoubleShutdown { voice: self.id })
            }
            _ => {}
        }

        let stop_time = now + self.envelope.release_seconds as f64;
        if let StopOutcome::AlreadyStopped { .. } = self.generator.stop(stop_time) {
            return Err(Error::DoubleShutdown { voice: self.id });
        }

        self.anchor(now);
        self.amplitude.linear_ramp_to_value_at_time(0.0, stop_time);

        self.released_at = Some(now);
        self.stage = VoiceStage::Releasing;

        debug!(voice = %self.id, now, stop_time, "voice released");
        Ok(())
    }

    /// Render this voice into `out`, overwriting it.
    pub fn render(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let frames = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..frames];

        let amplitude = &mut self.amplitude_buffer[..frames];
        let cutoff = &mut self.cutoff_buffer[..frames];
        self.amplitude.fill(amplitude, ctx.time, ctx.sample_rate);
        self.cutoff.fill(cutoff, ctx.time, ctx.sample_rate);

        for (i, sample) in out.iter_mut().enumerate() {
            let t = ctx.time_of(i);
            let raw = self
                .generator
                .next_sample(t, self.frequency_hz, ctx.sample_rate);
            let filtered = self.filter.next_sample(raw, cutoff[i], ctx.sample_rate);
            *sample = filtered * amplitude[i];
        }

        if self.stage == VoiceStage::Releasing && self.generator.has_stopped(ctx.end_time(frames)) {
            self.stage = VoiceStage::Finished;
            debug!(voice = %self.id, "voice finished");
        }
    }

    /// Stage at time `t`, with the attack/decay/sustain progression derived
    /// from the trigger instant.
    pub fn stage_at(&self, t: f64) -> VoiceStage {
        match (self.stage, self.triggered_at) {
            (VoiceStage::Attacking, Some(triggered)) => {
                let attack_end = triggered + self.envelope.attack_seconds as f64;
                let decay_end = attack_end + self.envelope.decay_seconds as f64;
                if t < attack_end {
                    VoiceStage::Attacking
                } else if t < decay_end {
                    VoiceStage::Decaying
                } else {
                    VoiceStage::Sustaining
                }
            }
            (VoiceStage::Releasing, _) if self.generator.has_stopped(t) => VoiceStage::Finished,
            (stage, _) => stage,
        }
    }

    /// Anchor: cancel pending automation and pin both streams to their
    /// instantaneous value at `now`.
    fn anchor(&mut self, now: f64) {
        self.amplitude.anchor(now);
        self.cutoff.anchor(now);
    }

    fn precondition(&self, operation: &'static str) -> Error {
        Error::PreconditionViolation {
            voice: self.id,
            operation,
            stage: self.stage,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn peak_amplitude(&self) -> f32 {
        self.peak_amplitude
    }

    pub fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    pub fn stage(&self) -> VoiceStage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == VoiceStage::Finished
    }

    pub fn amplitude_at(&self, t: f64) -> f32 {
        self.amplitude.value_at(t)
    }

    pub fn cutoff_at(&self, t: f64) -> f32 {
        self.cutoff.value_at(t)
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn triggered_at(&self) -> Option<f64> {
        self.triggered_at
    }

    pub fn released_at(&self) -> Option<f64> {
        self.released_at
    }

    /// Instant at which the generator shuts down, once released.
    pub fn stop_time(&self) -> Option<f64> {
        self.generator.stop_time()
    }
}
