use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Periodic Oscillator
===================

A phase accumulator walks from 0.0 to 1.0 once per cycle; the waveform
function maps that phase to an output sample in [-1, 1].

    phase_increment = frequency / sample_rate

  Sine:      sin(2π · phase)                 pure, no harmonics
  Sawtooth:  2 · phase - 1                   all harmonics, bright
  Square:    +1 for phase < 0.5, else -1     odd harmonics, hollow
  Triangle:  1 - 4 · |phase - 0.5|           odd harmonics, soft

The shapes are naive (not band-limited). Every voice runs its oscillator into
a low-pass filter, which keeps aliasing in check for the pitch range used here.

A Generator wraps the oscillator with a start and a stop instant on the audio
clock. Outside [start, stop) it is silent, and once a stop instant has been
set it can never be moved or cleared: a stopped generator stays stopped.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    Sine,
    #[default]
    Sawtooth,
    Square,
    Triangle,
}

pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let phase = self.phase;
        let sample = match self.waveform {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Sawtooth => 2.0 * phase - 1.0,
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };

        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();

        sample
    }

    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }
}

/// Result of asking a generator to stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopOutcome {
    Scheduled,
    /// A stop was already set; the original instant is kept.
    AlreadyStopped { stop_time: f64 },
}

/// An oscillator that only sounds between its start and stop instants.
pub struct Generator {
    osc: OscillatorBlock,
    start_time: Option<f64>,
    stop_time: Option<f64>,
}

impl Generator {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            osc: OscillatorBlock::new(waveform),
            start_time: None,
            stop_time: None,
        }
    }

    /// Start sounding at `time`. Later calls keep the first start instant.
    pub fn start(&mut self, time: f64) {
        if self.start_time.is_none() {
            self.start_time = Some(time);
        }
    }

    /// Stop at exactly `time`. A generator can only be stopped once.
    pub fn stop(&mut self, time: f64) -> StopOutcome {
        match self.stop_time {
            Some(stop_time) => StopOutcome::AlreadyStopped { stop_time },
            None => {
                self.stop_time = Some(time);
                StopOutcome::Scheduled
            }
        }
    }

    pub fn is_sounding(&self, t: f64) -> bool {
        let started = self.start_time.is_some_and(|start| t >= start);
        let stopped = self.stop_time.is_some_and(|stop| t >= stop);
        started && !stopped
    }

    /// True once the clock has reached the stop instant.
    pub fn has_stopped(&self, t: f64) -> bool {
        self.stop_time.is_some_and(|stop| t >= stop)
    }

    #[inline]
    pub fn next_sample(&mut self, t: f64, frequency: f32, sample_rate: f32) -> f32 {
        if self.is_sounding(t) {
            self.osc.next_sample(frequency, sample_rate)
        } else {
            0.0
        }
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop_time
    }
}
