//! Low-level DSP primitives used by voices.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so they can live directly inside a voice that renders on the audio thread.

/// Declarative set/ramp automation curves on the audio clock.
pub mod automation;
/// State-variable low-pass filter with per-sample cutoff.
pub mod filter;
/// Periodic oscillator waveforms and the start/stop generator wrapper.
pub mod oscillator;

pub use automation::ParamTimeline;
pub use oscillator::OscillatorWaveform;
