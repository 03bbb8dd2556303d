use std::f32::consts::TAU;

/*
State-Variable Low-Pass Filter
==============================

Topology-preserving (trapezoidal) SVF. Each voice owns one instance and
feeds it a new cutoff every sample, taken from the voice's cutoff automation.

    g = tan(π · cutoff / sample_rate)        prewarped integrator gain
    k = 2 - 2 · resonance                    damping

The cutoff is clamped just below Nyquist so `tan` stays finite while a sweep
passes through high values at low sample rates.
*/

/// Highest usable cutoff as a fraction of the sample rate.
const MAX_CUTOFF_RATIO: f32 = 0.49;
const MIN_CUTOFF_HZ: f32 = 10.0;

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    resonance: f32,
}

impl SVFilter {
    pub fn lowpass() -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            resonance: 0.0,
        }
    }

    pub fn with_resonance(mut self, resonance: f32) -> Self {
        self.resonance = resonance.clamp(0.0, 0.95);
        self
    }

    #[inline]
    fn compute_g(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ, sample_rate * MAX_CUTOFF_RATIO);
        (TAU * cutoff / (2.0 * sample_rate)).tan()
    }

    /// Filter one sample with the cutoff in effect at that sample.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let g = Self::compute_g(cutoff_hz, sample_rate);
        let k = 2.0 - (2.0 * self.resonance);

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    /// Filter a block in place against a per-sample cutoff curve.
    pub fn render(&mut self, buffer: &mut [f32], cutoff_hz: &[f32], sample_rate: f32) {
        for (sample, &cutoff) in buffer.iter_mut().zip(cutoff_hz) {
            *sample = self.next_sample(*sample, cutoff, sample_rate);
        }
    }
}
