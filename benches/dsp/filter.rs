//! Benchmarks for the state-variable lowpass with per-sample cutoff.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_pulse::dsp::filter::SVFilter;

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut buffer = input.clone();

        // Fixed cutoff
        let fixed = vec![1_000.0f32; size];
        let mut filter = SVFilter::lowpass();
        group.bench_with_input(BenchmarkId::new("lowpass_fixed", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(&fixed), 48_000.0);
            })
        });

        // Cutoff sweeping across the block, as a voice's cutoff ramp does
        let sweep: Vec<f32> = (0..size)
            .map(|i| 4_000.0 - 3_000.0 * i as f32 / size as f32)
            .collect();
        let mut filter = SVFilter::lowpass().with_resonance(0.5);
        group.bench_with_input(BenchmarkId::new("lowpass_sweep", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(&sweep), 48_000.0);
            })
        });
    }

    group.finish();
}
