//! Benchmarks for sampling automation timelines into blocks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_pulse::dsp::ParamTimeline;

use crate::BLOCK_SIZES;

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");

    // Same shape as a triggered voice's amplitude: attack, decay, release.
    let mut adsr = ParamTimeline::new(0.0);
    adsr.set_value_at_time(0.0, 0.0);
    adsr.linear_ramp_to_value_at_time(0.2, 0.01);
    adsr.linear_ramp_to_value_at_time(0.05, 0.11);
    adsr.linear_ramp_to_value_at_time(0.0, 1.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("adsr_ramp", size), &size, |b, _| {
            b.iter(|| adsr.fill(black_box(&mut buffer), black_box(0.005), 48_000.0))
        });

        group.bench_with_input(BenchmarkId::new("adsr_settled", size), &size, |b, _| {
            b.iter(|| adsr.fill(black_box(&mut buffer), black_box(2.0), 48_000.0))
        });
    }

    group.finish();
}
