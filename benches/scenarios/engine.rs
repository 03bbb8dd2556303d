//! Benchmarks for whole engine blocks with many overlapping voices.
//!
//! A short period and a long release keep roughly `release / period`
//! voices alive, which is the dense case the engine must survive.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_pulse::{Engine, EnvelopeConfig, Scheduler, SchedulerConfig};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

/// Engine warmed up until the scheduler has filled it with voices.
fn dense_engine(period_ms: f64, size: usize) -> (Scheduler, Engine) {
    let config = SchedulerConfig::default()
        .period_ms(period_ms)
        .envelope(EnvelopeConfig::default())
        .seed(11);
    let mut scheduler = Scheduler::new(config).expect("valid scheduler config");
    let mut engine = Engine::new(SAMPLE_RATE);
    let mut block = vec![0.0f32; size];

    scheduler.start(0.0);
    while engine.now() < 1.0 {
        scheduler.advance_to(engine.now(), &mut engine);
        engine.render(&mut block);
        scheduler.reap(engine.drain_finished());
    }
    (scheduler, engine)
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut block = vec![0.0f32; size];

        for (name, period_ms) in [("period_125ms", 125.0), ("period_20ms", 20.0)] {
            let (mut scheduler, mut engine) = dense_engine(period_ms, size);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    scheduler.advance_to(engine.now(), &mut engine);
                    engine.render(black_box(&mut block));
                    scheduler.reap(engine.drain_finished());
                })
            });
        }
    }

    group.finish();
}
