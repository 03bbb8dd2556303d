//! Benchmarks for one triggered voice: oscillator, swept lowpass, amplitude.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_pulse::{
    dsp::OscillatorWaveform, engine::clock::RenderCtx, EnvelopeConfig, Voice, VoiceId,
    VoiceSettings,
};

use crate::BLOCK_SIZES;

fn triggered(waveform: OscillatorWaveform) -> Voice {
    let settings = VoiceSettings {
        waveform,
        ..VoiceSettings::default()
    };
    let mut voice = Voice::new(VoiceId(0), 45, EnvelopeConfig::default(), &settings, 0.0);
    voice.trigger(0.0).expect("fresh voice triggers");
    voice
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    // Mid-decay: both the amplitude and the cutoff ramps are moving.
    let ctx = RenderCtx::new(48_000.0, 0.05);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in [
            ("sawtooth", OscillatorWaveform::Sawtooth),
            ("square", OscillatorWaveform::Square),
        ] {
            let mut voice = triggered(waveform);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| voice.render(black_box(&mut buffer), black_box(&ctx)))
            });
        }
    }

    group.finish();
}
