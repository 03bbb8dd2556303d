//! Scenario benchmarks: single voices and a scheduler feeding the engine.

mod engine;
mod voices;

pub use engine::bench_engine;
pub use voices::bench_voices;
