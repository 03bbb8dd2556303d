use tracing::debug;

use crate::{engine::clock::RenderCtx, synth::voice::Voice, MAX_BLOCK_SIZE};

/*
Mix Bus
=======

Every live voice renders into a scratch buffer and is summed into one
destination block. After the sum, the block passes through a single effect
insert before it leaves the engine:

    voice ─┐
    voice ─┼──(+)──→ [ insert ] ──→ destination
    voice ─┘

The insert is the only place an effect chain can hook in. What it does with
the `feedbackGain` parameter (delay length, tap point, topology) is up to
the insert; the bus only forwards the value.
*/

/// Single effect processing point at the end of the mix bus.
pub trait EffectInsert: Send {
    fn process(&mut self, block: &mut [f32], ctx: &RenderCtx);

    fn set_feedback_gain(&mut self, gain: f32);
}

/// Insert that leaves the mix untouched.
#[derive(Debug, Default)]
pub struct Passthrough {
    feedback_gain: f32,
}

impl Passthrough {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last gain received, kept so integrators can observe the routing.
    pub fn feedback_gain(&self) -> f32 {
        self.feedback_gain
    }
}

impl EffectInsert for Passthrough {
    fn process(&mut self, _block: &mut [f32], _ctx: &RenderCtx) {}

    fn set_feedback_gain(&mut self, gain: f32) {
        debug!(gain, "feedback gain set on passthrough insert");
        self.feedback_gain = gain;
    }
}

pub struct MixBus {
    insert: Box<dyn EffectInsert>,
    temp_buffer: Vec<f32>,
}

impl MixBus {
    pub fn new(insert: Box<dyn EffectInsert>) -> Self {
        Self {
            insert,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Overwrite `out` (any length) with the sum of `voices`, then run the
    /// insert. Blocks longer than `MAX_BLOCK_SIZE` are rendered in chunks.
    pub fn render(&mut self, voices: &mut [Box<Voice>], out: &mut [f32], ctx: &RenderCtx) {
        for (index, block) in out.chunks_mut(MAX_BLOCK_SIZE).enumerate() {
            let block_ctx = RenderCtx::new(ctx.sample_rate, ctx.time_of(index * MAX_BLOCK_SIZE));
            self.render_block(voices, block, &block_ctx);
        }
    }

    fn render_block(&mut self, voices: &mut [Box<Voice>], out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);

        for voice in voices.iter_mut() {
            let frames = &mut self.temp_buffer[..out.len()];
            frames.fill(0.0);
            voice.render(frames, ctx);

            for (o, v) in out.iter_mut().zip(frames.iter()) {
                *o += v;
            }
        }

        self.insert.process(out, ctx);
    }

    pub fn set_feedback_gain(&mut self, gain: f32) {
        self.insert.set_feedback_gain(gain);
    }
}

impl Default for MixBus {
    fn default() -> Self {
        Self::new(Box::new(Passthrough::new()))
    }
}
