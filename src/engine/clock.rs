/// Context passed to voices during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Audio-clock instant of the block's first sample, in seconds
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }

    /// Instant of sample `index` within the block.
    #[inline]
    pub fn time_of(&self, index: usize) -> f64 {
        self.time + index as f64 / self.sample_rate as f64
    }

    /// Instant just after the last of `frames` samples.
    #[inline]
    pub fn end_time(&self, frames: usize) -> f64 {
        self.time_of(frames)
    }
}

/// Monotonic sample clock owned by the audio side.
///
/// Time is derived from an integer frame counter so it never drifts, no
/// matter how many blocks have been rendered.
#[derive(Debug, Clone)]
pub struct AudioClock {
    sample_rate: f32,
    frames: u64,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
        }
    }

    /// Current instant in seconds.
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn ctx(&self) -> RenderCtx {
        RenderCtx::new(self.sample_rate, self.now())
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }
}
