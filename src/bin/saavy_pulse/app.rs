//! Pulse - wires the scheduler, the audio engine and the terminal UI together

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{PushError, RingBuffer};
use tracing::{error, info};

use saavy_pulse::{Engine, EngineMessage, Scheduler, SchedulerConfig, Voice, MAX_BLOCK_SIZE};

use crate::ui::PulseUi;

/// Control messages in flight to the audio thread.
const MESSAGE_CAPACITY: usize = 256;
/// Retired voices in flight back to the control thread, which frees them.
const RETIRED_CAPACITY: usize = 256;
/// Mono samples buffered for the scope and spectrum.
const SCOPE_CAPACITY: usize = 16_384;

/// Main application builder
pub struct Pulse {
    config: SchedulerConfig,
}

impl Pulse {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Open the default output device and run until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let scheduler = Scheduler::new(self.config).wrap_err("invalid scheduler config")?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(sample_rate, channels, "audio device opened");

        let (to_audio, mut from_control) = RingBuffer::<EngineMessage>::new(MESSAGE_CAPACITY);
        let (mut retired_tx, retired_rx) = RingBuffer::<Box<Voice>>::new(RETIRED_CAPACITY);
        let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);

        let mut engine = Engine::new(sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames];

                    engine.process_block(&mut from_control, block);

                    // Voices that don't fit stay in the engine until the next block.
                    engine.hand_off_retired(|voice| {
                        retired_tx.push(voice).map_err(|PushError::Full(voice)| voice)
                    });

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        let _ = scope_tx.push(s);
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }

                    frames_written += frames;
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )?;
        stream.play().wrap_err("failed to start audio stream")?;

        let mut ui = PulseUi::new(scheduler, to_audio, retired_rx, scope_rx, sample_rate);

        let mut terminal = ratatui::init();
        let result = ui.run(&mut terminal);
        ratatui::restore();

        info!("shutting down");
        drop(stream);
        result
    }
}
