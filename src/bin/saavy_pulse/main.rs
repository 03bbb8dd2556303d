//! saavy-pulse - periodic tone generator in the terminal
//!
//! Run with: cargo run --release
//! Logs go to `saavy-pulse.log`; the terminal belongs to the UI.

mod app;
mod ui;

use std::{fs::File, sync::Mutex};

use app::Pulse;
use color_eyre::eyre::WrapErr;
use saavy_pulse::{EnvelopeConfig, SchedulerConfig};

const LOG_FILE: &str = "saavy-pulse.log";

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_logging()?;

    let config = SchedulerConfig::default()
        .period_ms(125.0)
        .pitch_pool([60, 62, 64, 67, 69, 72])
        .envelope(EnvelopeConfig::adsr(0.01, 0.1, 0.25, 0.9)?);

    Pulse::new(config).run()
}

fn init_logging() -> color_eyre::Result<()> {
    let file = File::create(LOG_FILE).wrap_err_with(|| format!("failed to create {LOG_FILE}"))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();
    Ok(())
}
