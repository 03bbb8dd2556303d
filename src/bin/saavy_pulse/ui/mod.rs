//! TUI module for saavy-pulse
//!
//! Owns the control side: the scheduler is advanced from this loop on wall
//! time, and key presses become start/stop commands and parameter changes.

mod spectrum;
mod status;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use saavy_pulse::{EngineMessage, Parameter, ParameterChange, Scheduler, Voice};

use spectrum::{render_spectrum, SpectrumAnalyzer};
use status::{render_status, AudioStats, StatusView};
use waveform::render_waveform;

/// Audio visualization buffer size (also the FFT size)
const VIS_BUFFER_SIZE: usize = 2048;

/// How long the loop waits for a key before advancing the scheduler again.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Lower-case key lowers the parameter by the step, upper-case raises it.
const PARAMETER_KEYS: [(char, Parameter, f32); 5] = [
    ('a', Parameter::Attack, 0.01),
    ('d', Parameter::Decay, 0.05),
    ('s', Parameter::Sustain, 0.05),
    ('r', Parameter::Release, 0.1),
    ('f', Parameter::FeedbackGain, 0.1),
];

pub struct PulseUi {
    scheduler: Scheduler,
    to_audio: Producer<EngineMessage>,
    /// Finished voices coming back from the audio thread to be freed here.
    retired_rx: Consumer<Box<Voice>>,
    audio_rx: Consumer<f32>,
    /// Origin of the control clock.
    started: Instant,
    sample_rate: f32,
    /// Last gain accepted; the insert itself lives on the audio thread.
    feedback_gain: f32,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    /// Last rejected change, shown instead of the help line.
    error: Option<String>,
    should_quit: bool,
}

impl PulseUi {
    pub fn new(
        scheduler: Scheduler,
        to_audio: Producer<EngineMessage>,
        retired_rx: Consumer<Box<Voice>>,
        audio_rx: Consumer<f32>,
        sample_rate: f32,
    ) -> Self {
        Self {
            scheduler,
            to_audio,
            retired_rx,
            audio_rx,
            started: Instant::now(),
            sample_rate,
            feedback_gain: 0.0,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            error: None,
            should_quit: false,
        }
    }

    /// Control-clock time in seconds.
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Run the control loop until the user quits
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        self.scheduler.start(self.now());

        while !self.should_quit {
            self.poll_retired();
            let now = self.now();
            self.scheduler.advance_to(now, &mut self.to_audio);

            self.poll_audio();
            self.spectrum.update(&self.audio_buffer);
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.scheduler.stop();
        Ok(())
    }

    fn poll_retired(&mut self) {
        while let Ok(voice) = self.retired_rx.pop() {
            self.scheduler.voice_finished(voice.id());
        }
    }

    /// Keep only the newest VIS_BUFFER_SIZE samples
    fn poll_audio(&mut self) {
        let available = self.audio_rx.slots();
        if available == 0 {
            return;
        }
        self.audio_buffer
            .extend(std::iter::from_fn(|| self.audio_rx.pop().ok()).take(available));
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                info!("quit requested");
                self.should_quit = true;
            }
            KeyCode::Char(' ') => {
                if self.scheduler.is_running() {
                    self.scheduler.stop();
                } else {
                    let now = self.now();
                    self.scheduler.start(now);
                }
            }
            KeyCode::Char(c) => {
                let lower = c.to_ascii_lowercase();
                if let Some(&(_, parameter, step)) =
                    PARAMETER_KEYS.iter().find(|(key, ..)| *key == lower)
                {
                    let delta = if c.is_ascii_uppercase() { step } else { -step };
                    self.nudge(parameter, delta);
                }
            }
            _ => {}
        }
    }

    fn current_value(&self, parameter: Parameter) -> f32 {
        match parameter {
            Parameter::FeedbackGain => self.feedback_gain,
            _ => self.scheduler.envelope().get(parameter).unwrap_or_default(),
        }
    }

    /// Step a parameter. Out-of-range results are reported, not clamped.
    fn nudge(&mut self, parameter: Parameter, delta: f32) {
        // Snap to the step grid so repeated presses don't drift.
        let value = ((self.current_value(parameter) + delta) * 1000.0).round() / 1000.0;
        let change = ParameterChange::new(parameter, value);

        match self.scheduler.apply_parameter(change, &mut self.to_audio) {
            Ok(()) => {
                if parameter == Parameter::FeedbackGain {
                    self.feedback_gain = value;
                }
                self.error = None;
            }
            Err(err) => {
                warn!(%err, "parameter change rejected");
                self.error = Some(err.to_string());
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Status and envelope
                Constraint::Min(8),    // Waveform
                Constraint::Length(10), // Spectrum
                Constraint::Length(1), // Help or last error
            ])
            .split(frame.area());

        let view = StatusView {
            running: self.scheduler.is_running(),
            period_seconds: self.scheduler.period_seconds(),
            active_voices: self.scheduler.active_voices().len(),
            pending_releases: self.scheduler.pending_release_count(),
            envelope: self.scheduler.envelope(),
            feedback_gain: self.feedback_gain,
            sample_rate: self.sample_rate,
        };
        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_status(frame, chunks[0], &view, &stats);

        render_waveform(frame, chunks[1], &self.audio_buffer, stats.peak);
        render_spectrum(frame, chunks[2], self.spectrum.data());

        let footer = match &self.error {
            Some(message) => {
                Paragraph::new(format!(" {message}")).style(Style::default().fg(Color::Red))
            }
            None => Paragraph::new(
                " [Q] Quit  [Space] Start/Stop  [a/A] Attack  [d/D] Decay  [s/S] Sustain  [r/R] Release  [f/F] Feedback",
            )
            .style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(footer, chunks[3]);
    }
}
