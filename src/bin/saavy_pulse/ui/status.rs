//! Status bar widget - scheduler state, live envelope values and audio stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_pulse::EnvelopeConfig;

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

/// Snapshot of the control side taken once per frame.
pub struct StatusView {
    pub running: bool,
    pub period_seconds: f64,
    pub active_voices: usize,
    pub pending_releases: usize,
    pub envelope: EnvelopeConfig,
    pub feedback_gain: f32,
    pub sample_rate: f32,
}

pub fn render_status(frame: &mut Frame, area: Rect, view: &StatusView, audio: &AudioStats) {
    let block = Block::default().title(" saavy-pulse ").borders(Borders::ALL);

    let (symbol, state, color) = if view.running {
        ("▶", "Running", Color::Green)
    } else {
        ("⏸", "Stopped", Color::Yellow)
    };

    let transport = Line::from(vec![
        Span::styled(format!(" {symbol} {state}  "), Style::default().fg(color)),
        Span::styled(
            format!("Period: {:.0} ms  ", view.period_seconds * 1000.0),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Voices: {}  Pending releases: {}  ", view.active_voices, view.pending_releases),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{:.1}kHz  ", view.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", audio.peak, audio.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let envelope = &view.envelope;
    let parameters = Line::from(vec![Span::styled(
        format!(
            " A {:.3}s  D {:.3}s  S {:.2}  R {:.2}s  Feedback {:.2}",
            envelope.attack_seconds,
            envelope.decay_seconds,
            envelope.sustain_level,
            envelope.release_seconds,
            view.feedback_gain,
        ),
        Style::default().fg(Color::LightBlue),
    )]);

    let paragraph = Paragraph::new(vec![transport, parameters]).block(block);
    frame.render_widget(paragraph, area);
}
