//! Spectrum widget
//!
//! Hann-windowed FFT of the scope buffer, sampled at log-spaced frequencies
//! and plotted against log10(frequency) so octaves get equal width.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Number of points plotted
const SPECTRUM_POINTS: usize = 64;
const MIN_FREQ: f64 = 20.0;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    /// FFT bin read for each plotted point, with its log10 frequency
    points: Vec<(f64, usize)>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// (log10 frequency, magnitude in dB)
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, sample_rate: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let denom = fft_size.saturating_sub(1).max(1) as f32;
        let window = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
            .collect();

        let nyquist = (sample_rate as f64 / 2.0).min(20_000.0).max(MIN_FREQ * 2.0);
        let last_bin = (fft_size / 2).saturating_sub(1);
        let points: Vec<(f64, usize)> = (0..SPECTRUM_POINTS)
            .map(|i| {
                let t = i as f64 / (SPECTRUM_POINTS - 1) as f64;
                let freq = MIN_FREQ * (nyquist / MIN_FREQ).powf(t);
                let bin = (freq * fft_size as f64 / sample_rate as f64).round() as usize;
                (freq.log10(), bin.min(last_bin))
            })
            .collect();

        let spectrum = points.iter().map(|&(x, _)| (x, FLOOR_DB)).collect();

        Self {
            window,
            points,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            spectrum,
        }
    }

    /// Recompute from the newest samples. Buffers of the wrong size are ignored.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for ((_, db), &(_, bin)) in self.spectrum.iter_mut().zip(&self.points) {
            let power = self.scratch[bin].norm_sqr().max(1e-12);
            *db = (10.0 * (power as f64).log10()).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum);

    let max_x = spectrum.last().map_or(MIN_FREQ.log10() + 1.0, |&(x, _)| x);
    let max_db = spectrum.iter().map(|&(_, db)| db).fold(FLOOR_DB, f64::max);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([MIN_FREQ.log10(), max_x])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, max_db.max(0.0) + 10.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
