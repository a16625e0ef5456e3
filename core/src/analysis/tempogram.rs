//! Autocorrelation tempogram and tempo estimation.

use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::audio::stft::hann_window;

/// Tempo in BPM of each autocorrelation lag. Lag 0 maps to infinity.
pub fn tempo_frequencies(n_bins: usize, hop_length: usize, sample_rate: u32) -> Vec<f64> {
    let mut bpms = vec![f64::INFINITY; n_bins];
    for (lag, bpm) in bpms.iter_mut().enumerate().skip(1) {
        *bpm = 60.0 * sample_rate as f64 / (hop_length as f64 * lag as f64);
    }
    bpms
}

/// Pad with linear ramps from zero up to the first value and from the last
/// value back down to zero, `pad` samples per side.
fn linear_ramp_pad(x: &[f32], pad: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(x.len() + 2 * pad);
    let (first, last) = match (x.first(), x.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => (0.0, 0.0),
    };
    let p = pad as f32;
    out.extend((0..pad).map(|i| first * i as f32 / p));
    out.extend_from_slice(x);
    out.extend((0..pad).map(|j| last * (pad - 1 - j) as f32 / p));
    out
}

/// FFT autocorrelation engine for fixed-length windows.
struct Autocorrelator {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl Autocorrelator {
    fn new(len: usize) -> Self {
        let n = (2 * len).saturating_sub(1).max(1).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(n),
            ifft: planner.plan_fft_inverse(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
        }
    }

    /// Writes lags `0..out.len()` of the autocorrelation of `frame`.
    fn process(&mut self, frame: &[f32], out: &mut [f32]) {
        let n = self.buffer.len();
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(frame.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft.process(&mut self.buffer);
        for v in self.buffer.iter_mut() {
            *v = Complex::new(v.norm_sqr(), 0.0);
        }
        self.ifft.process(&mut self.buffer);
        for (o, v) in out.iter_mut().zip(&self.buffer) {
            *o = v.re / n as f32;
        }
    }
}

/// Local autocorrelation tempogram, shape `(win_length, envelope.len())`.
///
/// Window `t` is centered on envelope frame `t`; each column is scaled so its
/// largest lag is 1.0.
pub fn tempogram(envelope: &[f32], win_length: usize) -> Array2<f32> {
    let n = envelope.len();
    let mut out = Array2::<f32>::zeros((win_length, n));
    if n == 0 || win_length == 0 {
        return out;
    }

    let padded = linear_ramp_pad(envelope, win_length / 2);
    let window = hann_window(win_length);
    let mut engine = Autocorrelator::new(win_length);
    let mut frame = vec![0.0f32; win_length];
    let mut lags = vec![0.0f32; win_length];

    for t in 0..n {
        let Some(segment) = padded.get(t..t + win_length) else {
            break;
        };
        for ((f, &s), &w) in frame.iter_mut().zip(segment).zip(&window) {
            *f = s * w;
        }
        engine.process(&frame, &mut lags);

        let max = lags.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        let scale = if max > f32::MIN_POSITIVE { max } else { 1.0 };
        for (lag, &v) in lags.iter().enumerate() {
            out[(lag, t)] = v / scale;
        }
    }

    out
}

/// Parameters of the tempo prior and search range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoParams {
    pub start_bpm: f64,
    pub std_bpm: f64,
    /// Autocorrelation window in seconds.
    pub ac_size: f64,
    pub max_tempo: f64,
}

/// Global tempo in BPM of an onset strength envelope.
///
/// The autocorrelation tempogram is averaged over time and weighted by a
/// log-normal prior around `start_bpm`; tempi at or above `max_tempo` are
/// never chosen.
pub fn estimate_tempo(
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    params: &TempoParams,
) -> f64 {
    let win_length = ((params.ac_size * sample_rate as f64 / hop_length as f64).floor() as usize).max(1);
    let tg = tempogram(envelope, win_length);
    let mean: Array1<f32> = tg
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(win_length));

    let bpms = tempo_frequencies(win_length, hop_length, sample_rate);
    let first_allowed = bpms
        .iter()
        .position(|&b| b < params.max_tempo)
        .unwrap_or(0);

    let mut best = (f64::NEG_INFINITY, 0usize);
    for (lag, &bpm) in bpms.iter().enumerate().skip(first_allowed) {
        let prior = -0.5 * ((bpm.log2() - params.start_bpm.log2()) / params.std_bpm).powi(2);
        let score = (1e6 * (mean[lag] as f64).max(0.0)).ln_1p() + prior;
        if score > best.0 {
            best = (score, lag);
        }
    }

    match bpms.get(best.1) {
        Some(&bpm) if bpm.is_finite() => bpm,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_frequencies() {
        let bpms = tempo_frequencies(4, 1024, 22050);
        assert!(bpms[0].is_infinite());
        assert!((bpms[1] - 1291.99).abs() < 0.01);
        assert!((bpms[2] - bpms[1] / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_ramp_pad() {
        let padded = linear_ramp_pad(&[4.0, 8.0], 4);
        assert_eq!(padded, vec![0.0, 1.0, 2.0, 3.0, 4.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn test_tempogram_shape_and_normalization() {
        let mut env = vec![0.0f32; 200];
        for i in (0..200).step_by(10) {
            env[i] = 1.0;
        }
        let tg = tempogram(&env, 64);
        assert_eq!(tg.dim(), (64, 200));
        for column in tg.columns() {
            let max = column.iter().fold(0.0f32, |m, v| m.max(v.abs()));
            assert!(max == 0.0 || (max - 1.0).abs() < 1e-5);
        }
        // Periodicity of 10 frames shows up as a strong lag-10 peak.
        assert!(tg[(10, 100)] > tg[(5, 100)]);
    }

    #[test]
    fn test_estimate_tempo_of_pulse_train() {
        // One pulse every 11 frames at 22050 / 1024 frames per second.
        let mut env = vec![0.0f32; 600];
        for i in (0..600).step_by(11) {
            env[i] = 1.0;
        }
        let params = TempoParams {
            start_bpm: 120.0,
            std_bpm: 1.0,
            ac_size: 8.0,
            max_tempo: 320.0,
        };
        let bpm = estimate_tempo(&env, 22050, 1024, &params);
        let expected = 60.0 * 22050.0 / (1024.0 * 11.0);
        assert!((bpm - expected).abs() < 1.0, "bpm {bpm}");
    }
}
