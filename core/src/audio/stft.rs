//! Short-time Fourier transform using RustFFT.
//!
//! Frames are centered: the signal is zero-padded by `n_fft / 2` on both
//! sides, so frame `t` is centered on sample `t * hop_length` and a signal of
//! `n` samples yields `1 + n / hop_length` frames.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

/// Periodic Hann window of length `n` (the FFT-friendly variant).
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Frequency in Hz of each STFT bin, `0..=sample_rate / 2`.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| (k as f64 * sample_rate as f64 / n_fft as f64) as f32)
        .collect()
}

/// Reusable STFT engine.
pub struct Stft {
    planner: FftPlanner<f32>,
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
}

impl Stft {
    /// Create an STFT with a periodic Hann window of length `n_fft`.
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        assert!(n_fft > 0, "n_fft must be positive");
        assert!(hop_length > 0, "hop_length must be positive");

        Self {
            planner: FftPlanner::new(),
            n_fft,
            hop_length,
            window: hann_window(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of frequency bins per frame (`n_fft / 2 + 1`).
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples.
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Magnitude spectrogram with shape `(num_bins, num_frames)`.
    pub fn magnitude(&mut self, samples: &[f32]) -> Array2<f32> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = self.num_frames(samples.len());
        let n_bins = self.num_bins();
        let fft = self.planner.plan_fft_forward(self.n_fft);

        let mut out = Array2::<f32>::zeros((n_bins, n_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for t in 0..n_frames {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.n_fft];
            for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }

            fft.process(&mut buffer);

            for (k, value) in buffer[..n_bins].iter().enumerate() {
                out[(k, t)] = value.norm();
            }
        }

        out
    }
}

/// Magnitude spectrogram of a signal together with its framing parameters.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// `|STFT|`, shape `(n_fft / 2 + 1, frames)`.
    pub magnitude: Array2<f32>,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Spectrogram {
    pub fn compute(samples: &[f32], sample_rate: u32, n_fft: usize, hop_length: usize) -> Self {
        let magnitude = Stft::new(n_fft, hop_length).magnitude(samples);
        Self {
            magnitude,
            sample_rate,
            n_fft,
            hop_length,
        }
    }

    /// Power spectrogram, `|STFT|^2`.
    pub fn power(&self) -> Array2<f32> {
        self.magnitude.mapv(|m| m * m)
    }

    pub fn num_bins(&self) -> usize {
        self.magnitude.nrows()
    }

    pub fn num_frames(&self) -> usize {
        self.magnitude.ncols()
    }

    pub fn frequencies(&self) -> Vec<f32> {
        fft_frequencies(self.sample_rate, self.n_fft)
    }
}
