//! Spectral-flux onset strength and onset detection.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::peak::{peak_pick, PeakPickParams};

/// Reduction applied across mel bands when computing onset strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Mean,
    Median,
}

impl Aggregate {
    fn apply(self, values: &mut [f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Aggregate::Mean => values.iter().sum::<f32>() / values.len() as f32,
            Aggregate::Median => {
                values.sort_by(f32::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    0.5 * (values[mid - 1] + values[mid])
                } else {
                    values[mid]
                }
            }
        }
    }
}

/// Onset strength envelope from a dB mel spectrogram `(n_mels, frames)`.
///
/// Positive first differences along time are aggregated across bands. The
/// envelope is shifted right by `1 + n_fft / (2 * hop_length)` frames so that
/// it lines up with centered STFT frames, and has the same length as the input.
pub fn onset_strength(
    mel_db: &Array2<f32>,
    n_fft: usize,
    hop_length: usize,
    aggregate: Aggregate,
) -> Vec<f32> {
    let (n_mels, n_frames) = mel_db.dim();
    let lag = 1;
    let pad = lag + n_fft / (2 * hop_length.max(1));

    let mut env = vec![0.0f32; n_frames];
    let mut band_flux = vec![0.0f32; n_mels];
    for (t, slot) in env.iter_mut().enumerate().skip(pad) {
        // Flux from frame `src - lag` to frame `src`.
        let src = t - pad + lag;
        for (m, flux) in band_flux.iter_mut().enumerate() {
            *flux = (mel_db[(m, src)] - mel_db[(m, src - lag)]).max(0.0);
        }
        *slot = aggregate.apply(&mut band_flux);
    }

    env
}

/// Peak-picking windows derived from the frame rate, in frames.
///
/// `pre_avg` and `post_avg` span 100 ms, `wait` spans 30 ms.
pub fn onset_peak_params(
    sample_rate: u32,
    hop_length: usize,
    pre_max: usize,
    post_max: usize,
    delta: f32,
) -> PeakPickParams {
    let frames = |seconds: f64| (seconds * sample_rate as f64 / hop_length as f64).floor() as usize;
    PeakPickParams {
        pre_max,
        post_max,
        pre_avg: frames(0.10),
        post_avg: frames(0.10) + 1,
        delta,
        wait: frames(0.03),
    }
}

/// Onset frame indices of an onset strength envelope.
///
/// The envelope is normalized to `[0, 1]` before peak picking. An envelope
/// without any energy has no onsets.
pub fn onset_detect(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    if envelope.iter().all(|&v| v == 0.0) {
        return Vec::new();
    }

    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let shifted: Vec<f32> = envelope.iter().map(|&v| v - min).collect();
    let max = shifted.iter().copied().fold(0.0f32, f32::max);
    let scale = max + f32::MIN_POSITIVE;
    let normalized: Vec<f32> = shifted.iter().map(|&v| v / scale).collect();

    peak_pick(&normalized, params)
}
