//! Per-frame spectral descriptors: centroid, rolloff and zero-crossing rate.

use ndarray::Array2;

/// Values at or below this magnitude count as zero when looking for sign changes.
const ZERO_CROSSING_THRESHOLD: f32 = 1e-10;

/// Magnitude-weighted mean frequency of each frame, shape `(1, frames)`.
///
/// Silent frames have centroid 0.
pub fn spectral_centroid(magnitude: &Array2<f32>, freqs: &[f32]) -> Array2<f32> {
    let n_frames = magnitude.ncols();
    let mut out = Array2::<f32>::zeros((1, n_frames));

    for (t, column) in magnitude.columns().into_iter().enumerate() {
        let total: f64 = column.iter().map(|&m| m as f64).sum();
        if total <= f64::MIN_POSITIVE {
            continue;
        }
        let weighted: f64 = column
            .iter()
            .zip(freqs)
            .map(|(&m, &f)| m as f64 * f as f64)
            .sum();
        out[(0, t)] = (weighted / total) as f32;
    }

    out
}

/// Frequency below which `roll_percent` of each frame's magnitude lies,
/// shape `(1, frames)`.
pub fn spectral_rolloff(magnitude: &Array2<f32>, freqs: &[f32], roll_percent: f32) -> Array2<f32> {
    let n_frames = magnitude.ncols();
    let mut out = Array2::<f32>::zeros((1, n_frames));

    for (t, column) in magnitude.columns().into_iter().enumerate() {
        let total: f64 = column.iter().map(|&m| m as f64).sum();
        let threshold = roll_percent as f64 * total;

        let mut cumulative = 0.0f64;
        for (&m, &f) in column.iter().zip(freqs) {
            cumulative += m as f64;
            if cumulative >= threshold {
                out[(0, t)] = f;
                break;
            }
        }
    }

    out
}

/// Fraction of sign changes per frame, shape `(1, frames)`.
///
/// Frames are `frame_length` long and centered on `t * hop_length`; the
/// signal is edge-padded by `frame_length / 2` on both sides.
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop_length: usize) -> Array2<f32> {
    if samples.is_empty() || frame_length == 0 || hop_length == 0 {
        return Array2::zeros((1, 0));
    }

    let pad = frame_length / 2;
    let first = samples[0];
    let last = samples[samples.len() - 1];
    let negative: Vec<bool> = std::iter::repeat(first)
        .take(pad)
        .chain(samples.iter().copied())
        .chain(std::iter::repeat(last).take(pad))
        .map(|x| x < -ZERO_CROSSING_THRESHOLD)
        .collect();

    let n_frames = if negative.len() >= frame_length {
        1 + (negative.len() - frame_length) / hop_length
    } else {
        0
    };

    let mut out = Array2::<f32>::zeros((1, n_frames));
    for t in 0..n_frames {
        let frame = &negative[t * hop_length..t * hop_length + frame_length];
        let crossings = frame.windows(2).filter(|w| w[0] != w[1]).count();
        out[(0, t)] = crossings as f32 / frame_length as f32;
    }

    out
}
