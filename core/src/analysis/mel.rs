//! Mel scale, mel filterbank and dB conversion.
//!
//! Uses the Slaney mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalized triangular filters.

use ndarray::Array2;

/// Floor applied before taking logarithms in [`power_to_db`].
pub const AMIN: f32 = 1e-10;
/// Dynamic range kept by [`power_to_db`], in dB below the maximum.
pub const TOP_DB: f32 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to mels (Slaney scale).
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert mels to Hz (Slaney scale).
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n_mels + 2` band edges evenly spaced on the mel scale.
fn mel_band_edges(n_mels: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let lo = hz_to_mel(fmin);
    let hi = hz_to_mel(fmax);
    let n = n_mels + 2;
    (0..n)
        .map(|i| mel_to_hz(lo + (hi - lo) * i as f64 / (n - 1) as f64))
        .collect()
}

/// Mel filterbank with shape `(n_mels, n_fft / 2 + 1)`.
///
/// Each triangular filter is scaled by `2 / bandwidth` so that filters carry
/// equal energy regardless of their width.
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();
    let edges = mel_band_edges(n_mels, fmin as f64, fmax as f64);

    let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[(m, k)] = (w * enorm) as f32;
        }
    }

    weights
}

/// Convert a power spectrogram to dB relative to 1.0.
///
/// Values are floored at `amin` before the log; with `top_db` the result is
/// also clipped to `max - top_db`.
pub fn power_to_db(power: &Array2<f32>, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let mut db = power.mapv(|p| 10.0 * p.max(amin).log10());

    if let Some(top) = top_db {
        let max_db = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max_db - top;
        db.mapv_inplace(|v| v.max(floor));
    }

    db
}
