//! STFT chromagram.
//!
//! Each frequency bin is spread over the chroma classes with a Gaussian bump
//! around its fractional pitch class, weighted by a Gaussian over octaves
//! centered on octave 5 (two octaves wide). Rows start at C.
//!
//! Unless a tuning offset is given, it is estimated from the spectral peaks
//! between 150 Hz and 4 kHz before the filterbank is built.

use ndarray::Array2;

const CENTER_OCTAVE: f64 = 5.0;
const OCTAVE_WIDTH: f64 = 2.0;

const PITCH_FMIN: f64 = 150.0;
const PITCH_FMAX: f64 = 4000.0;
const PITCH_THRESHOLD: f32 = 0.1;
const TUNING_RESOLUTION: f64 = 0.01;

/// Octave number of each frequency, with A440 shifted by `tuning` fractional bins.
fn hz_to_octs(freq: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    let a440 = 440.0 * 2f64.powf(tuning / bins_per_octave as f64);
    (freq / (a440 / 16.0)).log2()
}

/// Chroma filterbank with shape `(n_chroma, n_fft / 2 + 1)`.
pub fn chroma_filterbank(sample_rate: u32, n_fft: usize, n_chroma: usize, tuning: f32) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let mut wts = Array2::<f32>::zeros((n_chroma, n_bins));
    if n_fft < 2 || n_chroma == 0 {
        return wts;
    }

    let n_chroma_f = n_chroma as f64;

    // Fractional chroma bin of each FFT bin; DC gets a placeholder 1.5 octaves below bin 1.
    let mut frqbins: Vec<f64> = (1..n_fft)
        .map(|k| {
            let freq = k as f64 * sample_rate as f64 / n_fft as f64;
            n_chroma_f * hz_to_octs(freq, tuning as f64, n_chroma)
        })
        .collect();
    frqbins.insert(0, frqbins[0] - 1.5 * n_chroma_f);

    let bin_width = |k: usize| -> f64 {
        if k + 1 < frqbins.len() {
            (frqbins[k + 1] - frqbins[k]).max(1.0)
        } else {
            1.0
        }
    };

    let half = (n_chroma_f / 2.0).round();
    let mut raw = vec![vec![0.0f64; n_bins]; n_chroma];
    for (c, row) in raw.iter_mut().enumerate() {
        for (k, slot) in row.iter_mut().enumerate() {
            let d = (frqbins[k] - c as f64 + half + 10.0 * n_chroma_f).rem_euclid(n_chroma_f) - half;
            *slot = (-0.5 * (2.0 * d / bin_width(k)).powi(2)).exp();
        }
    }

    for k in 0..n_bins {
        let norm = raw.iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
        let octave = frqbins[k] / n_chroma_f;
        let octave_weight = (-0.5 * ((octave - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();

        for c in 0..n_chroma {
            let normalized = if norm > f64::MIN_POSITIVE { raw[c][k] / norm } else { raw[c][k] };
            // Rows are computed A-based; shift by three semitones so row 0 is C.
            let target = (c + n_chroma - 3 * (n_chroma / 12)) % n_chroma;
            wts[(target, k)] = (normalized * octave_weight) as f32;
        }
    }

    wts
}

/// Divide each column by its maximum absolute value. Columns that are
/// effectively zero are left untouched.
pub(crate) fn normalize_columns_max(matrix: &mut Array2<f32>) {
    for mut column in matrix.columns_mut() {
        let max = column.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        if max > f32::MIN_POSITIVE {
            column.mapv_inplace(|v| v / max);
        }
    }
}

/// Interpolated spectral peaks of every frame as `(frequency, magnitude)`.
///
/// A bin is a peak when it is a local maximum above `PITCH_THRESHOLD` times
/// the frame maximum; its frequency is refined by parabolic interpolation.
fn spectral_peaks(power: &Array2<f32>, sample_rate: u32, n_fft: usize) -> Vec<(f64, f64)> {
    let n_bins = power.nrows();
    let mut peaks = Vec::new();
    if n_bins < 3 {
        return peaks;
    }
    let bin_hz = sample_rate as f64 / n_fft as f64;

    for column in power.columns() {
        let frame_max = column.iter().copied().fold(0.0f32, f32::max);
        let floor = PITCH_THRESHOLD * frame_max;
        let gated = |k: usize| if column[k] > floor { column[k] as f64 } else { 0.0 };

        for k in 1..n_bins - 1 {
            let freq = k as f64 * bin_hz;
            if !(PITCH_FMIN..PITCH_FMAX).contains(&freq) {
                continue;
            }
            let (prev, cur, next) = (gated(k - 1), gated(k), gated(k + 1));
            if !(cur > prev && cur >= next) {
                continue;
            }

            let (a, b, c) = (column[k - 1] as f64, column[k] as f64, column[k + 1] as f64);
            let avg = 0.5 * (c - a);
            let curvature = 2.0 * b - a - c;
            let shift = if curvature.abs() < f64::MIN_POSITIVE {
                0.0
            } else {
                avg / curvature
            };
            peaks.push(((k as f64 + shift) * bin_hz, b + 0.5 * avg * shift));
        }
    }
    peaks
}

/// Most common deviation of `frequencies` from the A440 grid, in fractional
/// bins within `[-0.5, 0.5)`.
pub fn pitch_tuning(frequencies: &[f64], bins_per_octave: usize) -> f32 {
    let n_slots = (1.0 / TUNING_RESOLUTION).ceil() as usize;
    let mut counts = vec![0usize; n_slots];
    for &freq in frequencies.iter().filter(|&&f| f > 0.0) {
        let bin = bins_per_octave as f64 * hz_to_octs(freq, 0.0, bins_per_octave);
        let mut residual = bin.rem_euclid(1.0);
        if residual >= 0.5 {
            residual -= 1.0;
        }
        let slot = ((residual + 0.5) / TUNING_RESOLUTION).floor() as usize;
        counts[slot.min(n_slots - 1)] += 1;
    }

    if counts.iter().all(|&c| c == 0) {
        return 0.0;
    }
    // First slot wins ties.
    let best = counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
    (-0.5 + best.0 as f64 * TUNING_RESOLUTION) as f32
}

/// Tuning offset of a power spectrogram in fractional chroma bins.
///
/// Peaks at or above the median peak magnitude vote for their deviation
/// from equal temperament at A440.
pub fn estimate_tuning(power: &Array2<f32>, sample_rate: u32, n_fft: usize, bins_per_octave: usize) -> f32 {
    let peaks = spectral_peaks(power, sample_rate, n_fft);
    if peaks.is_empty() {
        return 0.0;
    }

    let mut magnitudes: Vec<f64> = peaks.iter().map(|&(_, m)| m).collect();
    magnitudes.sort_by(f64::total_cmp);
    let mid = magnitudes.len() / 2;
    let threshold = if magnitudes.len() % 2 == 0 {
        0.5 * (magnitudes[mid - 1] + magnitudes[mid])
    } else {
        magnitudes[mid]
    };

    let frequencies: Vec<f64> = peaks
        .iter()
        .filter(|&&(_, m)| m >= threshold)
        .map(|&(f, _)| f)
        .collect();
    pitch_tuning(&frequencies, bins_per_octave)
}

/// Chromagram `(n_chroma, frames)` from a power spectrogram.
///
/// `tuning` of `None` estimates the offset from `power`. Every frame is
/// scaled so its strongest pitch class is 1.0.
pub fn chroma_from_power(
    power: &Array2<f32>,
    sample_rate: u32,
    n_fft: usize,
    n_chroma: usize,
    tuning: Option<f32>,
) -> Array2<f32> {
    let tuning = tuning.unwrap_or_else(|| {
        let estimate = estimate_tuning(power, sample_rate, n_fft, n_chroma);
        log::debug!("Estimated chroma tuning: {:+.2} bins", estimate);
        estimate
    });
    let fb = chroma_filterbank(sample_rate, n_fft, n_chroma, tuning);
    let mut chroma = fb.dot(power);
    normalize_columns_max(&mut chroma);
    chroma
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stft::Spectrogram;
    use crate::audio::synth::generate_sine;

    #[test]
    fn test_filterbank_shape() {
        let fb = chroma_filterbank(22050, 2048, 12, 0.0);
        assert_eq!(fb.dim(), (12, 1025));
        assert!(fb.iter().all(|w| w.is_finite() && *w >= 0.0));
    }

    #[test]
    fn test_a440_maps_to_pitch_class_a() {
        let sr = 22050;
        let samples = generate_sine(440.0, sr, 1.0, 0.8);
        let spec = Spectrogram::compute(&samples, sr, 2048, 1024);
        let chroma = chroma_from_power(&spec.power(), sr, 2048, 12, Some(0.0));

        let column = chroma.column(10);
        let strongest = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(strongest, 9, "C=0 .. A=9");
        assert!((column[9] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_frames_stay_zero() {
        let power = Array2::<f32>::zeros((1025, 3));
        let chroma = chroma_from_power(&power, 22050, 2048, 12, None);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pitch_tuning_histogram() {
        assert_eq!(pitch_tuning(&[], 12), 0.0);
        assert!(pitch_tuning(&[220.0, 440.0, 880.0], 12).abs() < 0.015);

        // 25 cents sharp of A
        let sharp = 440.0 * 2f64.powf(0.25 / 12.0);
        let tuning = pitch_tuning(&[sharp, sharp * 2.0, 300.0], 12);
        assert!((tuning - 0.25).abs() < 0.015, "tuning {tuning}");
    }

    #[test]
    fn test_estimate_tuning_of_detuned_tone() {
        let sr = 22050;
        let power = |freq: f32| {
            let samples = generate_sine(freq, sr, 1.0, 0.8);
            Spectrogram::compute(&samples, sr, 2048, 1024).power()
        };

        assert!(estimate_tuning(&power(440.0), sr, 2048, 12).abs() < 0.1);
        // A4 + 45 cents
        let tuning = estimate_tuning(&power(451.6), sr, 2048, 12);
        assert!((tuning - 0.45).abs() < 0.1, "tuning {tuning}");
        assert_eq!(estimate_tuning(&Array2::zeros((1025, 4)), sr, 2048, 12), 0.0);
    }

    #[test]
    fn test_estimated_tuning_centers_detuned_tone() {
        let sr = 22050;
        let samples = generate_sine(451.6, sr, 1.0, 0.8);
        let power = Spectrogram::compute(&samples, sr, 2048, 1024).power();

        let fixed = chroma_from_power(&power, sr, 2048, 12, Some(0.0));
        let estimated = chroma_from_power(&power, sr, 2048, 12, None);
        let (a, a_sharp) = (estimated[(9, 10)], estimated[(10, 10)]);

        assert!((a - 1.0).abs() < 1e-6);
        assert!(a_sharp < 0.5, "A# still at {a_sharp}");
        assert!(a_sharp < fixed[(10, 10)]);
    }
}
