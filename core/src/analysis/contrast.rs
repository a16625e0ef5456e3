//! Octave-band spectral contrast.

use ndarray::Array2;

use super::mel::{power_to_db, AMIN, TOP_DB};
use super::AnalysisError;

/// Band edges in Hz: `[0, fmin, 2*fmin, ..., fmin * 2^n_bands]`.
pub fn contrast_band_edges(fmin: f32, n_bands: usize) -> Vec<f32> {
    let mut octa = vec![0.0f32; n_bands + 2];
    for (i, edge) in octa.iter_mut().skip(1).enumerate() {
        *edge = fmin * 2f32.powi(i as i32);
    }
    octa
}

/// Spectral contrast `(n_bands + 1, frames)` from a magnitude spectrogram.
///
/// For every band the mean of the lowest `quantile` share of bins is the
/// valley and the mean of the highest share is the peak; the result is
/// `dB(peak) - dB(valley)`.
pub fn spectral_contrast(
    magnitude: &Array2<f32>,
    sample_rate: u32,
    n_fft: usize,
    n_bands: usize,
    fmin: f32,
    quantile: f32,
) -> Result<Array2<f32>, AnalysisError> {
    if fmin <= 0.0 {
        return Err(AnalysisError::invalid("contrast_fmin", fmin, "must be > 0"));
    }
    if n_bands == 0 {
        return Err(AnalysisError::invalid("contrast_bands", n_bands, "must be > 0"));
    }
    if !(0.0..1.0).contains(&quantile) || quantile == 0.0 {
        return Err(AnalysisError::invalid(
            "contrast_quantile",
            quantile,
            "must be in (0, 1)",
        ));
    }

    let nyquist = sample_rate as f32 / 2.0;
    let octa = contrast_band_edges(fmin, n_bands);
    if let Some(edge) = octa[..octa.len() - 1].iter().find(|&&f| f >= nyquist) {
        return Err(AnalysisError::invalid(
            "contrast_bands",
            n_bands,
            format!("band edge {edge} Hz reaches the Nyquist frequency {nyquist} Hz"),
        ));
    }

    let (n_bins, n_frames) = magnitude.dim();
    let freqs: Vec<f32> = (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mut valley = Array2::<f32>::zeros((n_bands + 1, n_frames));
    let mut peak = Array2::<f32>::zeros((n_bands + 1, n_frames));
    let mut column = Vec::with_capacity(n_bins);

    for k in 0..=n_bands {
        let (f_low, f_high) = (octa[k], octa[k + 1]);

        let mut band: Vec<usize> = (0..n_bins)
            .filter(|&i| freqs[i] >= f_low && freqs[i] <= f_high)
            .collect();
        let Some(&first) = band.first() else {
            continue;
        };

        if k > 0 && first > 0 {
            band.insert(0, first - 1);
        }
        if k == n_bands {
            let last = band[band.len() - 1];
            band.extend(last + 1..n_bins);
        }

        // Quantile counts the whole band, the statistics skip its top bin.
        let q = ((quantile * band.len() as f32).round_ties_even() as usize).max(1);
        if k < n_bands {
            band.pop();
        }
        if band.is_empty() {
            continue;
        }
        let q = q.min(band.len());

        for t in 0..n_frames {
            column.clear();
            column.extend(band.iter().map(|&i| magnitude[(i, t)]));
            column.sort_by(f32::total_cmp);

            valley[(k, t)] = column[..q].iter().sum::<f32>() / q as f32;
            peak[(k, t)] = column[column.len() - q..].iter().sum::<f32>() / q as f32;
        }
    }

    let peak_db = power_to_db(&peak, AMIN, Some(TOP_DB));
    let valley_db = power_to_db(&valley, AMIN, Some(TOP_DB));
    Ok(peak_db - valley_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stft::Spectrogram;
    use crate::audio::synth::{generate_sine, generate_white_noise};

    #[test]
    fn test_band_edges() {
        let edges = contrast_band_edges(200.0, 6);
        assert_eq!(edges, vec![0.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0, 12800.0]);
    }

    #[test]
    fn test_shape_and_tonal_band_has_more_contrast() {
        let sr = 22050;
        let tone = generate_sine(1000.0, sr, 1.0, 0.8);
        let noise = generate_white_noise(sr, 1.0, 0.8, 3);

        let tone_spec = Spectrogram::compute(&tone, sr, 2048, 1024);
        let noise_spec = Spectrogram::compute(&noise, sr, 2048, 1024);

        let tone_c = spectral_contrast(&tone_spec.magnitude, sr, 2048, 6, 200.0, 0.02).unwrap();
        let noise_c = spectral_contrast(&noise_spec.magnitude, sr, 2048, 6, 200.0, 0.02).unwrap();
        assert_eq!(tone_c.dim(), (7, 22));

        // 1 kHz falls in the 800-1600 Hz band (row 3).
        assert!(tone_c[(3, 10)] > noise_c[(3, 10)]);
    }

    #[test]
    fn test_band_above_nyquist_is_rejected() {
        let magnitude = Array2::<f32>::zeros((257, 4));
        let err = spectral_contrast(&magnitude, 8000, 512, 6, 200.0, 0.02).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn test_silence_has_zero_contrast() {
        let magnitude = Array2::<f32>::zeros((1025, 3));
        let c = spectral_contrast(&magnitude, 22050, 2048, 6, 200.0, 0.02).unwrap();
        assert!(c.iter().all(|&v| v == 0.0));
    }
}
