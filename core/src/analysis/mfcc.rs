//! Mel-frequency cepstral coefficients.

use ndarray::Array2;

/// Orthonormal DCT-II of `x`, keeping the first `n_out` coefficients.
pub fn dct_ortho(x: &[f32], n_out: usize) -> Vec<f32> {
    let n = x.len();
    if n == 0 {
        return vec![0.0; n_out];
    }

    let scale_0 = (1.0 / n as f64).sqrt();
    let scale_k = (2.0 / n as f64).sqrt();

    (0..n_out)
        .map(|k| {
            let sum: f64 = x
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let angle = std::f64::consts::PI * k as f64 * (2 * i + 1) as f64
                        / (2 * n) as f64;
                    v as f64 * angle.cos()
                })
                .sum();
            let scale = if k == 0 { scale_0 } else { scale_k };
            (sum * scale) as f32
        })
        .collect()
}

/// MFCCs from a dB-scaled mel spectrogram `(n_mels, frames)`.
///
/// Returns `(n_mfcc, frames)`.
pub fn mfcc_from_mel_db(mel_db: &Array2<f32>, n_mfcc: usize) -> Array2<f32> {
    let n_frames = mel_db.ncols();
    let mut out = Array2::<f32>::zeros((n_mfcc, n_frames));

    for (t, column) in mel_db.columns().into_iter().enumerate() {
        let coeffs = dct_ortho(&column.to_vec(), n_mfcc);
        for (k, c) in coeffs.into_iter().enumerate() {
            out[(k, t)] = c;
        }
    }

    out
}
