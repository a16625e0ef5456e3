//! Synthetic test signals.
//!
//! Deterministic tones, clicks and noise used by tests, benches and the demo
//! example, plus a minimal 16-bit PCM WAV writer so the signals can be fed
//! through the file loader and FFmpeg.

use std::f32::consts::PI;
use std::io::{self, Write};
use std::path::Path;

/// Generate a sine wave.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Generate uniform white noise in `-amplitude..amplitude`.
///
/// Uses a 64-bit LCG so the same seed always yields the same signal.
pub fn generate_white_noise(
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
    seed: u64,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let mut state = seed;

    (0..num_samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            // Top 24 bits give an exactly representable f32 fraction.
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            amplitude * (unit * 2.0 - 1.0)
        })
        .collect()
}

/// Generate a metronome click track.
///
/// Each click is a 10 ms decaying sine burst at `click_freq`, placed every
/// `60 / bpm` seconds starting at t = 0.
pub fn generate_click_track(
    bpm: f32,
    sample_rate: u32,
    duration: f32,
    click_freq: f32,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let mut samples = vec![0.0; num_samples];

    for start in click_positions(bpm, sample_rate, duration) {
        add_click(&mut samples, start, sample_rate, click_freq);
    }

    samples
}

/// Sample offsets of the clicks produced by [`generate_click_track`].
pub fn click_positions(bpm: f32, sample_rate: u32, duration: f32) -> Vec<usize> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;
    if samples_per_beat == 0 {
        return Vec::new();
    }
    (0..num_samples).step_by(samples_per_beat).collect()
}

fn add_click(samples: &mut [f32], start: usize, sample_rate: u32, freq: f32) {
    let click_len = (sample_rate as f32 * 0.01) as usize;
    let end = (start + click_len).min(samples.len());

    for (i, sample) in samples[start..end].iter_mut().enumerate() {
        let t = i as f32 / sample_rate as f32;
        let envelope = (1.0 - i as f32 / click_len as f32).powi(2);
        *sample += envelope * (2.0 * PI * freq * t).sin();
    }
}

/// Write mono samples as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);

    let data_size = (samples.len() * 2) as u32;

    file.write_all(b"RIFF")?;
    file.write_all(&(36 + data_size).to_le_bytes())?;
    file.write_all(b"WAVE")?;

    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?; // PCM
    file.write_all(&1u16.to_le_bytes())?; // mono
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&(sample_rate * 2).to_le_bytes())?;
    file.write_all(&2u16.to_le_bytes())?;
    file.write_all(&16u16.to_le_bytes())?;

    file.write_all(b"data")?;
    file.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        file.write_all(&value.to_le_bytes())?;
    }

    file.flush()
}
