//! Audio loading and signal primitives.
//!
//! This module provides:
//! - Audio file loading via Symphonia (WAV, MP3, FLAC, AAC)
//! - Downmixing and resampling to the analysis rate
//! - Centered short-time Fourier transform via RustFFT
//! - Synthetic test signals

pub mod loader;
pub mod stft;
pub mod synth;

// Re-export commonly used types
pub use loader::{load_audio, load_mono, resample, AudioData, AudioError, DEFAULT_SAMPLE_RATE};
pub use stft::{fft_frequencies, hann_window, Spectrogram, Stft};
pub use synth::{
    click_positions, generate_click_track, generate_sine, generate_white_noise, write_wav,
};
