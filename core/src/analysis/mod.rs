//! Keypoint analysis of a mono signal.
//!
//! This module provides:
//! - Stacked timbre/pitch features (MFCC, chroma, spectral contrast)
//! - Onset strength and onset detection
//! - Tempo estimation and dynamic-programming beat tracking
//! - Autocorrelation tempogram
//! - Spectral centroid, rolloff and zero-crossing rate
//!
//! All features share one framing: a centered STFT with `hop_length`
//! samples between frames, so column `t` of every matrix describes the
//! audio around `t * hop_length / sample_rate` seconds.

pub mod beat;
pub mod chroma;
pub mod contrast;
pub mod mel;
pub mod mfcc;
pub mod onset;
pub mod peak;
pub mod spectral;
pub mod tempogram;

use std::fmt::{self, Display, Write as _};

use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::stft::Spectrogram;
use onset::Aggregate;
use tempogram::TempoParams;

pub use beat::track_beats;
pub use onset::{onset_detect, onset_strength};
pub use tempogram::{estimate_tempo, tempo_frequencies};

/// Errors that can occur during analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Audio signal is empty")]
    EmptyAudio,

    #[error("Audio signal contains non-finite samples")]
    NonFiniteAudio,

    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Feature shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl AnalysisError {
    pub(crate) fn invalid(name: &'static str, value: impl Display, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Analysis parameters.
///
/// Defaults reproduce the reference keypoint script: 22050 Hz mono,
/// `n_fft` 2048 with `hop_length` 1024 for every feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Resample to this rate before analysis; `None` keeps the file's rate.
    pub target_sample_rate: Option<u32>,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub n_chroma: usize,
    /// Chroma tuning offset in fractional bins; `None` estimates it per track.
    pub tuning: Option<f32>,
    pub contrast_bands: usize,
    pub contrast_fmin: f32,
    pub contrast_quantile: f32,
    pub roll_percent: f32,
    pub zcr_frame_length: usize,
    pub onset_pre_max: usize,
    pub onset_post_max: usize,
    pub onset_delta: f32,
    pub start_bpm: f64,
    pub tempo_std_bpm: f64,
    /// Tempo autocorrelation window in seconds.
    pub tempo_ac_size: f64,
    pub max_tempo: f64,
    pub tightness: f64,
    /// Tempogram window in onset frames.
    pub tempogram_win_length: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: Some(crate::audio::DEFAULT_SAMPLE_RATE),
            n_fft: 2048,
            hop_length: 1024,
            n_mfcc: 13,
            n_mels: 128,
            n_chroma: 12,
            tuning: None,
            contrast_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            roll_percent: 0.85,
            zcr_frame_length: 2048,
            onset_pre_max: 5,
            onset_post_max: 5,
            onset_delta: 0.2,
            start_bpm: 60.0,
            tempo_std_bpm: 1.0,
            tempo_ac_size: 8.0,
            max_tempo: 320.0,
            tightness: 100.0,
            tempogram_win_length: 384,
        }
    }
}

impl AnalysisConfig {
    /// Check parameters that would otherwise panic or produce garbage.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        fn positive(name: &'static str, value: usize) -> Result<(), AnalysisError> {
            if value == 0 {
                return Err(AnalysisError::invalid(name, value, "must be > 0"));
            }
            Ok(())
        }

        positive("n_fft", self.n_fft)?;
        positive("hop_length", self.hop_length)?;
        positive("n_mels", self.n_mels)?;
        positive("n_chroma", self.n_chroma)?;
        positive("zcr_frame_length", self.zcr_frame_length)?;
        positive("tempogram_win_length", self.tempogram_win_length)?;

        if self.target_sample_rate == Some(0) {
            return Err(AnalysisError::invalid("target_sample_rate", 0, "must be > 0"));
        }
        if self.n_mfcc > self.n_mels {
            return Err(AnalysisError::invalid(
                "n_mfcc",
                self.n_mfcc,
                format!("must not exceed n_mels ({})", self.n_mels),
            ));
        }
        if !(self.roll_percent > 0.0 && self.roll_percent < 1.0) {
            return Err(AnalysisError::invalid("roll_percent", self.roll_percent, "must be in (0, 1)"));
        }
        if !(self.start_bpm > 0.0) {
            return Err(AnalysisError::invalid("start_bpm", self.start_bpm, "must be > 0"));
        }
        if !(self.tempo_std_bpm > 0.0) {
            return Err(AnalysisError::invalid("tempo_std_bpm", self.tempo_std_bpm, "must be > 0"));
        }
        if !(self.tempo_ac_size > 0.0) {
            return Err(AnalysisError::invalid("tempo_ac_size", self.tempo_ac_size, "must be > 0"));
        }
        if !(self.max_tempo > 0.0) {
            return Err(AnalysisError::invalid("max_tempo", self.max_tempo, "must be > 0"));
        }
        if !(self.tightness >= 0.0) {
            return Err(AnalysisError::invalid("tightness", self.tightness, "must be >= 0"));
        }
        Ok(())
    }

    fn tempo_params(&self) -> TempoParams {
        TempoParams {
            start_bpm: self.start_bpm,
            std_bpm: self.tempo_std_bpm,
            ac_size: self.tempo_ac_size,
            max_tempo: self.max_tempo,
        }
    }
}

/// Every feature of one track, aligned on the same frame grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypointAnalysis {
    /// Sample rate the features were computed at.
    pub sample_rate: u32,
    pub hop_length: usize,
    /// Duration in seconds.
    pub duration: f64,
    /// Number of analysis frames.
    pub num_frames: usize,
    /// MFCC, chroma and contrast rows stacked, shape `(32, frames)` by default.
    pub features: Array2<f32>,
    /// Mean-aggregated onset strength per frame.
    pub onset_envelope: Vec<f32>,
    /// Onset times in seconds.
    pub onset_times: Vec<f64>,
    /// Estimated tempo in BPM (0 for a track without onsets).
    pub tempo: f64,
    /// Beat times in seconds.
    pub beat_times: Vec<f64>,
    /// Shape `(win_length, frames)`.
    pub tempogram: Array2<f32>,
    pub centroid: Array2<f32>,
    pub rolloff: Array2<f32>,
    pub zero_crossing_rate: Array2<f32>,
}

impl KeypointAnalysis {
    /// Analysis frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_length as f64
    }

    /// Time in seconds of analysis frame `frame`.
    pub fn frame_time(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_length as f64 / self.sample_rate as f64
    }

    /// Analysis frame covering time `t`, clamped to the frame grid.
    pub fn frame_at(&self, t: f64) -> usize {
        let frame = (t * self.frame_rate()).round().max(0.0) as usize;
        frame.min(self.num_frames.saturating_sub(1))
    }

    /// Human-readable report of shapes and rhythm keypoints.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Features shape: {}", Shape(&self.features));
        let _ = writeln!(out, "Onset times: {}", Times(&self.onset_times));
        let _ = writeln!(out, "Tempo: {:.2}", self.tempo);
        let _ = writeln!(out, "Beat times: {}", Times(&self.beat_times));
        let _ = writeln!(out, "Tempogram shape: {}", Shape(&self.tempogram));
        let _ = writeln!(out, "Spectral Centroid shape: {}", Shape(&self.centroid));
        let _ = writeln!(out, "Spectral Rolloff shape: {}", Shape(&self.rolloff));
        let _ = write!(out, "Zero Crossing Rate shape: {}", Shape(&self.zero_crossing_rate));
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct Shape<'a>(&'a Array2<f32>);

impl Display for Shape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.0.dim();
        write!(f, "({rows}, {cols})")
    }
}

struct Times<'a>(&'a [f64]);

impl Display for Times<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t:.3}")?;
        }
        f.write_str("]")
    }
}

/// Convert frame indices to seconds.
pub fn frames_to_time(frames: &[usize], sample_rate: u32, hop_length: usize) -> Vec<f64> {
    frames
        .iter()
        .map(|&f| f as f64 * hop_length as f64 / sample_rate as f64)
        .collect()
}

fn check_input(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<(), AnalysisError> {
    cfg.validate()?;
    if sample_rate == 0 {
        return Err(AnalysisError::invalid("sample_rate", sample_rate, "must be > 0"));
    }
    if y.is_empty() {
        return Err(AnalysisError::EmptyAudio);
    }
    if y.iter().any(|s| !s.is_finite()) {
        return Err(AnalysisError::NonFiniteAudio);
    }
    Ok(())
}

/// Spectrogram and dB mel spectrogram shared by several features.
struct Spectra {
    spec: Spectrogram,
    mel_db: Array2<f32>,
}

impl Spectra {
    fn compute(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Self {
        let spec = Spectrogram::compute(y, sample_rate, cfg.n_fft, cfg.hop_length);
        let fb = mel::mel_filterbank(
            sample_rate,
            cfg.n_fft,
            cfg.n_mels,
            0.0,
            sample_rate as f32 / 2.0,
        );
        let mel_power = fb.dot(&spec.power());
        let mel_db = mel::power_to_db(&mel_power, mel::AMIN, Some(mel::TOP_DB));
        Self { spec, mel_db }
    }

    fn features(&self, cfg: &AnalysisConfig) -> Result<Array2<f32>, AnalysisError> {
        let sr = self.spec.sample_rate;
        let mfcc = mfcc::mfcc_from_mel_db(&self.mel_db, cfg.n_mfcc);
        let chroma = chroma::chroma_from_power(&self.spec.power(), sr, cfg.n_fft, cfg.n_chroma, cfg.tuning);
        let contrast = contrast::spectral_contrast(
            &self.spec.magnitude,
            sr,
            cfg.n_fft,
            cfg.contrast_bands,
            cfg.contrast_fmin,
            cfg.contrast_quantile,
        )?;
        Ok(concatenate(Axis(0), &[mfcc.view(), chroma.view(), contrast.view()])?)
    }

    fn envelope(&self, cfg: &AnalysisConfig, aggregate: Aggregate) -> Vec<f32> {
        onset::onset_strength(&self.mel_db, cfg.n_fft, cfg.hop_length, aggregate)
    }

    fn onsets(&self, envelope: &[f32], cfg: &AnalysisConfig) -> Vec<f64> {
        let sr = self.spec.sample_rate;
        let params = onset::onset_peak_params(
            sr,
            cfg.hop_length,
            cfg.onset_pre_max,
            cfg.onset_post_max,
            cfg.onset_delta,
        );
        let frames = onset::onset_detect(envelope, &params);
        frames_to_time(&frames, sr, cfg.hop_length)
    }

    fn beats(&self, cfg: &AnalysisConfig) -> (f64, Vec<f64>) {
        let sr = self.spec.sample_rate;
        let envelope = self.envelope(cfg, Aggregate::Median);
        if envelope.iter().all(|&v| v == 0.0) {
            return (0.0, Vec::new());
        }

        let tempo = estimate_tempo(&envelope, sr, cfg.hop_length, &cfg.tempo_params());
        let frame_rate = sr as f64 / cfg.hop_length as f64;
        let frames = track_beats(&envelope, tempo, frame_rate, cfg.tightness);
        (tempo, frames_to_time(&frames, sr, cfg.hop_length))
    }

    fn spectral(&self, y: &[f32], cfg: &AnalysisConfig) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
        let freqs = self.spec.frequencies();
        let centroid = spectral::spectral_centroid(&self.spec.magnitude, &freqs);
        let rolloff = spectral::spectral_rolloff(&self.spec.magnitude, &freqs, cfg.roll_percent);
        let zcr = spectral::zero_crossing_rate(y, cfg.zcr_frame_length, cfg.hop_length);
        (centroid, rolloff, zcr)
    }
}

/// Run every analysis on `y` and collect the results.
///
/// The STFT and mel spectrogram are computed once and shared.
pub fn analyze(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<KeypointAnalysis, AnalysisError> {
    check_input(y, sample_rate, cfg)?;

    let duration = y.len() as f64 / sample_rate as f64;
    log::info!(
        "Analyzing {:.2}s of audio at {} Hz (n_fft={}, hop={})",
        duration,
        sample_rate,
        cfg.n_fft,
        cfg.hop_length
    );

    let spectra = Spectra::compute(y, sample_rate, cfg);
    let num_frames = spectra.spec.num_frames();

    let features = spectra.features(cfg)?;
    log::info!("Features: {} rows x {} frames", features.nrows(), features.ncols());

    let onset_envelope = spectra.envelope(cfg, Aggregate::Mean);
    let onset_times = spectra.onsets(&onset_envelope, cfg);
    log::info!("Onsets: {} detected", onset_times.len());

    let (tempo, beat_times) = spectra.beats(cfg);
    log::info!("Tempo: {:.2} BPM, {} beats", tempo, beat_times.len());

    let tempogram = tempogram::tempogram(&onset_envelope, cfg.tempogram_win_length);
    log::info!("Tempogram: {} lags x {} frames", tempogram.nrows(), tempogram.ncols());

    let (centroid, rolloff, zero_crossing_rate) = spectra.spectral(y, cfg);
    log::info!("Spectral descriptors: {} frames", centroid.ncols());

    Ok(KeypointAnalysis {
        sample_rate,
        hop_length: cfg.hop_length,
        duration,
        num_frames,
        features,
        onset_envelope,
        onset_times,
        tempo,
        beat_times,
        tempogram,
        centroid,
        rolloff,
        zero_crossing_rate,
    })
}

/// MFCC, chroma and spectral contrast stacked row-wise.
pub fn extract_features(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<Array2<f32>, AnalysisError> {
    check_input(y, sample_rate, cfg)?;
    Spectra::compute(y, sample_rate, cfg).features(cfg)
}

/// Onset times in seconds.
pub fn detect_onsets(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<Vec<f64>, AnalysisError> {
    check_input(y, sample_rate, cfg)?;
    let spectra = Spectra::compute(y, sample_rate, cfg);
    let envelope = spectra.envelope(cfg, Aggregate::Mean);
    Ok(spectra.onsets(&envelope, cfg))
}

/// Tempo in BPM and beat times in seconds.
pub fn detect_beats(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<(f64, Vec<f64>), AnalysisError> {
    check_input(y, sample_rate, cfg)?;
    Ok(Spectra::compute(y, sample_rate, cfg).beats(cfg))
}

/// Autocorrelation tempogram of the onset strength envelope.
pub fn extract_tempogram(y: &[f32], sample_rate: u32, cfg: &AnalysisConfig) -> Result<Array2<f32>, AnalysisError> {
    check_input(y, sample_rate, cfg)?;
    let envelope = Spectra::compute(y, sample_rate, cfg).envelope(cfg, Aggregate::Mean);
    Ok(tempogram::tempogram(&envelope, cfg.tempogram_win_length))
}

/// Spectral centroid, spectral rolloff and zero-crossing rate, each `(1, frames)`.
pub fn compute_spectral_features(
    y: &[f32],
    sample_rate: u32,
    cfg: &AnalysisConfig,
) -> Result<(Array2<f32>, Array2<f32>, Array2<f32>), AnalysisError> {
    check_input(y, sample_rate, cfg)?;
    Ok(Spectra::compute(y, sample_rate, cfg).spectral(y, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = AnalysisConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(AnalysisError::InvalidParameter { name: "hop_length", .. })
        ));

        let cfg = AnalysisConfig {
            n_mfcc: 200,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AnalysisConfig {
            roll_percent: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_partial_toml() {
        let cfg: AnalysisConfig = toml::from_str("hop_length = 512\nstart_bpm = 120.0").unwrap();
        assert_eq!(cfg.hop_length, 512);
        assert_eq!(cfg.start_bpm, 120.0);
        assert_eq!(cfg.n_fft, 2048);
    }

    #[test]
    fn test_frames_to_time() {
        let times = frames_to_time(&[0, 1, 43], 22050, 1024);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 0.046439).abs() < 1e-6);
        assert!((times[2] - 1.996916).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_audio_is_rejected() {
        let y = vec![0.0, f32::NAN, 0.0];
        let err = analyze(&y, 22050, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::NonFiniteAudio));
    }
}
