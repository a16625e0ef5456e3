//! Shared test fixtures for analysis, render and pipeline tests.
#![allow(dead_code)]

use phobz_keypoints::analysis::{analyze, AnalysisConfig, KeypointAnalysis};
use phobz_keypoints::audio::{click_positions, generate_white_noise};

pub const SAMPLE_RATE: u32 = 22050;

/// Broadband clicks: 20 ms decaying noise bursts every `60 / bpm` seconds.
///
/// Returns the samples and the click times in seconds.
pub fn noise_clicks(bpm: f32, duration: f32) -> (Vec<f32>, Vec<f64>) {
    noise_clicks_at(bpm, duration, SAMPLE_RATE)
}

pub fn noise_clicks_at(bpm: f32, duration: f32, sample_rate: u32) -> (Vec<f32>, Vec<f64>) {
    let num_samples = (duration * sample_rate as f32) as usize;
    let mut samples = vec![0.0f32; num_samples];
    let burst = generate_white_noise(sample_rate, 0.02, 0.8, 7);
    let burst_len = burst.len();

    let positions = click_positions(bpm, sample_rate, duration);
    for &start in &positions {
        for (i, &n) in burst.iter().enumerate() {
            if let Some(s) = samples.get_mut(start + i) {
                *s += n * (1.0 - i as f32 / burst_len as f32).powi(2);
            }
        }
    }

    let times = positions
        .iter()
        .map(|&p| p as f64 / sample_rate as f64)
        .collect();
    (samples, times)
}

/// Analysis of a 120 BPM click track.
pub fn click_analysis(duration: f32) -> (KeypointAnalysis, Vec<f32>) {
    let (samples, _) = noise_clicks(120.0, duration);
    let analysis = analyze(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();
    (analysis, samples)
}

pub fn near_any(t: f64, targets: &[f64], tolerance: f64) -> bool {
    targets.iter().any(|&c| (t - c).abs() <= tolerance)
}
