//! Integration tests for keypoint analysis on synthetic signals.

use phobz_keypoints::analysis::tempogram::TempoParams;
use phobz_keypoints::analysis::{
    analyze, compute_spectral_features, detect_beats, detect_onsets, estimate_tempo,
    extract_features, extract_tempogram, tempo_frequencies, AnalysisConfig, AnalysisError,
};
use phobz_keypoints::audio::generate_sine;

mod keypoint_fixtures;
use keypoint_fixtures::{near_any, noise_clicks, SAMPLE_RATE};

#[test]
fn test_analysis_shapes_share_frame_grid() {
    let (samples, _) = noise_clicks(120.0, 6.0);
    let cfg = AnalysisConfig::default();
    let analysis = analyze(&samples, SAMPLE_RATE, &cfg).unwrap();

    let frames = 1 + samples.len() / cfg.hop_length;
    assert_eq!(analysis.num_frames, frames);
    assert_eq!(analysis.features.dim(), (32, frames));
    assert_eq!(analysis.tempogram.dim(), (384, frames));
    assert_eq!(analysis.centroid.dim(), (1, frames));
    assert_eq!(analysis.rolloff.dim(), (1, frames));
    assert_eq!(analysis.zero_crossing_rate.dim(), (1, frames));
    assert_eq!(analysis.onset_envelope.len(), frames);
    assert!(analysis.features.iter().all(|v| v.is_finite()));
}

#[test]
fn test_onsets_follow_clicks() {
    let (samples, clicks) = noise_clicks(120.0, 8.0);
    let onsets = detect_onsets(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    assert!(
        (12..=16).contains(&onsets.len()),
        "expected one onset per click, got {:?}",
        onsets
    );
    for &t in &onsets {
        assert!(near_any(t, &clicks, 0.1), "onset at {t:.3}s is not near a click");
    }
    assert!(onsets.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_tempo_and_beats_on_click_track() {
    let (samples, clicks) = noise_clicks(120.0, 10.0);
    let (tempo, beats) = detect_beats(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    // The prior starts at 60 BPM, so either the pulse or half of it is acceptable.
    let ratio = tempo / 120.0;
    assert!(
        (ratio - 1.0).abs() < 0.05 || (ratio - 0.5).abs() < 0.03,
        "tempo {tempo:.2} is not 120 BPM or an octave below"
    );

    assert!(beats.len() >= 4, "too few beats: {:?}", beats);
    assert!(beats.windows(2).all(|w| w[0] < w[1]));
    assert!(beats.iter().all(|&t| (0.0..=10.0).contains(&t)));

    let mut gaps: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median_gap = gaps[gaps.len() / 2];
    assert!(
        (median_gap - 60.0 / tempo).abs() < 0.1,
        "median beat gap {median_gap:.3}s does not match {tempo:.2} BPM"
    );

    let on_click = beats.iter().filter(|&&t| near_any(t, &clicks, 0.1)).count();
    assert!(on_click * 5 >= beats.len() * 4, "beats drift off the clicks: {:?}", beats);
}

#[test]
fn test_tempo_above_max_is_rejected() {
    // A pulse every 3 frames, about 431 BPM. The envelope starts and ends at zero.
    let mut envelope = vec![0.0f32; 600];
    for i in (1..599).step_by(3) {
        envelope[i] = 1.0;
    }
    let hop = 1024;
    let pulse_bpm = tempo_frequencies(4, hop, SAMPLE_RATE)[3];
    let params = |max_tempo| TempoParams {
        start_bpm: pulse_bpm,
        std_bpm: 1.0,
        ac_size: 8.0,
        max_tempo,
    };

    let unbounded = estimate_tempo(&envelope, SAMPLE_RATE, hop, &params(1000.0));
    assert!((unbounded - pulse_bpm).abs() < 1e-6, "tempo {unbounded:.2}");

    let bounded = estimate_tempo(&envelope, SAMPLE_RATE, hop, &params(320.0));
    assert!(bounded > 0.0 && bounded < 320.0, "tempo {bounded:.2}");
    let lag = (60.0 * SAMPLE_RATE as f64 / (hop as f64 * bounded)).round() as usize;
    assert_eq!(lag % 3, 0, "tempo {bounded:.2} is not a multiple of the pulse period");
}

#[test]
fn test_silence_has_no_rhythm() {
    let samples = vec![0.0f32; SAMPLE_RATE as usize * 2];
    let analysis = analyze(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    assert!(analysis.onset_times.is_empty());
    assert!(analysis.beat_times.is_empty());
    assert_eq!(analysis.tempo, 0.0);
    assert!(analysis.centroid.iter().all(|&v| v == 0.0));
    assert!(analysis.zero_crossing_rate.iter().all(|&v| v == 0.0));
}

#[test]
fn test_tone_features() {
    let samples = generate_sine(440.0, SAMPLE_RATE, 3.0, 0.5);
    let cfg = AnalysisConfig::default();

    let features = extract_features(&samples, SAMPLE_RATE, &cfg).unwrap();
    let middle = features.ncols() / 2;
    let chroma: Vec<f32> = (13..25).map(|row| features[(row, middle)]).collect();
    let pitch_class = chroma
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(pitch_class, 9, "440 Hz should map to A, chroma {:?}", chroma);
    assert!(chroma[10] < 0.5 && chroma[8] < 0.5, "A is smeared: {:?}", chroma);

    let (centroid, rolloff, _) = compute_spectral_features(&samples, SAMPLE_RATE, &cfg).unwrap();
    assert!((centroid[(0, middle)] - 440.0).abs() < 50.0);
    assert!(rolloff[(0, middle)] >= centroid[(0, middle)] - 50.0);
}

#[test]
fn test_sharp_tone_is_centered_on_its_pitch_class() {
    // A4 + 45 cents
    let samples = generate_sine(451.6, SAMPLE_RATE, 3.0, 0.5);
    let cfg = AnalysisConfig::default();
    assert_eq!(cfg.tuning, None);

    let features = extract_features(&samples, SAMPLE_RATE, &cfg).unwrap();
    let middle = features.ncols() / 2;
    let (a, a_sharp) = (features[(13 + 9, middle)], features[(13 + 10, middle)]);
    assert!((a - 1.0).abs() < 1e-6);
    assert!(a_sharp < 0.5, "A# at {a_sharp}");

    let untuned = AnalysisConfig {
        tuning: Some(0.0),
        ..Default::default()
    };
    let features = extract_features(&samples, SAMPLE_RATE, &untuned).unwrap();
    assert!(features[(13 + 10, middle)] > 0.7);
}

#[test]
fn test_tempogram_columns_are_normalized() {
    let (samples, _) = noise_clicks(100.0, 5.0);
    let tempogram = extract_tempogram(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    for column in tempogram.columns() {
        let max = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max <= 1.0 + 1e-4);
        if max > 0.0 {
            assert!((max - 1.0).abs() < 1e-4);
        }
    }
}

#[test]
fn test_invalid_input() {
    let cfg = AnalysisConfig::default();
    assert!(matches!(analyze(&[], SAMPLE_RATE, &cfg), Err(AnalysisError::EmptyAudio)));
    assert!(matches!(
        analyze(&[0.0, f32::INFINITY], SAMPLE_RATE, &cfg),
        Err(AnalysisError::NonFiniteAudio)
    ));

    let bad = AnalysisConfig {
        hop_length: 0,
        ..Default::default()
    };
    assert!(matches!(
        analyze(&[0.0; 4096], SAMPLE_RATE, &bad),
        Err(AnalysisError::InvalidParameter { name: "hop_length", .. })
    ));
}

#[test]
fn test_summary_and_json() {
    let (samples, _) = noise_clicks(120.0, 3.0);
    let analysis = analyze(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    let summary = analysis.summary();
    assert!(summary.starts_with(&format!("Features shape: (32, {})", analysis.num_frames)));
    assert!(summary.contains("Tempogram shape: (384, "));
    assert!(summary.contains("Zero Crossing Rate shape: (1, "));

    let json: serde_json::Value = serde_json::from_str(&analysis.to_json().unwrap()).unwrap();
    assert_eq!(json["sample_rate"], 22050);
    assert_eq!(json["beat_times"].as_array().unwrap().len(), analysis.beat_times.len());
}
