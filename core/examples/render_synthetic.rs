//! Example: Render a keypoint video from synthetic audio.
//!
//! This example generates a metronome click track, prints its analysis
//! summary, and renders a short four-panel video with the clicks as audio.
//!
//! Run with:
//!     cargo run --example render_synthetic

use std::path::Path;

use phobz_keypoints::audio::{generate_click_track, generate_sine, write_wav};
use phobz_keypoints::pipeline::{analyze_audio_file, render_video, PipelineConfig};
use phobz_keypoints::VideoCodec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Phobz Keypoints - Synthetic Audio Example");
    println!("=========================================\n");

    // 120 BPM clicks over a quiet A440 drone, 5 seconds
    let sample_rate: u32 = 22050;
    let duration_secs: f32 = 5.0;
    let bpm: f32 = 120.0;

    println!("Generating synthetic audio...");
    println!("  Sample rate: {} Hz", sample_rate);
    println!("  Duration: {} seconds", duration_secs);
    println!("  BPM: {}", bpm);

    let clicks = generate_click_track(bpm, sample_rate, duration_secs, 1500.0);
    let drone = generate_sine(440.0, sample_rate, duration_secs, 0.1);
    let samples: Vec<f32> = clicks.iter().zip(&drone).map(|(c, d)| c * 0.8 + d).collect();

    let audio_path = Path::new("synthetic_clicks.wav");
    write_wav(audio_path, &samples, sample_rate)?;
    println!("  Wrote {}\n", audio_path.display());

    let config = PipelineConfig {
        width: 640,
        height: 360,
        fps: 30,
        codec: VideoCodec::H264,
        bitrate: 2_000_000,
        crf: Some(23),
        ..Default::default()
    };

    println!("Analyzing audio...");
    let (analysis, _) = analyze_audio_file(audio_path, &config.analysis)?;
    println!("{}\n", analysis.summary());

    let output_path = Path::new("synthetic_keypoints.mp4");
    println!("Rendering to: {}", output_path.display());
    println!("  Resolution: {}x{}", config.width, config.height);
    println!("  FPS: {}", config.fps);

    let progress: Box<dyn Fn(f32) + Send> = Box::new(|fraction: f32| {
        let percent = (fraction * 100.0).round() as u32;
        if percent % 20 == 0 {
            println!("  Progress: {}%", percent);
        }
    });
    let stats = render_video(audio_path, output_path, &config, Some(progress))?;

    println!("\nDone! {} frames, tempo {:.1} BPM", stats.frames, stats.tempo);
    println!("Play with: ffplay {}", output_path.display());

    Ok(())
}
