//! Benchmarks for keypoint analysis operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use phobz_keypoints::analysis::{
    analyze, compute_spectral_features, detect_beats, extract_features, extract_tempogram,
    AnalysisConfig,
};
use phobz_keypoints::audio::synth::{generate_click_track, generate_white_noise};
use phobz_keypoints::audio::Spectrogram;
use phobz_keypoints::render::{FrameRenderer, RenderConfig};

const SAMPLE_RATE: u32 = 22050;

fn bench_stft(c: &mut Criterion) {
    let mut group = c.benchmark_group("STFT");
    let samples = generate_white_noise(SAMPLE_RATE, 10.0, 0.5, 42);

    for n_fft in [512, 1024, 2048, 4096] {
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::new("magnitude", n_fft), &n_fft, |b, &size| {
            b.iter(|| black_box(Spectrogram::compute(&samples, SAMPLE_RATE, size, size / 2)));
        });
    }

    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("Feature Extraction");
    let cfg = AnalysisConfig::default();
    let samples = generate_click_track(120.0, SAMPLE_RATE, 10.0, 1000.0);

    group.bench_function("stacked_features", |b| {
        b.iter(|| black_box(extract_features(&samples, SAMPLE_RATE, &cfg)));
    });
    group.bench_function("spectral_descriptors", |b| {
        b.iter(|| black_box(compute_spectral_features(&samples, SAMPLE_RATE, &cfg)));
    });
    group.bench_function("tempogram", |b| {
        b.iter(|| black_box(extract_tempogram(&samples, SAMPLE_RATE, &cfg)));
    });

    group.finish();
}

fn bench_beats(c: &mut Criterion) {
    let mut group = c.benchmark_group("Beat Tracking");
    let cfg = AnalysisConfig::default();

    for duration in [5.0f32, 30.0, 60.0] {
        let samples = generate_click_track(128.0, SAMPLE_RATE, duration, 1000.0);
        group.bench_with_input(
            BenchmarkId::new("detect_beats", duration as u32),
            &samples,
            |b, samples| {
                b.iter(|| black_box(detect_beats(samples, SAMPLE_RATE, &cfg)));
            },
        );
    }

    group.finish();
}

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame Rendering");
    let samples = generate_click_track(120.0, SAMPLE_RATE, 10.0, 1000.0);
    let analysis = analyze(&samples, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();

    for (width, height) in [(640u32, 360u32), (1920, 1080)] {
        let config = RenderConfig {
            width,
            height,
            ..Default::default()
        };
        let renderer = FrameRenderer::new(&analysis, &samples, &config);
        group.bench_with_input(
            BenchmarkId::new("render_frame", format!("{width}x{height}")),
            &renderer,
            |b, renderer| {
                b.iter(|| black_box(renderer.render_frame(black_box(5.0))));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stft, bench_features, bench_beats, bench_render_frame);
criterion_main!(benches);
