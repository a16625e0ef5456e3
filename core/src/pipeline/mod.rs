//! Full render pipeline combining audio analysis, frame rendering, and video.

pub mod config;

use std::path::{Path, PathBuf};

use crate::analysis::{analyze, AnalysisConfig, AnalysisError, KeypointAnalysis};
use crate::audio::{load_mono, AudioError};
use crate::plots::PlotType;
use crate::render::{FrameRenderer, RenderConfig};
use crate::video::{
    mux_frame_sequence, FfmpegEncoder, FrameSink, PngSequenceWriter, VideoCodec, VideoConfig,
    VideoError,
};

pub use config::{load_config, ConfigError, FileConfig};

/// Pipeline configuration for rendering keypoint videos.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bitrate: u64,
    pub crf: Option<u32>,
    pub color: [f32; 3],
    pub background: [f32; 3],
    pub playhead: [f32; 3],
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: VideoCodec,
    /// Panels from top to bottom.
    pub plots: Vec<PlotType>,
    pub analysis: AnalysisConfig,
    pub ffmpeg: PathBuf,
    /// Write PNG frames here and mux afterwards instead of streaming to ffmpeg.
    pub frames_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let video = VideoConfig::default();
        let render = RenderConfig::default();
        Self {
            bitrate: video.bitrate,
            crf: video.crf,
            color: render.foreground,
            background: render.background,
            playhead: render.playhead,
            width: render.width,
            height: render.height,
            fps: video.fps,
            codec: video.codec,
            plots: render.plots,
            analysis: AnalysisConfig::default(),
            ffmpeg: video.ffmpeg,
            frames_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn to_render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width,
            height: self.height,
            plots: self.plots.clone(),
            foreground: self.color,
            background: self.background,
            playhead: self.playhead,
        }
    }

    /// Convert to VideoConfig for encoding.
    pub fn to_video_config(&self) -> VideoConfig {
        VideoConfig {
            bitrate: self.bitrate,
            crf: self.crf,
            width: self.width,
            height: self.height,
            fps: self.fps,
            codec: self.codec,
            ffmpeg: self.ffmpeg.clone(),
        }
    }

    /// Number of video frames for `duration` seconds of audio.
    pub fn total_frames(&self, duration: f64) -> u64 {
        ((duration * self.fps as f64).ceil() as u64).max(1)
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Video error: {0}")]
    Video(#[from] VideoError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// What a finished render produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub frames: u64,
    /// Audio duration in seconds.
    pub duration: f64,
    pub tempo: f64,
}

/// Parse hex color to RGB floats (accepts 6-char RGB or 8-char RGBA, alpha is ignored).
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 && hex.len() != 8 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()? as f32 / 255.0;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()? as f32 / 255.0;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()? as f32 / 255.0;
    Some([r, g, b])
}

/// Load an audio file as mono and run every analysis on it.
pub fn analyze_audio_file<P: AsRef<Path>>(
    audio_path: P,
    config: &AnalysisConfig,
) -> Result<(KeypointAnalysis, Vec<f32>), PipelineError> {
    config.validate()?;
    let (mono, sample_rate) = load_mono(audio_path.as_ref(), config.target_sample_rate)?;
    let analysis = analyze(&mono, sample_rate, config)?;
    Ok((analysis, mono))
}

/// Render the keypoint video for an audio file.
///
/// The source audio is re-encoded into `output_path` with the codec's audio
/// format: AAC for H.264, 16-bit PCM for ProRes, Opus for VP9.
pub fn render_video<P: AsRef<Path>, Q: AsRef<Path>>(
    audio_path: P,
    output_path: Q,
    config: &PipelineConfig,
    progress_callback: Option<Box<dyn Fn(f32) + Send>>,
) -> Result<RenderStats, PipelineError> {
    let audio_path = audio_path.as_ref();
    let output_path = output_path.as_ref();

    let video_config = config.to_video_config();
    video_config.validate()?;

    let (analysis, mono) = analyze_audio_file(audio_path, &config.analysis)?;
    let renderer = FrameRenderer::new(&analysis, &mono, &config.to_render_config());

    let total_frames = config.total_frames(analysis.duration);
    log::info!(
        "Rendering {} frames ({:.2}s @ {} fps)",
        total_frames,
        analysis.duration,
        config.fps
    );

    let mut sink: Box<dyn FrameSink> = match &config.frames_dir {
        Some(dir) => Box::new(PngSequenceWriter::new(dir, config.width, config.height)?),
        None => Box::new(FfmpegEncoder::new(
            output_path,
            Some(audio_path),
            video_config.clone(),
        )?),
    };

    let report_every = config.fps.max(1) as u64;
    for frame_idx in 0..total_frames {
        let time = frame_idx as f64 / config.fps as f64;
        let frame = renderer.render_frame(time);
        sink.write_frame(&frame)?;

        if (frame_idx + 1) % report_every == 0 {
            log::debug!("Rendered frame {}/{}", frame_idx + 1, total_frames);
        }
        if let Some(ref callback) = progress_callback {
            callback((frame_idx + 1) as f32 / total_frames as f32);
        }
    }

    let frames = sink.frames_written();
    sink.finish()?;

    if let Some(dir) = &config.frames_dir {
        mux_frame_sequence(dir, Some(audio_path), output_path, &video_config)?;
    }

    log::info!("Wrote {}", output_path.display());
    Ok(RenderStats {
        frames,
        duration: analysis.duration,
        tempo: analysis.tempo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#00ff88"), Some([0.0, 1.0, 136.0 / 255.0]));
        assert_eq!(parse_hex_color("ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("000000"), Some([0.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("#00000000"), Some([0.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("ffffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("invalid"), None);
        assert_eq!(parse_hex_color("ééé"), None);
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.fps, 30);
        assert_eq!(config.plots.len(), 4);
        assert!(config.frames_dir.is_none());
    }

    #[test]
    fn test_config_conversions_agree() {
        let config = PipelineConfig {
            width: 640,
            height: 360,
            fps: 24,
            ..Default::default()
        };
        let video = config.to_video_config();
        let render = config.to_render_config();
        assert_eq!((video.width, video.height, video.fps), (640, 360, 24));
        assert_eq!((render.width, render.height), (640, 360));
        assert_eq!(render.foreground, config.color);
    }

    #[test]
    fn test_total_frames_rounds_up() {
        let config = PipelineConfig::default();
        assert_eq!(config.total_frames(1.0), 30);
        assert_eq!(config.total_frames(1.01), 31);
        assert_eq!(config.total_frames(0.0), 1);
    }
}
