//! Phobz Keypoints Core
//!
//! Audio keypoint analysis and synchronized feature videos.
//!
//! # Features
//!
//! - Audio loading (WAV, MP3, FLAC, AAC) via Symphonia, resampling via Rubato
//! - MFCC, chroma and spectral contrast features
//! - Onset detection, tempo estimation and dynamic-programming beat tracking
//! - Autocorrelation tempogram
//! - Spectral centroid, rolloff and zero-crossing rate
//! - Four-panel frame rendering with a beat-reactive playhead
//! - Video encoding via FFmpeg (H.264, ProRes 4444, VP9)

pub mod analysis;
pub mod audio;
pub mod pipeline;
pub mod plots;
pub mod render;
pub mod video;

// Re-export commonly used types
pub use analysis::{analyze, AnalysisConfig, AnalysisError, KeypointAnalysis};
pub use audio::{load_audio, load_mono, AudioData, AudioError};
pub use pipeline::{
    analyze_audio_file, parse_hex_color, render_video, PipelineConfig, PipelineError, RenderStats,
};
pub use plots::PlotType;
pub use render::{FrameRenderer, RenderConfig};
pub use video::{FfmpegEncoder, FrameSink, PngSequenceWriter, VideoCodec, VideoConfig, VideoError};
