//! Video output through the `ffmpeg` command-line tool.
//!
//! Provides two frame sinks:
//! - [`FfmpegEncoder`]: streams raw RGBA frames into ffmpeg and muxes the
//!   source audio in the same pass
//! - [`PngSequenceWriter`]: writes numbered PNG frames that
//!   [`mux_frame_sequence`] later assembles with the audio
//!
//! Supported codecs:
//! - H.264 for YouTube/TikTok/Instagram
//! - ProRes 4444 for professional workflows with transparency
//! - WebM VP9 for web use

pub mod encoder;
pub mod sequence;

use image::RgbaImage;

pub use encoder::{ffmpeg_stream_args, FfmpegEncoder, VideoCodec, VideoConfig, VideoError};
pub use sequence::{ffmpeg_sequence_args, frame_path, mux_frame_sequence, PngSequenceWriter};

/// Destination for rendered frames.
pub trait FrameSink {
    /// Append one frame. Frames must match the sink's configured size.
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), VideoError>;

    /// Flush and close the sink.
    fn finish(self: Box<Self>) -> Result<(), VideoError>;

    fn frames_written(&self) -> u64;
}
