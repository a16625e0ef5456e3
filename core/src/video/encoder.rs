//! Video encoder driving the `ffmpeg` command-line tool.
//!
//! Raw RGBA frames are piped to ffmpeg's stdin; the source audio file is
//! passed as a second input and muxed into the same output.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::FrameSink;

/// Video codec options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 for YouTube/TikTok/Instagram (no transparency).
    H264,
    /// ProRes 4444 for professional workflows (supports transparency).
    ProRes4444,
    /// VP9 WebM for web use (supports transparency).
    Vp9,
}

impl VideoCodec {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "h264" | "x264" | "avc" | "mp4" => Some(Self::H264),
            "prores4444" | "prores" | "mov" => Some(Self::ProRes4444),
            "vp9" | "webm" => Some(Self::Vp9),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::ProRes4444 => "prores4444",
            VideoCodec::Vp9 => "vp9",
        }
    }

    /// ffmpeg encoder name.
    pub fn codec_name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::ProRes4444 => "prores_ks",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }

    /// ffmpeg output pixel format.
    pub fn pixel_format(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "yuv420p",
            VideoCodec::ProRes4444 => "yuva444p10le",
            VideoCodec::Vp9 => "yuva420p",
        }
    }

    /// ffmpeg audio encoder matching the container.
    pub fn audio_codec(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "aac",
            VideoCodec::ProRes4444 => "pcm_s16le",
            VideoCodec::Vp9 => "libopus",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "mp4",
            VideoCodec::ProRes4444 => "mov",
            VideoCodec::Vp9 => "webm",
        }
    }
}

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoConfig {
    /// Video bitrate in bits per second (for lossy codecs).
    pub bitrate: u64,
    /// CRF quality (0-51 for H.264, lower is better). None uses bitrate.
    pub crf: Option<u32>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frame rate (frames per second).
    pub fps: u32,
    /// Video codec to use.
    pub codec: VideoCodec,
    /// ffmpeg executable, looked up on `PATH` when not absolute.
    pub ffmpeg: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            bitrate: 8_000_000, // 8 Mbps
            crf: Some(18),      // High quality
            width: 1920,
            height: 1080,
            fps: 30,
            codec: VideoCodec::H264,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<(), VideoError> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::InvalidConfig(format!(
                "frame size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        // yuv420p needs even dimensions.
        if self.codec != VideoCodec::ProRes4444 && (self.width % 2 != 0 || self.height % 2 != 0) {
            return Err(VideoError::InvalidConfig(format!(
                "{} requires even dimensions, got {}x{}",
                self.codec.name(),
                self.width,
                self.height
            )));
        }
        if self.fps == 0 {
            return Err(VideoError::InvalidConfig("fps must be > 0".to_string()));
        }
        if let Some(crf) = self.crf {
            if crf > 63 {
                return Err(VideoError::InvalidConfig(format!("crf {crf} is out of range")));
            }
        }
        Ok(())
    }
}

/// Errors that can occur during video encoding.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("Failed to start {program}: {source} (is ffmpeg installed and on PATH?)")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },
    #[error("Frame is {got_width}x{got_height}, encoder expects {width}x{height}")]
    FrameSize {
        got_width: u32,
        got_height: u32,
        width: u32,
        height: u32,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub(crate) fn check_frame_size(frame: &RgbaImage, width: u32, height: u32) -> Result<(), VideoError> {
    if frame.width() != width || frame.height() != height {
        return Err(VideoError::FrameSize {
            got_width: frame.width(),
            got_height: frame.height(),
            width,
            height,
        });
    }
    Ok(())
}

fn push<S: Into<OsString>>(args: &mut Vec<OsString>, items: impl IntoIterator<Item = S>) {
    args.extend(items.into_iter().map(Into::into));
}

/// Stream selection, codec and output arguments shared by both ffmpeg paths.
///
/// Input 0 is the video; input 1, when present, is the audio.
pub(crate) fn push_output_args(args: &mut Vec<OsString>, config: &VideoConfig, has_audio: bool, output: &Path) {
    push(args, ["-map", "0:v:0"]);
    if has_audio {
        push(args, ["-map", "1:a:0"]);
    }

    push(args, ["-c:v", config.codec.codec_name(), "-pix_fmt", config.codec.pixel_format()]);
    match config.codec {
        VideoCodec::H264 => match config.crf {
            Some(crf) => push(args, ["-crf".to_string(), crf.to_string(), "-preset".into(), "medium".into()]),
            None => push(args, ["-b:v".to_string(), config.bitrate.to_string()]),
        },
        VideoCodec::ProRes4444 => push(args, ["-profile:v", "4444"]),
        VideoCodec::Vp9 => match config.crf {
            Some(crf) => push(args, ["-crf".to_string(), crf.to_string(), "-b:v".into(), "0".into()]),
            None => push(args, ["-b:v".to_string(), config.bitrate.to_string()]),
        },
    }

    if has_audio {
        push(args, ["-c:a", config.codec.audio_codec()]);
        if config.codec != VideoCodec::ProRes4444 {
            push(args, ["-b:a", "192k"]);
        }
        push(args, ["-shortest"]);
    }

    args.push(output.as_os_str().to_owned());
}

/// Arguments for encoding raw RGBA frames read from stdin.
pub fn ffmpeg_stream_args(config: &VideoConfig, audio: Option<&Path>, output: &Path) -> Vec<OsString> {
    let mut args = Vec::new();
    push(&mut args, ["-y", "-hide_banner", "-loglevel", "error"]);
    push(
        &mut args,
        [
            "-f".to_string(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-s".into(),
            format!("{}x{}", config.width, config.height),
            "-r".into(),
            config.fps.to_string(),
            "-i".into(),
            "-".into(),
        ],
    );
    if let Some(audio) = audio {
        push(&mut args, ["-i"]);
        args.push(audio.as_os_str().to_owned());
    }
    push_output_args(&mut args, config, audio.is_some(), output);
    args
}

fn drain_stderr(mut stderr: impl Read + Send + 'static) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    })
}

/// Run ffmpeg to completion, turning a failed exit into [`VideoError::Ffmpeg`].
pub(crate) fn run_ffmpeg(program: &Path, args: &[OsString]) -> Result<(), VideoError> {
    log::debug!("Running {} {:?}", program.display(), args);
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| VideoError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        log::error!("ffmpeg failed ({}): {}", output.status, stderr);
        return Err(VideoError::Ffmpeg {
            status: output.status.to_string(),
            stderr,
        });
    }
    Ok(())
}

/// Encoder that pipes frames into a running ffmpeg process.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    config: VideoConfig,
    frames: u64,
}

impl FfmpegEncoder {
    /// Start ffmpeg writing to `output`, muxing `audio` when given.
    pub fn new(output: &Path, audio: Option<&Path>, config: VideoConfig) -> Result<Self, VideoError> {
        config.validate()?;
        let args = ffmpeg_stream_args(&config, audio, output);
        log::info!(
            "Starting ffmpeg: {} {}x{} @ {} fps -> {}",
            config.codec.codec_name(),
            config.width,
            config.height,
            config.fps,
            output.display()
        );
        log::debug!("ffmpeg args: {:?}", args);

        let mut child = Command::new(&config.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VideoError::Spawn {
                program: config.ffmpeg.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(drain_stderr);

        Ok(Self {
            child,
            stdin,
            stderr,
            config,
            frames: 0,
        })
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Close stdin, wait for ffmpeg and collect its stderr.
    fn wait(&mut self) -> Result<(), VideoError> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        if !status.success() {
            log::error!("ffmpeg failed ({}): {}", status, stderr);
            return Err(VideoError::Ffmpeg {
                status: status.to_string(),
                stderr,
            });
        }
        Ok(())
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), VideoError> {
        check_frame_size(frame, self.config.width, self.config.height)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VideoError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "ffmpeg stdin already closed",
            )));
        };

        if let Err(err) = stdin.write_all(frame.as_raw()) {
            // A closed pipe means ffmpeg died; its stderr says why.
            self.wait()?;
            return Err(err.into());
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), VideoError> {
        if let Some(stdin) = self.stdin.as_mut() {
            stdin.flush()?;
        }
        self.wait()?;
        log::info!("ffmpeg finished after {} frames", self.frames);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.wait();
        }
    }
}
