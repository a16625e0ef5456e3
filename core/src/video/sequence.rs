//! Numbered PNG frame sequences and their final mux.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use super::encoder::{check_frame_size, push_output_args, run_ffmpeg};
use super::{FrameSink, VideoConfig, VideoError};

/// printf-style pattern ffmpeg uses to read the sequence back.
const FRAME_PATTERN: &str = "frame_%06d.png";

/// Path of frame `index` inside `dir`.
pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame_{index:06}.png"))
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
pub struct PngSequenceWriter {
    dir: PathBuf,
    width: u32,
    height: u32,
    frames: u64,
}

impl PngSequenceWriter {
    /// Create the directory if needed.
    pub fn new(dir: &Path, width: u32, height: u32) -> Result<Self, VideoError> {
        std::fs::create_dir_all(dir)?;
        log::info!("Writing PNG frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            width,
            height,
            frames: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for PngSequenceWriter {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), VideoError> {
        check_frame_size(frame, self.width, self.height)?;
        frame.save_with_format(frame_path(&self.dir, self.frames), ImageFormat::Png)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), VideoError> {
        log::info!("Wrote {} frames to {}", self.frames, self.dir.display());
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

/// Arguments for encoding a PNG sequence written by [`PngSequenceWriter`].
pub fn ffmpeg_sequence_args(
    config: &VideoConfig,
    dir: &Path,
    audio: Option<&Path>,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push("-framerate".into());
    args.push(config.fps.to_string().into());
    args.push("-start_number".into());
    args.push("0".into());
    args.push("-i".into());
    args.push(dir.join(FRAME_PATTERN).into_os_string());
    if let Some(audio) = audio {
        args.push("-i".into());
        args.push(audio.as_os_str().to_owned());
    }
    push_output_args(&mut args, config, audio.is_some(), output);
    args
}

/// Encode the frames in `dir` together with `audio` into `output`.
pub fn mux_frame_sequence(
    dir: &Path,
    audio: Option<&Path>,
    output: &Path,
    config: &VideoConfig,
) -> Result<(), VideoError> {
    config.validate()?;
    if !frame_path(dir, 0).is_file() {
        return Err(VideoError::InvalidConfig(format!(
            "no frames found in {}",
            dir.display()
        )));
    }

    log::info!("Muxing {} with audio into {}", dir.display(), output.display());
    run_ffmpeg(&config.ffmpeg, &ffmpeg_sequence_args(config, dir, audio, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_path() {
        let p = frame_path(Path::new("/tmp/frames"), 42);
        assert_eq!(p, PathBuf::from("/tmp/frames/frame_000042.png"));
    }

    #[test]
    fn test_sequence_args() {
        let config = VideoConfig {
            fps: 25,
            ..Default::default()
        };
        let args: Vec<String> = ffmpeg_sequence_args(&config, Path::new("frames"), Some(Path::new("a.mp3")), Path::new("o.mp4"))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
        assert_eq!(args[pos("-framerate") + 1], "25");
        assert!(args[pos("-start_number") + 2..].iter().any(|a| a.ends_with("frame_%06d.png")));
        assert!(args.contains(&"a.mp3".to_string()));
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_mux_without_frames_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = mux_frame_sequence(dir.path(), None, &dir.path().join("o.mp4"), &VideoConfig::default());
        assert!(matches!(err, Err(VideoError::InvalidConfig(_))));
    }
}
