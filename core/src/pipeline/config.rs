//! TOML render configuration.
//!
//! ```toml
//! [render]
//! width = 1280
//! height = 720
//! fps = 30
//! codec = "h264"
//! color = "#00ff88"
//! plots = ["waveform", "spectral"]
//!
//! [analysis]
//! hop_length = 512
//! ```
//!
//! Every key is optional; missing keys keep the current value.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{parse_hex_color, PipelineConfig};
use crate::analysis::AnalysisConfig;
use crate::plots::PlotType;
use crate::video::VideoCodec;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid color for {key}: {value:?}")]
    InvalidColor { key: &'static str, value: String },

    #[error("Unknown codec {0:?} (expected h264, prores4444 or vp9)")]
    InvalidCodec(String),

    #[error("Unknown plot {0:?} (expected waveform, features, tempogram or spectral)")]
    InvalidPlot(String),
}

/// Parsed configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub render: RenderSection,
    pub analysis: Option<AnalysisConfig>,
}

/// `[render]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub codec: Option<String>,
    pub bitrate: Option<u64>,
    pub crf: Option<u32>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub playhead: Option<String>,
    pub plots: Option<Vec<String>>,
    pub ffmpeg: Option<PathBuf>,
    pub frames_dir: Option<PathBuf>,
}

fn color(key: &'static str, value: &str) -> Result<[f32; 3], ConfigError> {
    parse_hex_color(value).ok_or_else(|| ConfigError::InvalidColor {
        key,
        value: value.to_string(),
    })
}

/// Parse a list of plot names.
pub fn parse_plots<S: AsRef<str>>(names: &[S]) -> Result<Vec<PlotType>, ConfigError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref().trim();
            PlotType::from_str(name).ok_or_else(|| ConfigError::InvalidPlot(name.to_string()))
        })
        .collect()
}

pub fn parse_codec(name: &str) -> Result<VideoCodec, ConfigError> {
    VideoCodec::from_str(name).ok_or_else(|| ConfigError::InvalidCodec(name.to_string()))
}

impl FileConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay the file's values onto `config`.
    pub fn apply(self, config: &mut PipelineConfig) -> Result<(), ConfigError> {
        let r = self.render;
        if let Some(v) = r.width {
            config.width = v;
        }
        if let Some(v) = r.height {
            config.height = v;
        }
        if let Some(v) = r.fps {
            config.fps = v;
        }
        if let Some(v) = r.codec {
            config.codec = parse_codec(&v)?;
        }
        if let Some(v) = r.bitrate {
            config.bitrate = v;
        }
        if let Some(v) = r.crf {
            config.crf = Some(v);
        }
        if let Some(v) = r.color {
            config.color = color("color", &v)?;
        }
        if let Some(v) = r.background {
            config.background = color("background", &v)?;
        }
        if let Some(v) = r.playhead {
            config.playhead = color("playhead", &v)?;
        }
        if let Some(v) = r.plots {
            config.plots = parse_plots(&v)?;
        }
        if let Some(v) = r.ffmpeg {
            config.ffmpeg = v;
        }
        if let Some(v) = r.frames_dir {
            config.frames_dir = Some(v);
        }
        if let Some(analysis) = self.analysis {
            config.analysis = analysis;
        }
        Ok(())
    }
}

/// Read a TOML file and merge it over the defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = FileConfig::from_toml(&content, path)?;

    let mut config = PipelineConfig::default();
    file.apply(&mut config)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<PipelineConfig, ConfigError> {
        let mut config = PipelineConfig::default();
        FileConfig::from_toml(content, Path::new("test.toml"))?.apply(&mut config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let config = parse("").unwrap();
        let default = PipelineConfig::default();
        assert_eq!(config.width, default.width);
        assert_eq!(config.plots, default.plots);
        assert_eq!(config.analysis, default.analysis);
    }

    #[test]
    fn test_render_overrides() {
        let config = parse(
            r##"
            [render]
            width = 640
            height = 360
            codec = "webm"
            color = "#ff0000"
            plots = ["spectral", "waveform"]
            "##,
        )
        .unwrap();
        assert_eq!((config.width, config.height), (640, 360));
        assert_eq!(config.codec, VideoCodec::Vp9);
        assert_eq!(config.color, [1.0, 0.0, 0.0]);
        assert_eq!(config.plots, vec![PlotType::Spectral, PlotType::Waveform]);
    }

    #[test]
    fn test_analysis_section() {
        let config = parse("[analysis]\nhop_length = 512\n").unwrap();
        assert_eq!(config.analysis.hop_length, 512);
        assert_eq!(config.analysis.n_fft, AnalysisConfig::default().n_fft);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse("[render]\ncolor = \"nope\"\n"),
            Err(ConfigError::InvalidColor { key: "color", .. })
        ));
        assert!(matches!(
            parse("[render]\ncodec = \"divx\"\n"),
            Err(ConfigError::InvalidCodec(_))
        ));
        assert!(matches!(
            parse("[render]\nplots = [\"pie\"]\n"),
            Err(ConfigError::InvalidPlot(_))
        ));
        assert!(matches!(parse("[render]\nwidht = 3\n"), Err(ConfigError::Parse { .. })));
    }
}
