//! Feature plots.
//!
//! Provides the four panels of a keypoint video:
//! - Waveform: min/max envelope with onset markers
//! - Features: MFCC, chroma and contrast heatmap
//! - Tempogram: autocorrelation tempogram with beat markers
//! - Spectral: centroid, rolloff and zero-crossing rate curves

mod features;
mod spectral;
mod tempogram;
mod waveform;

pub use features::FeaturesPlot;
pub use spectral::SpectralPlot;
pub use tempogram::TempogramPlot;
pub use waveform::WaveformPlot;

use image::{Rgba, RgbaImage};

use crate::analysis::KeypointAnalysis;
use crate::render::{Rect, TimeAxis};

/// Available plot types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotType {
    Waveform,
    Features,
    Tempogram,
    Spectral,
}

impl PlotType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "waveform" | "wave" | "onsets" => Some(Self::Waveform),
            "features" | "feature" | "mfcc" | "chroma" => Some(Self::Features),
            "tempogram" | "tempo" | "beats" => Some(Self::Tempogram),
            "spectral" | "centroid" | "rolloff" | "zcr" => Some(Self::Spectral),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Waveform => "waveform",
            Self::Features => "features",
            Self::Tempogram => "tempogram",
            Self::Spectral => "spectral",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Waveform => "Waveform envelope with onset markers",
            Self::Features => "MFCC, chroma and spectral contrast heatmap",
            Self::Tempogram => "Autocorrelation tempogram with beat markers",
            Self::Spectral => "Spectral centroid, rolloff and zero-crossing rate",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Waveform, Self::Features, Self::Tempogram, Self::Spectral]
    }
}

/// Colors shared by all plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotStyle {
    pub foreground: Rgba<u8>,
    pub background: Rgba<u8>,
    /// Fill behind each panel.
    pub panel: Rgba<u8>,
    /// Onset and beat markers.
    pub marker: Rgba<u8>,
}

/// Everything a plot needs to draw itself.
pub struct PlotContext<'a> {
    pub analysis: &'a KeypointAnalysis,
    /// Mono samples at `analysis.sample_rate`.
    pub samples: &'a [f32],
    pub axis: TimeAxis,
    pub style: &'a PlotStyle,
}

impl PlotContext<'_> {
    /// Analysis frame shown in pixel column `px`.
    pub fn frame_at(&self, px: u32) -> usize {
        self.analysis.frame_at(self.axis.time_at(px))
    }
}

/// A static panel drawn once per video.
pub trait Plot: Send + Sync {
    /// Draw the panel into `rect`.
    fn draw(&self, img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>);

    /// Plot type identifier.
    fn plot_type(&self) -> PlotType;
}

/// Create a plot instance from type.
pub fn create_plot(plot_type: PlotType) -> Box<dyn Plot> {
    match plot_type {
        PlotType::Waveform => Box::new(WaveformPlot),
        PlotType::Features => Box::new(FeaturesPlot),
        PlotType::Tempogram => Box::new(TempogramPlot),
        PlotType::Spectral => Box::new(SpectralPlot),
    }
}

/// Draw translucent full-height markers at `times`.
pub(crate) fn draw_markers(img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>, times: &[f64], alpha: f32) {
    if rect.height == 0 {
        return;
    }
    for &t in times {
        let x = ctx.axis.x_for(t);
        crate::render::canvas::blend_vline(img, x, rect.y, rect.bottom() - 1, ctx.style.marker, alpha);
    }
}
