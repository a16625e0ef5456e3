//! CPU rasterization of synchronized feature panels.
//!
//! This module provides:
//! - Raster primitives over `image::RgbaImage`
//! - The magma heatmap colormap
//! - A shared time axis so every panel agrees on the x of a given time
//! - [`FrameRenderer`], which draws the static panels once and overlays a
//!   moving playhead per video frame

pub mod canvas;
pub mod colormap;
pub mod frame;

pub use canvas::Rect;
pub use frame::{beat_intensity, layout_panels, FrameRenderer, RenderConfig};

/// Maps times in seconds to pixel columns of a panel span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    /// First pixel column.
    pub x0: u32,
    /// Number of pixel columns.
    pub width: u32,
    /// Time at the right edge, in seconds.
    pub duration: f64,
}

impl TimeAxis {
    pub fn new(x0: u32, width: u32, duration: f64) -> Self {
        Self { x0, width, duration }
    }

    /// Pixel column of time `t`; times outside `[0, duration]` clamp to the edges.
    pub fn x_for(&self, t: f64) -> u32 {
        if self.width == 0 {
            return self.x0;
        }
        let span = (self.width - 1) as f64;
        let frac = if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.x0 + (frac * span).round() as u32
    }

    /// Time at the center of pixel column `px`.
    pub fn time_at(&self, px: u32) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        let offset = px.saturating_sub(self.x0) as f64 + 0.5;
        (offset / self.width as f64 * self.duration).min(self.duration)
    }
}
