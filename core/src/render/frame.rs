//! Frame composition: static panels plus a moving playhead.

use image::{Rgba, RgbaImage};

use super::canvas::{fill_rect, mix, to_rgba, vline, Rect};
use super::TimeAxis;
use crate::analysis::KeypointAnalysis;
use crate::plots::{create_plot, PlotContext, PlotStyle, PlotType};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Beats within this many seconds of the playhead light it up.
const BEAT_WINDOW: f64 = 0.1;

/// Layout and colors of a rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Panels from top to bottom.
    pub plots: Vec<PlotType>,
    pub foreground: [f32; 3],
    pub background: [f32; 3],
    pub playhead: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            plots: PlotType::all().to_vec(),
            foreground: [0.0, 1.0, 0.53],
            background: [0.0, 0.0, 0.0],
            playhead: [1.0, 0.25, 0.25],
        }
    }
}

/// Stack `count` full-width panels vertically with a margin and small gaps.
pub fn layout_panels(width: u32, height: u32, count: usize) -> Vec<Rect> {
    if count == 0 || width == 0 || height == 0 {
        return Vec::new();
    }
    let count_u = count as u32;
    let margin = (width.min(height) / 40).max(1);
    let gap = margin / 2;

    let inner_width = width.saturating_sub(2 * margin);
    let available = height.saturating_sub(2 * margin + gap * (count_u - 1));
    let panel_height = available / count_u;

    (0..count_u)
        .map(|i| Rect::new(margin, margin + i * (panel_height + gap), inner_width, panel_height))
        .collect()
}

/// Playhead highlight at time `t`: 1.0 on a beat, fading linearly to 0 at
/// 100 ms away from the nearest beat.
pub fn beat_intensity(t: f64, beats: &[f64]) -> f32 {
    beats
        .iter()
        .map(|&b| {
            let diff = (t - b).abs();
            if diff < BEAT_WINDOW {
                (1.0 - diff / BEAT_WINDOW) as f32
            } else {
                0.0
            }
        })
        .fold(0.0f32, f32::max)
}

/// Renders video frames for one analyzed track.
///
/// The panels are rasterized once in [`FrameRenderer::new`]; each
/// [`render_frame`](FrameRenderer::render_frame) call only copies them and
/// draws the playhead.
pub struct FrameRenderer {
    base: RgbaImage,
    panels: Vec<Rect>,
    axis: TimeAxis,
    beats: Vec<f64>,
    playhead: Rgba<u8>,
}

impl FrameRenderer {
    pub fn new(analysis: &KeypointAnalysis, samples: &[f32], config: &RenderConfig) -> Self {
        let background = to_rgba(config.background);
        let foreground = to_rgba(config.foreground);
        let style = PlotStyle {
            foreground,
            background,
            panel: mix(background, foreground, 0.06),
            marker: WHITE,
        };

        let mut base = RgbaImage::new(config.width, config.height);
        fill_rect(&mut base, Rect::new(0, 0, config.width, config.height), background);

        let panels = layout_panels(config.width, config.height, config.plots.len());
        let axis = match panels.first() {
            Some(r) => TimeAxis::new(r.x, r.width, analysis.duration),
            None => TimeAxis::new(0, config.width, analysis.duration),
        };

        let ctx = PlotContext {
            analysis,
            samples,
            axis,
            style: &style,
        };
        for (&plot_type, &rect) in config.plots.iter().zip(&panels) {
            create_plot(plot_type).draw(&mut base, rect, &ctx);
            log::debug!("Drew {} panel at {:?}", plot_type.name(), rect);
        }
        log::info!(
            "Rasterized {} panels at {}x{}",
            panels.len(),
            config.width,
            config.height
        );

        Self {
            base,
            panels,
            axis,
            beats: analysis.beat_times.clone(),
            playhead: to_rgba(config.playhead),
        }
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    pub fn panels(&self) -> &[Rect] {
        &self.panels
    }

    pub fn axis(&self) -> TimeAxis {
        self.axis
    }

    /// The static panels without a playhead.
    pub fn background(&self) -> &RgbaImage {
        &self.base
    }

    /// Playhead color at time `t`, brightened toward white near beats.
    pub fn playhead_color(&self, t: f64) -> Rgba<u8> {
        mix(self.playhead, WHITE, beat_intensity(t, &self.beats))
    }

    /// Frame at time `t` seconds.
    pub fn render_frame(&self, t: f64) -> RgbaImage {
        let mut frame = self.base.clone();

        let x = self.axis.x_for(t);
        let intensity = beat_intensity(t, &self.beats);
        let color = mix(self.playhead, WHITE, intensity);
        let thickness = 2 + (2.0 * intensity).round() as u32;

        for rect in self.panels.iter().filter(|r| r.height > 0) {
            let left = x.saturating_sub(thickness / 2).max(rect.x);
            let right = (left + thickness).min(rect.right());
            for px in left..right {
                vline(&mut frame, px, rect.y, rect.bottom() - 1, color);
            }
        }

        frame
    }
}
