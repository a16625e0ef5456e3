//! Waveform envelope panel.

use image::RgbaImage;

use super::{draw_markers, Plot, PlotContext, PlotType};
use crate::render::canvas::{fill_rect, vline};
use crate::render::Rect;

/// Min/max envelope of the signal per pixel column, peak-normalized, with
/// onset markers.
pub struct WaveformPlot;

impl Plot for WaveformPlot {
    fn plot_type(&self) -> PlotType {
        PlotType::Waveform
    }

    fn draw(&self, img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>) {
        fill_rect(img, rect, ctx.style.panel);

        let samples = ctx.samples;
        let n = samples.len();
        let width = ctx.axis.width.max(1) as usize;
        if n > 0 {
            let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs())).max(1e-6);

            for px in rect.x..rect.right() {
                let i = px.saturating_sub(ctx.axis.x0) as usize;
                let start = (i * n / width).min(n - 1);
                let end = ((i + 1) * n / width).clamp(start + 1, n);

                let (lo, hi) = samples[start..end]
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
                let to_unit = |v: f32| 0.5 + 0.5 * v / peak;
                vline(img, px, rect.y_for(to_unit(hi)), rect.y_for(to_unit(lo)), ctx.style.foreground);
            }
        }

        draw_markers(img, rect, ctx, &ctx.analysis.onset_times, 0.7);
    }
}
