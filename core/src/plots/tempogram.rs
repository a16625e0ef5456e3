//! Tempogram heatmap panel.

use image::RgbaImage;

use super::{draw_markers, Plot, PlotContext, PlotType};
use crate::render::canvas::{fill_rect, heatmap};
use crate::render::colormap::magma;
use crate::render::Rect;

/// Tempogram with lag 0 at the bottom and beat markers on top.
pub struct TempogramPlot;

impl Plot for TempogramPlot {
    fn plot_type(&self) -> PlotType {
        PlotType::Tempogram
    }

    fn draw(&self, img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>) {
        fill_rect(img, rect, ctx.style.panel);
        heatmap(img, rect, &ctx.analysis.tempogram, |px| ctx.frame_at(px), magma);
        draw_markers(img, rect, ctx, &ctx.analysis.beat_times, 0.5);
    }
}
