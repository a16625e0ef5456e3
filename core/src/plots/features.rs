//! Stacked feature heatmap.

use image::RgbaImage;
use ndarray::Array2;

use super::{Plot, PlotContext, PlotType};
use crate::render::canvas::{fill_rect, heatmap};
use crate::render::colormap::magma;
use crate::render::Rect;

/// MFCC, chroma and contrast rows, each scaled to its own range.
pub struct FeaturesPlot;

/// Min/max normalize every row independently. Constant rows become 0.
pub fn normalize_rows(matrix: &Array2<f32>) -> Array2<f32> {
    let mut out = matrix.clone();
    for mut row in out.rows_mut() {
        let (lo, hi) = row
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = hi - lo;
        if range > f32::EPSILON {
            row.mapv_inplace(|v| (v - lo) / range);
        } else {
            row.fill(0.0);
        }
    }
    out
}

impl Plot for FeaturesPlot {
    fn plot_type(&self) -> PlotType {
        PlotType::Features
    }

    fn draw(&self, img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>) {
        fill_rect(img, rect, ctx.style.panel);
        let normalized = normalize_rows(&ctx.analysis.features);
        heatmap(img, rect, &normalized, |px| ctx.frame_at(px), magma);
    }
}
