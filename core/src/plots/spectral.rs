//! Spectral descriptor curves.

use image::{Rgba, RgbaImage};
use ndarray::Array2;

use super::{Plot, PlotContext, PlotType};
use crate::render::canvas::{fill_rect, mix, polyline};
use crate::render::Rect;

const ZCR_COLOR: Rgba<u8> = Rgba([90, 200, 250, 255]);

/// Centroid and rolloff as fractions of Nyquist, zero-crossing rate scaled
/// to its own peak.
pub struct SpectralPlot;

fn row_max(row: &Array2<f32>) -> f32 {
    row.iter().copied().fold(0.0f32, f32::max)
}

impl Plot for SpectralPlot {
    fn plot_type(&self) -> PlotType {
        PlotType::Spectral
    }

    fn draw(&self, img: &mut RgbaImage, rect: Rect, ctx: &PlotContext<'_>) {
        fill_rect(img, rect, ctx.style.panel);

        let analysis = ctx.analysis;
        let nyquist = (analysis.sample_rate as f32 / 2.0).max(1.0);
        let zcr_peak = row_max(&analysis.zero_crossing_rate).max(f32::EPSILON);
        let rolloff_color = mix(ctx.style.foreground, ctx.style.marker, 0.6);

        let curves: [(&Array2<f32>, f32, Rgba<u8>); 3] = [
            (&analysis.rolloff, nyquist, rolloff_color),
            (&analysis.centroid, nyquist, ctx.style.foreground),
            (&analysis.zero_crossing_rate, zcr_peak, ZCR_COLOR),
        ];

        for (row, scale, color) in curves {
            if row.ncols() == 0 {
                continue;
            }
            let last = row.ncols() - 1;
            polyline(img, rect, color, |px| row[(0, ctx.frame_at(px).min(last))] / scale);
        }
    }
}
