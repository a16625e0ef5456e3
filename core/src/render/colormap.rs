//! Perceptual colormaps for heatmap panels.

use image::Rgba;

/// Magma-like stops from black through purple and orange to pale yellow.
const MAGMA: [[f32; 3]; 6] = [
    [0.001, 0.000, 0.014],
    [0.232, 0.060, 0.438],
    [0.550, 0.161, 0.506],
    [0.868, 0.288, 0.409],
    [0.994, 0.624, 0.427],
    [0.987, 0.991, 0.750],
];

/// Map `value` in `0.0..=1.0` to a magma color. Out-of-range values clamp.
pub fn magma(value: f32) -> Rgba<u8> {
    let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = v * (MAGMA.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(MAGMA.len() - 2);
    let t = scaled - i as f32;

    let (a, b) = (MAGMA[i], MAGMA[i + 1]);
    let channel = |k: usize| ((a[k] + (b[k] - a[k]) * t) * 255.0).round() as u8;
    Rgba([channel(0), channel(1), channel(2), 255])
}
