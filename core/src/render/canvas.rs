//! Raster primitives on an RGBA image.

use image::{Rgba, RgbaImage};
use ndarray::Array2;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// One past the last column.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the last row.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Row for a value in `0.0..=1.0`, 0 at the bottom edge, 1 at the top.
    pub fn y_for(&self, value: f32) -> u32 {
        let span = self.height.saturating_sub(1) as f32;
        let offset = ((1.0 - value.clamp(0.0, 1.0)) * span).round() as u32;
        self.y + offset
    }
}

/// Convert a `[0, 1]` RGB triple to an opaque pixel.
pub fn to_rgba(color: [f32; 3]) -> Rgba<u8> {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([c(color[0]), c(color[1]), c(color[2]), 255])
}

/// Linear blend of two pixels, `t = 0` gives `a`.
pub fn mix(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Rgba([
        lerp(a[0], b[0]),
        lerp(a[1], b[1]),
        lerp(a[2], b[2]),
        lerp(a[3], b[3]),
    ])
}

pub fn fill_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let right = rect.right().min(img.width());
    let bottom = rect.bottom().min(img.height());
    for y in rect.y..bottom {
        for x in rect.x..right {
            img.put_pixel(x, y, color);
        }
    }
}

/// Vertical line from `y0` to `y1` inclusive, clipped to the image.
pub fn vline(img: &mut RgbaImage, x: u32, y0: u32, y1: u32, color: Rgba<u8>) {
    if x >= img.width() {
        return;
    }
    let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
    for y in top..=bottom.min(img.height().saturating_sub(1)) {
        img.put_pixel(x, y, color);
    }
}

/// Vertical line blended over the existing pixels with opacity `alpha`.
pub fn blend_vline(img: &mut RgbaImage, x: u32, y0: u32, y1: u32, color: Rgba<u8>, alpha: f32) {
    if x >= img.width() {
        return;
    }
    let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
    for y in top..=bottom.min(img.height().saturating_sub(1)) {
        let under = *img.get_pixel(x, y);
        img.put_pixel(x, y, mix(under, color, alpha));
    }
}

/// Bresenham line between two points, clipped to the image.
pub fn line(img: &mut RgbaImage, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (w, h) = (img.width() as i64, img.height() as i64);

    loop {
        if (0..w).contains(&x0) && (0..h).contains(&y0) {
            img.put_pixel(x0 as u32, y0 as u32, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Polyline through one value per pixel column of `rect`.
///
/// `value_at(px)` returns the height in `0.0..=1.0` for pixel column `px`.
pub fn polyline<F>(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>, mut value_at: F)
where
    F: FnMut(u32) -> f32,
{
    let mut prev: Option<(i64, i64)> = None;
    for px in rect.x..rect.right() {
        let point = (px as i64, rect.y_for(value_at(px)) as i64);
        if let Some(p) = prev {
            line(img, p, point, color);
        }
        prev = Some(point);
    }
}

/// Draw `matrix` `(rows, cols)` into `rect`, row 0 at the bottom.
///
/// `column_at(px)` picks the matrix column shown in pixel column `px`; values
/// are mapped to colors by `color_of`.
pub fn heatmap<C, F>(img: &mut RgbaImage, rect: Rect, matrix: &Array2<f32>, mut column_at: C, color_of: F)
where
    C: FnMut(u32) -> usize,
    F: Fn(f32) -> Rgba<u8>,
{
    let (rows, cols) = matrix.dim();
    if rows == 0 || cols == 0 || rect.height == 0 {
        return;
    }

    let right = rect.right().min(img.width());
    let bottom = rect.bottom().min(img.height());
    for px in rect.x..right {
        let col = column_at(px).min(cols - 1);
        for py in rect.y..bottom {
            let from_bottom = rect.bottom() - 1 - py;
            let row = (from_bottom as usize * rows / rect.height as usize).min(rows - 1);
            img.put_pixel(px, py, color_of(matrix[(row, col)]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_y_for() {
        let r = Rect::new(0, 10, 100, 101);
        assert_eq!(r.y_for(1.0), 10);
        assert_eq!(r.y_for(0.0), 110);
        assert_eq!(r.y_for(0.5), 60);
        assert_eq!(r.y_for(2.0), 10);
    }

    #[test]
    fn test_to_rgba_and_mix() {
        assert_eq!(to_rgba([1.0, 0.0, 0.5]), Rgba([255, 0, 128, 255]));
        let a = Rgba([0, 0, 0, 255]);
        let b = Rgba([200, 100, 50, 255]);
        assert_eq!(mix(a, b, 0.5), Rgba([100, 50, 25, 255]));
        assert_eq!(mix(a, b, 0.0), a);
    }

    #[test]
    fn test_line_endpoints() {
        let mut img = RgbaImage::new(10, 10);
        let white = Rgba([255, 255, 255, 255]);
        line(&mut img, (1, 1), (8, 5), white);
        assert_eq!(*img.get_pixel(1, 1), white);
        assert_eq!(*img.get_pixel(8, 5), white);
        // Clipped segments do not panic.
        line(&mut img, (-5, -5), (20, 20), white);
    }

    #[test]
    fn test_heatmap_orientation() {
        let mut img = RgbaImage::new(2, 2);
        let matrix = Array2::from_shape_vec((2, 1), vec![0.0f32, 1.0]).unwrap();
        heatmap(&mut img, Rect::new(0, 0, 2, 2), &matrix, |_| 0, |v| {
            if v > 0.5 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        // Row 1 (value 1.0) is drawn at the top.
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(0, 1)[0], 0);
    }
}
