use image::{Rgba, RgbaImage};

use crate::regions::{Point, Region};

// ============================================================================
// CANVAS – fixed-size paint target
// ============================================================================

/// Opaque white, the default paper color.
pub const PAPER_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Mutable RGBA pixel buffer the brush paints into.
///
/// Dimensions are fixed at construction. Out-of-range writes are clipped
/// silently because brush stamps routinely overhang the edges.
#[derive(Clone, Debug)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    /// Create a canvas filled with `base`.
    pub fn new_filled(width: u32, height: u32, base: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, base),
        }
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        Self { pixels: img }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width() && (p.y as u32) < self.height()
    }

    /// Pixel at `p`, or `None` outside the canvas.
    #[inline]
    pub fn get_pixel(&self, p: Point) -> Option<Rgba<u8>> {
        if !self.contains(p) {
            return None;
        }
        Some(*self.pixels.get_pixel(p.x as u32, p.y as u32))
    }

    /// Write `color` at `p`. Returns false (and does nothing) when clipped.
    #[inline]
    pub fn put_pixel(&mut self, p: Point, color: Rgba<u8>) -> bool {
        if !self.contains(p) {
            return false;
        }
        self.pixels.put_pixel(p.x as u32, p.y as u32, color);
        true
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Paint every in-bounds pixel of `region` with `color`.
    pub fn fill_region(&mut self, region: &Region, color: Rgba<u8>) -> usize {
        region
            .points
            .iter()
            .filter(|p| self.put_pixel(**p, color))
            .count()
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.pixels
    }
}

// ============================================================================
// SURFACE MAPPING – widget-local coordinates ↔ canvas pixels
// ============================================================================

/// Size of the on-screen surface showing the canvas. Local coordinates have
/// their origin at the surface center, x right, y up the canvas rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceRect {
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Fractional canvas position of a local point (no rounding).
    pub fn to_canvas_f32(&self, local: (f32, f32), canvas_w: u32, canvas_h: u32) -> (f32, f32) {
        let dx = (local.0 + self.width / 2.0) / self.width;
        let dy = (local.1 + self.height / 2.0) / self.height;
        (dx * canvas_w as f32, dy * canvas_h as f32)
    }

    /// Nearest canvas pixel, unclamped. Used for stamp centers.
    pub fn to_pixel(&self, local: (f32, f32), canvas_w: u32, canvas_h: u32) -> Point {
        let (x, y) = self.to_canvas_f32(local, canvas_w, canvas_h);
        Point::new(x.round() as i32, y.round() as i32)
    }

    /// Truncated pixel clamped into the canvas. Used for picking a region.
    pub fn to_pixel_clamped(&self, local: (f32, f32), canvas_w: u32, canvas_h: u32) -> Point {
        let (x, y) = self.to_canvas_f32(local, canvas_w, canvas_h);
        let max_x = canvas_w.saturating_sub(1) as i32;
        let max_y = canvas_h.saturating_sub(1) as i32;
        Point::new((x as i32).clamp(0, max_x), (y as i32).clamp(0, max_y))
    }

    /// Local position of the pixel corner at `p`.
    pub fn to_local(&self, p: Point, canvas_w: u32, canvas_h: u32) -> (f32, f32) {
        let lx = (p.x as f32 / canvas_w as f32) * self.width - self.width / 2.0;
        let ly = (p.y as f32 / canvas_h as f32) * self.height - self.height / 2.0;
        (lx, ly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_canvas_is_paper() {
        let c = Canvas::new_filled(4, 3, PAPER_WHITE);
        assert_eq!(c.width(), 4);
        assert_eq!(c.height(), 3);
        assert_eq!(c.get_pixel(Point::new(3, 2)), Some(PAPER_WHITE));
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut c = Canvas::new_filled(2, 2, PAPER_WHITE);
        let red = Rgba([255, 0, 0, 255]);
        assert!(!c.put_pixel(Point::new(-1, 0), red));
        assert!(!c.put_pixel(Point::new(0, 2), red));
        assert!(c.put_pixel(Point::new(1, 1), red));
        assert_eq!(c.get_pixel(Point::new(2, 0)), None);
        assert_eq!(c.get_pixel(Point::new(1, 1)), Some(red));
    }

    #[test]
    fn test_fill_region_counts_written_pixels() {
        let mut c = Canvas::new_filled(2, 2, PAPER_WHITE);
        let mut r = Region::new(0, PAPER_WHITE);
        r.points.insert(Point::new(0, 0));
        r.points.insert(Point::new(5, 5));
        assert_eq!(c.fill_region(&r, Rgba([0, 0, 0, 255])), 1);
    }

    #[test]
    fn test_surface_mapping() {
        let s = SurfaceRect::new(200.0, 100.0);
        // Surface center maps to the canvas center.
        assert_eq!(s.to_pixel((0.0, 0.0), 100, 50), Point::new(50, 25));
        // Far corner clamps to the last pixel.
        assert_eq!(s.to_pixel_clamped((100.0, 50.0), 100, 50), Point::new(99, 49));
        assert_eq!(s.to_pixel_clamped((-500.0, 0.0), 100, 50), Point::new(0, 25));
        let local = s.to_local(Point::new(50, 25), 100, 50);
        assert_eq!(local, (0.0, 0.0));
    }
}
