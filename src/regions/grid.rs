use image::RgbaImage;

use super::{Point, RegionError};

/// Normalized per-pixel alpha of a source drawing, row-major.
#[derive(Clone, Debug)]
pub struct AlphaGrid {
    width: u32,
    height: u32,
    alpha: Vec<f32>,
}

impl AlphaGrid {
    /// Build from raw normalized alpha. `alpha.len()` must be `width * height`.
    pub fn new(width: u32, height: u32, alpha: Vec<f32>) -> Result<Self, RegionError> {
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(RegionError::GridSizeMismatch {
                expected,
                actual: alpha.len(),
            });
        }
        Ok(Self { width, height, alpha })
    }

    /// Uniform grid, handy for fixtures.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            alpha: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        let alpha = img.pixels().map(|p| p.0[3] as f32 / 255.0).collect();
        Self {
            width: img.width(),
            height: img.height(),
            alpha,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    /// Alpha at `p`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, p: Point) -> Option<f32> {
        if !self.in_bounds(p) {
            return None;
        }
        Some(self.alpha[p.y as usize * self.width as usize + p.x as usize])
    }

    pub fn set(&mut self, p: Point, value: f32) {
        if self.in_bounds(p) {
            let idx = p.y as usize * self.width as usize + p.x as usize;
            self.alpha[idx] = value;
        }
    }
}
