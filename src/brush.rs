// ============================================================================
// BRUSH — image-tip stamping with region gating and paint-once strokes
// ============================================================================
//
// A stamp walks every brush-mask pixel, rotates its offset from the mask
// center, and forward-maps it to the nearest canvas pixel. Destinations are
// dropped when they fall off the canvas, were already painted this stroke,
// sample zero alpha, or lie outside the constraining region.
//
// Drags are filled with stamps at every unit step between consecutive
// pointer samples, so fast strokes leave no gaps.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::canvas::Canvas;
use crate::regions::{Point, PointSet, Region};
use crate::{log_info, log_warn};

// ---------------------------------------------------------------------------
// Brush mask
// ---------------------------------------------------------------------------

/// Immutable RGBA stamp image.
#[derive(Clone, Debug)]
pub struct BrushMask {
    width: u32,
    height: u32,
    pixels: Vec<Rgba<u8>>,
}

impl BrushMask {
    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            pixels: img.pixels().copied().collect(),
        }
    }

    /// Load a tip scaled to `width × height`. Nearest-neighbour keeps hard
    /// mask edges hard.
    pub fn resized(img: &RgbaImage, width: u32, height: u32) -> Self {
        if img.width() == width && img.height() == height {
            return Self::from_rgba_image(img);
        }
        let scaled = imageops::resize(img, width.max(1), height.max(1), FilterType::Nearest);
        Self::from_rgba_image(&scaled)
    }

    /// Rectangle of a single color.
    pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> Rgba<u8> {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Channel-wise multiply of a mask sample by the brush tint.
#[inline]
fn tint_sample(sample: Rgba<u8>, tint: Rgba<u8>) -> Rgba<u8> {
    let mul = |a: u8, b: u8| ((a as u16 * b as u16 + 127) / 255) as u8;
    Rgba([
        mul(sample[0], tint[0]),
        mul(sample[1], tint[1]),
        mul(sample[2], tint[2]),
        mul(sample[3], tint[3]),
    ])
}

// ---------------------------------------------------------------------------
// Blending
// ---------------------------------------------------------------------------

/// How a brush sample combines with the destination pixel.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum BlendMode {
    /// Destination takes the brush color, fully opaque.
    #[default]
    Replace,
    /// Existing color moves toward the brush color by `alpha * strength`,
    /// then is forced opaque. Small strengths give a soft, layered ink.
    SoftInk { strength: f32 },
}

impl BlendMode {
    pub const DEFAULT_SOFT_STRENGTH: f32 = 0.25;

    pub fn soft() -> Self {
        BlendMode::SoftInk {
            strength: Self::DEFAULT_SOFT_STRENGTH,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Replace => "replace",
            BlendMode::SoftInk { .. } => "soft",
        }
    }

    #[inline]
    pub fn blend(&self, existing: Rgba<u8>, brush: Rgba<u8>) -> Rgba<u8> {
        match *self {
            BlendMode::Replace => Rgba([brush[0], brush[1], brush[2], 255]),
            BlendMode::SoftInk { strength } => {
                let t = (brush[3] as f32 / 255.0 * strength).clamp(0.0, 1.0);
                let lerp = |e: u8, b: u8| {
                    let v = e as f32 + (b as f32 - e as f32) * t;
                    v.round().clamp(0.0, 255.0) as u8
                };
                Rgba([
                    lerp(existing[0], brush[0]),
                    lerp(existing[1], brush[1]),
                    lerp(existing[2], brush[2]),
                    255,
                ])
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Single stamp
// ---------------------------------------------------------------------------

/// Nearest pixel, ties toward +inf so even-sized masks stay contiguous.
#[inline]
fn to_pixel(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

/// Stamp `brush` centered on `center`, rotated by `rotation` radians.
///
/// * `region` – when set, only its member pixels may change.
/// * `painted` – when set, pixels already in it are skipped and every
///   written pixel is added (paint once per stroke).
///
/// Returns the number of pixels written.
#[allow(clippy::too_many_arguments)]
pub fn stamp(
    canvas: &mut Canvas,
    brush: &BrushMask,
    center: Point,
    rotation: f32,
    tint: Rgba<u8>,
    region: Option<&Region>,
    mut painted: Option<&mut PointSet>,
    blend: BlendMode,
) -> usize {
    let half_w = brush.width as f32 / 2.0;
    let half_h = brush.height as f32 / 2.0;
    let rotated = rotation.abs() > 1e-4;
    let (sin_a, cos_a) = if rotated { rotation.sin_cos() } else { (0.0, 1.0) };

    let mut written = 0;
    for by in 0..brush.height {
        for bx in 0..brush.width {
            // Offset of the mask pixel center from the mask center
            let ox = bx as f32 + 0.5 - half_w;
            let oy = by as f32 + 0.5 - half_h;
            let (rx, ry) = if rotated {
                (ox * cos_a - oy * sin_a, ox * sin_a + oy * cos_a)
            } else {
                (ox, oy)
            };
            let dst = Point::new(
                to_pixel(center.x as f32 + rx),
                to_pixel(center.y as f32 + ry),
            );

            if !canvas.contains(dst) {
                continue;
            }
            if let Some(set) = painted.as_deref()
                && set.contains(&dst)
            {
                continue;
            }
            let color = tint_sample(brush.sample(bx, by), tint);
            if color[3] == 0 {
                continue;
            }
            if let Some(r) = region
                && !r.contains(dst)
            {
                continue;
            }

            let Some(existing) = canvas.get_pixel(dst) else { continue };
            canvas.put_pixel(dst, blend.blend(existing, color));
            if let Some(set) = painted.as_deref_mut() {
                set.insert(dst);
            }
            written += 1;
        }
    }
    written
}

// ---------------------------------------------------------------------------
// Stroke state
// ---------------------------------------------------------------------------

/// Facing of the brush along a stroke, with hysteresis against jitter.
#[derive(Clone, Debug)]
pub struct Facing {
    /// Radians, 0 = facing +x.
    pub angle: f32,
    anchor: Option<(f32, f32)>,
    /// Displacement from the anchor needed before the angle is recomputed.
    pub threshold: f32,
    /// Per-sample movement below this is ignored entirely.
    pub epsilon: f32,
}

impl Default for Facing {
    fn default() -> Self {
        Self {
            angle: 0.0,
            anchor: None,
            threshold: 10.0,
            epsilon: 0.5,
        }
    }
}

impl Facing {
    pub fn new(threshold: f32, epsilon: f32) -> Self {
        Self {
            threshold,
            epsilon,
            ..Self::default()
        }
    }

    pub fn reset(&mut self, at: Option<(f32, f32)>) {
        self.anchor = at;
    }

    /// Feed a sample reached by moving `delta` since the previous one.
    /// Returns true when the angle changed.
    pub fn observe(&mut self, pos: (f32, f32), delta: (f32, f32)) -> bool {
        if delta.0.hypot(delta.1) <= self.epsilon {
            return false;
        }
        let Some(anchor) = self.anchor else {
            self.anchor = Some(pos);
            return false;
        };
        let (dx, dy) = (pos.0 - anchor.0, pos.1 - anchor.1);
        if dx.hypot(dy) <= self.threshold {
            return false;
        }
        self.angle = dy.atan2(dx);
        self.anchor = Some(pos);
        true
    }
}

/// Per-stroke bookkeeping: pixels painted so far and the brush facing.
#[derive(Clone, Debug, Default)]
pub struct StrokeState {
    pub painted: PointSet,
    pub facing: Facing,
    active: bool,
}

impl StrokeState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self, at: (f32, f32)) {
        self.painted.clear();
        self.facing.angle = 0.0;
        self.facing.reset(Some(at));
        self.active = true;
    }

    pub fn end(&mut self) {
        self.painted.clear();
        self.facing.reset(None);
        self.active = false;
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct BrushOptions {
    pub blend: BlendMode,
    /// Multiplied into every mask sample.
    pub tint: Rgba<u8>,
    /// Rotate stamps to follow the stroke direction.
    pub orient_to_stroke: bool,
    /// Fixed rotation (radians) used when not orienting to the stroke.
    pub rotation: f32,
    pub facing_threshold: f32,
    pub facing_epsilon: f32,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self {
            blend: BlendMode::Replace,
            tint: Rgba([255, 255, 255, 255]),
            orient_to_stroke: true,
            rotation: 0.0,
            facing_threshold: 10.0,
            facing_epsilon: 0.5,
        }
    }
}

/// Owns the canvas and the current stroke; all painting goes through here.
pub struct BrushRenderer {
    canvas: Canvas,
    stroke: StrokeState,
    pub options: BrushOptions,
}

impl BrushRenderer {
    pub fn new(canvas: Canvas, options: BrushOptions) -> Self {
        let stroke = StrokeState {
            facing: Facing::new(options.facing_threshold, options.facing_epsilon),
            ..StrokeState::default()
        };
        Self {
            canvas,
            stroke,
            options,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    /// Swap in a fresh canvas, ending any stroke in progress.
    pub fn replace_canvas(&mut self, canvas: Canvas) {
        self.stroke.end();
        self.canvas = canvas;
    }

    pub fn stroke(&self) -> &StrokeState {
        &self.stroke
    }

    pub fn begin_stroke(&mut self, at: (f32, f32)) {
        self.stroke.facing.threshold = self.options.facing_threshold;
        self.stroke.facing.epsilon = self.options.facing_epsilon;
        self.stroke.begin(at);
    }

    /// Ends the stroke. Paint already applied stays.
    pub fn end_stroke(&mut self) {
        if self.stroke.is_active() {
            log_info!("stroke ended: {} pixels painted", self.stroke.painted.len());
        }
        self.stroke.end();
    }

    fn current_rotation(&self) -> f32 {
        if self.options.orient_to_stroke {
            self.stroke.facing.angle
        } else {
            self.options.rotation
        }
    }

    /// One stamp at `center`. Paint-once applies while a stroke is active.
    pub fn stamp_at(&mut self, brush: &BrushMask, center: Point, region: Option<&Region>) -> usize {
        let rotation = self.current_rotation();
        let painted = if self.stroke.is_active() {
            Some(&mut self.stroke.painted)
        } else {
            None
        };
        stamp(
            &mut self.canvas,
            brush,
            center,
            rotation,
            self.options.tint,
            region,
            painted,
            self.options.blend,
        )
    }

    /// Stamp along the segment `from → to` (canvas space) at unit steps.
    pub fn drag(
        &mut self,
        brush: &BrushMask,
        from: (f32, f32),
        to: (f32, f32),
        region: Option<&Region>,
    ) -> usize {
        let raw = (to.0 - from.0).hypot(to.1 - from.1);
        if !raw.is_finite() {
            log_warn!("drag: ignoring non-finite segment {:?} -> {:?}", from, to);
            return 0;
        }
        if raw == 0.0 {
            let c = Point::new(to_pixel(to.0), to_pixel(to.1));
            return self.stamp_at(brush, c, region);
        }

        // Only the part within brush reach of the canvas can paint anything.
        let reach = (brush.width as f32).hypot(brush.height as f32) / 2.0 + 1.0;
        let min = (-reach, -reach);
        let max = (
            self.canvas.width() as f32 - 1.0 + reach,
            self.canvas.height() as f32 - 1.0 + reach,
        );
        let Some((from, to)) = clip_segment(from, to, min, max) else {
            return 0;
        };

        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.hypot(dy).ceil() as usize;
        if steps == 0 {
            let c = Point::new(to_pixel(to.0), to_pixel(to.1));
            return self.stamp_at(brush, c, region);
        }

        let mut written = 0;
        let mut prev = from;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let p = (from.0 + dx * t, from.1 + dy * t);
            if self.options.orient_to_stroke {
                self.stroke.facing.observe(p, (p.0 - prev.0, p.1 - prev.1));
            }
            prev = p;
            let c = Point::new(to_pixel(p.0), to_pixel(p.1));
            written += self.stamp_at(brush, c, region);
        }
        written
    }
}

/// Liang-Barsky clip of `from → to` against the box `min..=max`.
/// `None` when the segment misses the box.
fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    min: (f32, f32),
    max: (f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, x0 - min.0 as f64),
        (dx, max.0 as f64 - x0),
        (-dy, y0 - min.1 as f64),
        (dy, max.1 as f64 - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            // Parallel to this edge: inside or entirely out.
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| ((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    Some((at(t0), at(t1)))
}
