// ============================================================================
// REGIONS — segmentation, run-length forms and the runtime region store
// ============================================================================

pub mod grid;
pub mod palette;
pub mod runs;
pub mod segment;
pub mod store;

use std::cmp::Ordering;
use std::collections::HashSet;

use image::Rgba;

pub use grid::AlphaGrid;
pub use palette::Palette;
pub use runs::{LineRun, decode, encode};
pub use segment::{ScanOrder, SegmentOptions, Segmentation, segment, segment_with_preview};
pub use store::RegionStore;

/// Integer pixel coordinate. Signed so that brush offsets may step past the
/// canvas edges before being clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Run order: rows first, then columns.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

pub type PointSet = HashSet<Point>;

/// One fillable area of the source drawing.
#[derive(Clone, Debug)]
pub struct Region {
    /// Position in segmentation (or file) order.
    pub id: usize,
    pub color: Rgba<u8>,
    pub points: PointSet,
}

impl Region {
    pub fn new(id: usize, color: Rgba<u8>) -> Self {
        Self {
            id,
            color,
            points: PointSet::new(),
        }
    }

    pub fn from_points(id: usize, color: Rgba<u8>, points: PointSet) -> Self {
        Self { id, color, points }
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.points.contains(&p)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Compact line-run form of this region's pixels.
    pub fn encode(&self) -> Vec<LineRun> {
        encode(self.points.iter().copied())
    }

    /// Inclusive bounding box `(min_x, min_y, max_x, max_y)`, `None` when empty.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut it = self.points.iter();
        let first = it.next()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(it.fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
        }))
    }
}

/// Error type for segmentation and form decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// Segmentation was asked to color regions from an empty palette.
    EmptyPalette,
    /// A line run whose end lies before its start.
    MalformedRun { y: i32, start_x: i32, end_x: i32 },
    /// Raw alpha data does not match the declared grid dimensions.
    GridSizeMismatch { expected: usize, actual: usize },
    /// Runs that would expand to more pixels than one region may hold.
    RegionTooLarge { pixels: usize, limit: usize },
}

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionError::EmptyPalette => write!(f, "palette is empty; cannot assign region colors"),
            RegionError::MalformedRun { y, start_x, end_x } => write!(
                f,
                "malformed run on row {}: endX {} is before startX {}",
                y, end_x, start_x
            ),
            RegionError::GridSizeMismatch { expected, actual } => write!(
                f,
                "alpha grid expects {} samples, got {}",
                expected, actual
            ),
            RegionError::RegionTooLarge { pixels, limit } => write!(
                f,
                "region of {} pixels exceeds the limit of {}",
                pixels, limit
            ),
        }
    }
}

impl std::error::Error for RegionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_orders_by_row_then_column() {
        let mut pts = vec![Point::new(3, 1), Point::new(0, 2), Point::new(1, 1)];
        pts.sort();
        assert_eq!(pts, vec![Point::new(1, 1), Point::new(3, 1), Point::new(0, 2)]);
    }

    #[test]
    fn test_region_bounds() {
        let mut r = Region::new(0, Rgba([0, 0, 0, 255]));
        assert_eq!(r.bounds(), None);
        r.points.insert(Point::new(2, 5));
        r.points.insert(Point::new(-1, 7));
        assert_eq!(r.bounds(), Some((-1, 5, 2, 7)));
    }

    #[test]
    fn test_malformed_run_message() {
        let e = RegionError::MalformedRun { y: 4, start_x: 9, end_x: 2 };
        assert!(e.to_string().contains("row 4"));
    }
}
