// ============================================================================
// SEGMENTER — split a line drawing into fillable regions
// ============================================================================
//
// Every pixel whose alpha is below `transparent_threshold` and that has not
// been claimed yet seeds a new region. The region grows by a 4-connected DFS
// over an explicit Vec stack (no recursion, so large images cannot blow the
// call stack). Pixels above `boundary_threshold` are the drawn outline: they
// are claimed by whichever region reaches them first but never propagate.

use image::{Rgba, RgbaImage};

use super::{AlphaGrid, Palette, Point, Region, RegionError};
use crate::{log_info, log_warn};

/// Order in which seed pixels are visited. Determines which palette color
/// each region receives, so it is part of the output contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Outer loop ascending x, inner loop ascending y.
    #[default]
    ColumnMajor,
    /// Outer loop ascending y, inner loop ascending x.
    RowMajor,
}

impl ScanOrder {
    pub fn name(&self) -> &'static str {
        match self {
            ScanOrder::ColumnMajor => "column",
            ScanOrder::RowMajor => "row",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "column" | "col" | "column-major" => Some(ScanOrder::ColumnMajor),
            "row" | "row-major" => Some(ScanOrder::RowMajor),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SegmentOptions {
    /// Normalized alpha below which a pixel may seed a region.
    pub transparent_threshold: f32,
    /// Normalized alpha above which a pixel stops propagation.
    pub boundary_threshold: f32,
    pub scan_order: ScanOrder,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            transparent_threshold: 0.01,
            boundary_threshold: 0.9,
            scan_order: ScanOrder::ColumnMajor,
        }
    }
}

/// Result of one segmentation pass.
#[derive(Debug)]
pub struct Segmentation {
    pub regions: Vec<Region>,
    /// Palette cursor after the last region; feed it into the next call to
    /// keep cycling colors across several drawings.
    pub next_color_index: usize,
}

/// Segment `grid` into regions colored from `palette`, starting at
/// `color_index`.
pub fn segment(
    grid: &AlphaGrid,
    palette: &Palette,
    options: &SegmentOptions,
    color_index: usize,
) -> Result<Segmentation, RegionError> {
    run(grid, palette, options, color_index, None)
}

/// Like [`segment`], and additionally paints every visited non-boundary pixel
/// with its region color into a copy of `source`.
pub fn segment_with_preview(
    source: &RgbaImage,
    palette: &Palette,
    options: &SegmentOptions,
    color_index: usize,
) -> Result<(Segmentation, RgbaImage), RegionError> {
    let grid = AlphaGrid::from_rgba_image(source);
    let mut preview = source.clone();
    let seg = run(&grid, palette, options, color_index, Some(&mut preview))?;
    Ok((seg, preview))
}

fn run(
    grid: &AlphaGrid,
    palette: &Palette,
    options: &SegmentOptions,
    color_index: usize,
    mut preview: Option<&mut RgbaImage>,
) -> Result<Segmentation, RegionError> {
    if palette.is_empty() {
        log_warn!("segment: refusing to run with an empty palette");
        return Err(RegionError::EmptyPalette);
    }

    let w = grid.width() as usize;
    let h = grid.height() as usize;
    // Flat visited map; a global set keeps regions disjoint.
    let mut visited = vec![false; w * h];
    let mut regions: Vec<Region> = Vec::new();
    let mut cursor = color_index % palette.len();
    let mut stack: Vec<Point> = Vec::with_capacity(1024);

    let (outer, inner) = match options.scan_order {
        ScanOrder::ColumnMajor => (w, h),
        ScanOrder::RowMajor => (h, w),
    };

    for o in 0..outer {
        for i in 0..inner {
            let (x, y) = match options.scan_order {
                ScanOrder::ColumnMajor => (o, i),
                ScanOrder::RowMajor => (i, o),
            };
            if visited[y * w + x] {
                continue;
            }
            let seed = Point::new(x as i32, y as i32);
            let alpha = grid.get(seed).unwrap_or(1.0);
            if alpha >= options.transparent_threshold {
                continue;
            }

            let color = palette.color_for(cursor);
            let mut region = Region::new(regions.len(), color);
            flood_fill(
                grid,
                seed,
                options.boundary_threshold,
                &mut visited,
                &mut stack,
                &mut region,
                preview.as_deref_mut(),
            );
            regions.push(region);
            cursor = (cursor + 1) % palette.len();
        }
    }

    log_info!(
        "segment: {}x{} grid, {} regions, {} scan",
        w,
        h,
        regions.len(),
        options.scan_order.name()
    );

    Ok(Segmentation {
        regions,
        next_color_index: cursor,
    })
}

fn flood_fill(
    grid: &AlphaGrid,
    seed: Point,
    boundary_threshold: f32,
    visited: &mut [bool],
    stack: &mut Vec<Point>,
    region: &mut Region,
    mut preview: Option<&mut RgbaImage>,
) {
    let w = grid.width() as usize;
    let fill: Rgba<u8> = region.color;
    stack.clear();
    stack.push(seed);

    while let Some(p) = stack.pop() {
        let Some(alpha) = grid.get(p) else { continue };
        let vi = p.y as usize * w + p.x as usize;
        if visited[vi] {
            continue;
        }
        visited[vi] = true;
        region.points.insert(p);

        // Outline pixel: recorded, but the fill stops here.
        if alpha > boundary_threshold {
            continue;
        }
        if let Some(img) = preview.as_deref_mut() {
            img.put_pixel(p.x as u32, p.y as u32, fill);
        }

        // Duplicates are filtered on pop.
        stack.push(Point::new(p.x + 1, p.y));
        stack.push(Point::new(p.x - 1, p.y));
        stack.push(Point::new(p.x, p.y + 1));
        stack.push(Point::new(p.x, p.y - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn red() -> Rgba<u8> {
        Rgba([255, 0, 0, 255])
    }

    fn two_colors() -> Palette {
        Palette::new(vec![red(), Rgba([0, 0, 255, 255])])
    }

    /// Open 5x5 grid split by a full vertical outline at x = 2.
    fn split_grid() -> AlphaGrid {
        let mut g = AlphaGrid::filled(5, 5, 0.0);
        for y in 0..5 {
            g.set(Point::new(2, y), 1.0);
        }
        g
    }

    #[test]
    fn test_open_3x3_is_one_region() {
        let grid = AlphaGrid::filled(3, 3, 0.0);
        let seg = segment(&grid, &Palette::new(vec![red()]), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 1);
        assert_eq!(seg.regions[0].len(), 9);
        assert_eq!(seg.regions[0].color, red());
        assert_eq!(seg.next_color_index, 0);
    }

    #[test]
    fn test_empty_palette_fails_first() {
        let grid = AlphaGrid::filled(2, 2, 0.0);
        let err = segment(&grid, &Palette::default(), &SegmentOptions::default(), 0).unwrap_err();
        assert_eq!(err, RegionError::EmptyPalette);
    }

    #[test]
    fn test_outline_claimed_by_first_region() {
        let seg = segment(&split_grid(), &two_colors(), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 2);
        // Column-major: the left side is found first and reaches the outline.
        let left = &seg.regions[0];
        let right = &seg.regions[1];
        assert_eq!(left.len(), 15);
        assert_eq!(right.len(), 10);
        assert!(left.contains(Point::new(2, 0)));
        assert!(!right.contains(Point::new(2, 0)));
        assert_eq!(left.color, red());
        assert_eq!(seg.next_color_index, 0);
    }

    #[test]
    fn test_regions_disjoint_and_cover_grid() {
        let seg = segment(&split_grid(), &two_colors(), &SegmentOptions::default(), 0).unwrap();
        let mut seen = HashSet::new();
        for r in &seg.regions {
            for p in &r.points {
                assert!(seen.insert(*p), "{:?} claimed twice", p);
            }
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_single_pixel_region() {
        let g = AlphaGrid::filled(1, 1, 0.0);
        let seg = segment(&g, &two_colors(), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 1);
        assert_eq!(seg.regions[0].len(), 1);
    }

    #[test]
    fn test_enclosed_pixel_region() {
        // Transparent center fully enclosed by outline; corners are opaque too.
        let mut g = AlphaGrid::filled(3, 3, 1.0);
        g.set(Point::new(1, 1), 0.0);
        let seg = segment(&g, &two_colors(), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 1);
        // The center plus its four outline neighbors.
        assert_eq!(seg.regions[0].len(), 5);
        assert!(!seg.regions[0].contains(Point::new(0, 0)));
    }

    #[test]
    fn test_scan_order_changes_color_assignment() {
        // Outline row at y = 1 splits the grid into a top and bottom band.
        let mut g = AlphaGrid::filled(4, 3, 0.0);
        for x in 0..4 {
            g.set(Point::new(x, 1), 1.0);
        }
        // Make the top band start later in column-major order.
        g.set(Point::new(0, 0), 1.0);

        let col = segment(&g, &two_colors(), &SegmentOptions::default(), 0).unwrap();
        let row_opts = SegmentOptions {
            scan_order: ScanOrder::RowMajor,
            ..SegmentOptions::default()
        };
        let row = segment(&g, &two_colors(), &row_opts, 0).unwrap();

        // Column-major seeds at (0,2) first; row-major seeds at (1,0) first.
        assert!(col.regions[0].contains(Point::new(0, 2)));
        assert!(row.regions[0].contains(Point::new(1, 0)));
    }

    #[test]
    fn test_color_cursor_carries_over() {
        let seg = segment(&split_grid(), &two_colors(), &SegmentOptions::default(), 1).unwrap();
        assert_eq!(seg.regions[0].color, Rgba([0, 0, 255, 255]));
        assert_eq!(seg.regions[1].color, red());
        assert_eq!(seg.next_color_index, 1);
    }

    #[test]
    fn test_preview_skips_outline() {
        let mut src = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 0]));
        src.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let (seg, preview) =
            segment_with_preview(&src, &two_colors(), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 2);
        assert_eq!(*preview.get_pixel(0, 0), red());
        assert_eq!(*preview.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*preview.get_pixel(2, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_semi_transparent_pixels_propagate() {
        // Antialiased edge at 0.5 is neither a seed nor an outline.
        let mut g = AlphaGrid::filled(3, 1, 0.0);
        g.set(Point::new(1, 0), 0.5);
        let seg = segment(&g, &two_colors(), &SegmentOptions::default(), 0).unwrap();
        assert_eq!(seg.regions.len(), 1);
        assert_eq!(seg.regions[0].len(), 3);
    }
}
