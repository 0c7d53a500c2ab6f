//! Drawing → regions → form file → region store → painted canvas.

use std::collections::HashSet;

use image::{Rgba, RgbaImage};

use regionpaint::brush::{BrushMask, BrushOptions};
use regionpaint::canvas::PAPER_WHITE;
use regionpaint::io::{load_region_store, save_forms};
use regionpaint::regions::{
    AlphaGrid, Palette, Point, RegionStore, SegmentOptions, decode, encode, segment,
};
use regionpaint::session::{PointerEvent, Session};

const LINE: Rgba<u8> = Rgba([0, 0, 0, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// 12x8 drawing: a closed 5x5 box outline at (1,1)-(5,5) and a vertical
/// stroke at x = 9.
fn drawing() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(12, 8, CLEAR);
    for i in 1..=5 {
        img.put_pixel(i, 1, LINE);
        img.put_pixel(i, 5, LINE);
        img.put_pixel(1, i, LINE);
        img.put_pixel(5, i, LINE);
    }
    for y in 0..8 {
        img.put_pixel(9, y, LINE);
    }
    img
}

fn palette() -> Palette {
    Palette::new(vec![
        Rgba([255, 0, 0, 255]),
        Rgba([0, 255, 0, 255]),
        Rgba([0, 0, 255, 255]),
    ])
}

#[test]
fn test_three_by_three_transparent_grid() {
    let grid = AlphaGrid::filled(3, 3, 0.0);
    let seg = segment(&grid, &palette(), &SegmentOptions::default(), 0).unwrap();
    assert_eq!(seg.regions.len(), 1);
    assert_eq!(seg.regions[0].len(), 9);
    assert_eq!(seg.regions[0].color, Rgba([255, 0, 0, 255]));
    assert_eq!(seg.next_color_index, 1);
}

#[test]
fn test_drawing_segments_into_disjoint_regions() {
    let grid = AlphaGrid::from_rgba_image(&drawing());
    let seg = segment(&grid, &palette(), &SegmentOptions::default(), 0).unwrap();

    // outside-left (wraps the box), box interior, right of the stroke
    assert_eq!(seg.regions.len(), 3);

    let mut seen: HashSet<Point> = HashSet::new();
    for region in &seg.regions {
        for p in &region.points {
            assert!(seen.insert(*p), "{:?} claimed twice", p);
        }
    }

    let interior = seg
        .regions
        .iter()
        .find(|r| r.contains(Point::new(3, 3)))
        .unwrap();
    // The outside region reaches the outline first, so the box keeps only
    // its 3x3 inside.
    assert_eq!(interior.len(), 9);
    assert!(seg.regions[0].contains(Point::new(1, 1)));
    assert!(seg.regions[0].contains(Point::new(9, 4)));
    assert_eq!(seg.regions[2].len(), 16);
    for region in &seg.regions {
        assert_eq!(decode(&encode(region.points.iter().copied())).unwrap(), region.points);
    }
}

#[test]
fn test_forms_file_into_session_paint() {
    let grid = AlphaGrid::from_rgba_image(&drawing());
    let seg = segment(&grid, &palette(), &SegmentOptions::default(), 0).unwrap();
    let forms: Vec<_> = seg.regions.iter().map(|r| r.encode()).collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drawing.rgnb");
    save_forms(&forms, &path).unwrap();
    let store: RegionStore = load_region_store(&path, &palette()).unwrap();
    assert_eq!(store.len(), seg.regions.len());
    for (a, b) in store.iter().zip(&seg.regions) {
        assert_eq!(a.points, b.points);
    }

    let ink = Rgba([10, 120, 30, 255]);
    let opts = BrushOptions {
        orient_to_stroke: false,
        ..BrushOptions::default()
    };
    let mut session = Session::new(store, 12, 8, PAPER_WHITE, BrushMask::solid(9, 9, ink), opts);

    // A big brush dragged across the box interior never leaves its region.
    session.replay(vec![
        PointerEvent::down(3.0, 3.0),
        PointerEvent::moved(3.0, 3.0),
        PointerEvent::moved(4.0, 4.0),
        PointerEvent::up(),
    ]);

    let interior = session.store.find_region(Point::new(3, 3)).unwrap().clone();
    for y in 0..8 {
        for x in 0..12 {
            let p = Point::new(x, y);
            let px = session.canvas().get_pixel(p).unwrap();
            if interior.contains(p) {
                assert_eq!(px, ink, "{:?} inside should be painted", p);
            } else {
                assert_eq!(px, PAPER_WHITE, "{:?} outside should be untouched", p);
            }
        }
    }
}
