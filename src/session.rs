use std::path::PathBuf;

use image::Rgba;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::brush::{BrushMask, BrushOptions, BrushRenderer};
use crate::canvas::{Canvas, SurfaceRect};
use crate::log_info;
use crate::regions::{Point, Region, RegionStore};

/// Phase of a pointer sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// One input sample. Coordinates are canvas pixels, or surface-local when
/// the session has a [`SurfaceRect`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl PointerEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Down, x, y }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Move, x, y }
    }

    pub fn up() -> Self {
        Self { kind: PointerKind::Up, x: 0.0, y: 0.0 }
    }
}

/// Single paint-by-region document.
pub struct Session {
    pub id: Uuid,
    pub store: RegionStore,
    renderer: BrushRenderer,
    pub brush: BrushMask,
    /// Maps surface-local samples to canvas pixels; `None` = samples are
    /// already in canvas space.
    pub surface: Option<SurfaceRect>,
    base_color: Rgba<u8>,

    /// Region picked by the current stroke's pointer-down.
    selected: Option<usize>,
    /// Last sample of the current stroke, canvas space.
    last_pos: Option<(f32, f32)>,
    last_pixel: Option<Point>,

    /// Where the form data came from, if a file.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
}

impl Session {
    pub fn new(
        store: RegionStore,
        width: u32,
        height: u32,
        base_color: Rgba<u8>,
        brush: BrushMask,
        options: BrushOptions,
    ) -> Self {
        let id = Uuid::new_v4();
        log_info!(
            "session {}: {}x{} canvas, {} regions",
            id,
            width,
            height,
            store.len()
        );
        Self {
            id,
            store,
            renderer: BrushRenderer::new(Canvas::new_filled(width, height, base_color), options),
            brush,
            surface: None,
            base_color,
            selected: None,
            last_pos: None,
            last_pixel: None,
            path: None,
            is_dirty: false,
        }
    }

    pub fn with_surface(mut self, surface: SurfaceRect) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn canvas(&self) -> &Canvas {
        self.renderer.canvas()
    }

    pub fn renderer(&self) -> &BrushRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut BrushRenderer {
        &mut self.renderer
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.selected.and_then(|i| self.store.get(i))
    }

    pub fn is_stroke_active(&self) -> bool {
        self.renderer.stroke().is_active()
    }

    /// Sample position in canvas space.
    fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        match self.surface {
            Some(s) => {
                let c = self.renderer.canvas();
                s.to_canvas_f32((x, y), c.width(), c.height())
            }
            None => (x, y),
        }
    }

    /// Pixel used for region picking: truncated, clamped into the canvas.
    fn pick_pixel(&self, x: f32, y: f32) -> Point {
        let c = self.renderer.canvas();
        match self.surface {
            Some(s) => s.to_pixel_clamped((x, y), c.width(), c.height()),
            None => {
                let max_x = c.width().saturating_sub(1) as i32;
                let max_y = c.height().saturating_sub(1) as i32;
                Point::new((x as i32).clamp(0, max_x), (y as i32).clamp(0, max_y))
            }
        }
    }

    /// Start a stroke: select the region under the pointer. Returns the
    /// region index, or `None` if the stroke will paint nothing.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<usize> {
        let pick = self.pick_pixel(x, y);
        self.selected = self.store.find_region_index(pick);
        self.last_pos = None;
        self.last_pixel = None;
        if self.selected.is_some() {
            let at = self.to_canvas(x, y);
            self.renderer.begin_stroke(at);
        }
        self.selected
    }

    /// Continue the stroke. Samples that stay on the same pixel are dropped.
    /// Returns the number of pixels written.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> usize {
        let Some(index) = self.selected else { return 0 };
        let pixel = self.pick_pixel(x, y);
        if self.last_pixel == Some(pixel) {
            return 0;
        }
        self.last_pixel = Some(pixel);

        let pos = self.to_canvas(x, y);
        let from = self.last_pos.unwrap_or(pos);
        self.last_pos = Some(pos);

        let Some(region) = self.store.get(index) else { return 0 };
        let written = self.renderer.drag(&self.brush, from, pos, Some(region));
        if written > 0 {
            self.is_dirty = true;
        }
        written
    }

    /// End the stroke; painted pixels stay.
    pub fn pointer_up(&mut self) {
        self.selected = None;
        self.last_pos = None;
        self.last_pixel = None;
        self.renderer.end_stroke();
    }

    /// Dispatch one sample. Returns pixels written.
    pub fn apply(&mut self, event: PointerEvent) -> usize {
        match event.kind {
            PointerKind::Down => {
                self.pointer_down(event.x, event.y);
                0
            }
            PointerKind::Move => self.pointer_move(event.x, event.y),
            PointerKind::Up => {
                self.pointer_up();
                0
            }
        }
    }

    /// Replay a recorded sample stream. Returns total pixels written.
    pub fn replay<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = PointerEvent>,
    {
        events.into_iter().map(|e| self.apply(e)).sum()
    }

    /// Start over on blank paper.
    pub fn reset(&mut self) {
        let c = self.renderer.canvas();
        let fresh = Canvas::new_filled(c.width(), c.height(), self.base_color);
        self.renderer.replace_canvas(fresh);
        self.selected = None;
        self.last_pos = None;
        self.last_pixel = None;
        self.is_dirty = false;
    }

    /// Flood a whole region with `color`, e.g. to highlight a selection.
    pub fn region_overlay(&mut self, index: usize, color: Rgba<u8>) -> usize {
        let Some(region) = self.store.get(index) else { return 0 };
        let n = self.renderer.canvas_mut().fill_region(region, color);
        if n > 0 {
            self.is_dirty = true;
        }
        n
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Display name (derived from path or the session id)
    pub fn display_title(&self) -> String {
        let name = self
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("session-{}", &self.id.to_string()[..8]));
        if self.is_dirty {
            format!("{}*", name)
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PAPER_WHITE;
    use crate::regions::{LineRun, Palette};

    const INK: Rgba<u8> = Rgba([0, 90, 200, 255]);

    /// Two stacked bands on a 10x4 canvas: rows 0-1 and rows 2-3.
    fn session() -> Session {
        let forms = vec![
            vec![LineRun::new(0, 0, 9), LineRun::new(1, 0, 9)],
            vec![LineRun::new(2, 0, 9), LineRun::new(3, 0, 9)],
        ];
        let store = RegionStore::from_forms(&forms, &Palette::new(vec![INK])).unwrap();
        let opts = BrushOptions {
            orient_to_stroke: false,
            ..BrushOptions::default()
        };
        Session::new(store, 10, 4, PAPER_WHITE, BrushMask::solid(3, 3, INK), opts)
    }

    #[test]
    fn test_stroke_stays_in_selected_region() {
        let mut s = session();
        assert_eq!(s.pointer_down(1.0, 1.0), Some(0));
        s.pointer_move(1.0, 1.0);
        s.pointer_move(8.0, 1.0);
        s.pointer_up();
        for x in 0..10 {
            assert_eq!(s.canvas().get_pixel(Point::new(x, 1)), Some(INK));
            assert_eq!(s.canvas().get_pixel(Point::new(x, 2)), Some(PAPER_WHITE));
        }
        assert!(s.is_dirty);
        assert!(!s.is_stroke_active());
    }

    #[test]
    fn test_down_outside_regions_is_inert() {
        let forms = vec![vec![LineRun::new(0, 0, 1)]];
        let store = RegionStore::from_forms(&forms, &Palette::new(vec![INK])).unwrap();
        let mut s = Session::new(store, 4, 4, PAPER_WHITE, BrushMask::solid(1, 1, INK), BrushOptions::default());
        assert_eq!(s.pointer_down(3.0, 3.0), None);
        assert_eq!(s.pointer_move(0.0, 0.0), 0);
        assert!(!s.is_dirty);
    }

    #[test]
    fn test_same_pixel_samples_dropped() {
        let mut s = session();
        s.pointer_down(4.0, 1.0);
        assert!(s.pointer_move(4.2, 1.3) > 0);
        assert_eq!(s.pointer_move(4.4, 1.1), 0);
    }

    #[test]
    fn test_replay_events_and_reset() {
        let mut s = session();
        let n = s.replay(vec![
            PointerEvent::down(0.0, 3.0),
            PointerEvent::moved(0.0, 3.0),
            PointerEvent::moved(9.0, 3.0),
            PointerEvent::up(),
        ]);
        assert!(n > 0);
        assert_eq!(s.canvas().get_pixel(Point::new(5, 3)), Some(INK));
        assert_eq!(s.canvas().get_pixel(Point::new(5, 0)), Some(PAPER_WHITE));

        s.reset();
        assert_eq!(s.canvas().get_pixel(Point::new(5, 3)), Some(PAPER_WHITE));
        assert!(!s.is_dirty);
    }

    #[test]
    fn test_surface_samples_are_mapped() {
        // 20x8 surface over the 10x4 canvas; local (-6, -2) is pixel (2, 1).
        let mut s = session().with_surface(SurfaceRect::new(20.0, 8.0));
        assert_eq!(s.pointer_down(-6.0, -2.0), Some(0));
        assert!(s.pointer_move(-6.0, -2.0) > 0);
        assert_eq!(s.canvas().get_pixel(Point::new(2, 1)), Some(INK));
    }

    #[test]
    fn test_region_overlay() {
        let mut s = session();
        assert_eq!(s.region_overlay(1, INK), 20);
        assert_eq!(s.region_overlay(7, INK), 0);
        assert_eq!(s.canvas().get_pixel(Point::new(0, 3)), Some(INK));
    }

    #[test]
    fn test_event_json() {
        let e: PointerEvent = serde_json::from_str(r#"{"kind":"move","x":1.5,"y":2}"#).unwrap();
        assert_eq!(e, PointerEvent::moved(1.5, 2.0));
        let up: PointerEvent = serde_json::from_str(r#"{"kind":"up"}"#).unwrap();
        assert_eq!(up.kind, PointerKind::Up);
    }

    #[test]
    fn test_display_title() {
        let mut s = session().with_path(PathBuf::from("/tmp/forms.json"));
        assert_eq!(s.display_title(), "forms.json");
        s.is_dirty = true;
        assert_eq!(s.display_title(), "forms.json*");
    }
}
