//! Paint-by-region core: segment line art into fillable regions, ship them
//! as run-length forms, and paint inside them with a brush stamp.

pub mod logger;

pub mod brush;
pub mod canvas;
pub mod io;
pub mod regions;
pub mod session;
pub mod settings;

pub use brush::{BlendMode, BrushMask, BrushOptions, BrushRenderer};
pub use canvas::{Canvas, SurfaceRect};
pub use regions::{LineRun, Palette, Point, Region, RegionError, RegionStore};
pub use session::{PointerEvent, Session};
pub use settings::Settings;
