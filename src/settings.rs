use std::path::{Path, PathBuf};

use image::Rgba;

use crate::brush::{BlendMode, BrushOptions};
use crate::canvas::PAPER_WHITE;
use crate::regions::{Palette, ScanOrder, SegmentOptions};

/// Tunables shared by the segmenter, the palette and the brush.
/// Persisted as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Alpha below which a pixel seeds a region
    pub transparent_threshold: f32,
    /// Alpha above which a pixel is outline
    pub boundary_threshold: f32,
    pub scan_order: ScanOrder,

    // Palette
    pub palette_size: usize,
    pub palette_seed: u32,
    pub palette_saturation: f32,
    pub palette_value: f32,

    // Painting
    /// Paper color for new canvases
    pub base_color: Rgba<u8>,
    /// Multiplied into every brush sample
    pub brush_tint: Rgba<u8>,
    /// Soft ink instead of plain replace
    pub soft_ink: bool,
    pub soft_ink_strength: f32,
    /// Distance the pointer must travel before the brush turns
    pub facing_threshold: f32,
    /// Per-sample movement ignored as jitter
    pub facing_epsilon: f32,
    pub orient_to_stroke: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transparent_threshold: 0.01,
            boundary_threshold: 0.9,
            scan_order: ScanOrder::ColumnMajor,

            palette_size: 12,
            palette_seed: 0,
            palette_saturation: 0.8,
            palette_value: 0.9,

            base_color: PAPER_WHITE,
            brush_tint: Rgba([255, 255, 255, 255]),
            soft_ink: false,
            soft_ink_strength: BlendMode::DEFAULT_SOFT_STRENGTH,
            facing_threshold: 10.0,
            facing_epsilon: 0.5,
            orient_to_stroke: true,
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/regionpaint/regionpaint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\regionpaint\regionpaint_settings.cfg
    /// On macOS:   ~/Library/Application Support/regionpaint/regionpaint_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("regionpaint");
            return Some(config_dir.join("regionpaint_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("regionpaint")
                    .join("regionpaint_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("regionpaint")
                    .join("regionpaint_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("regionpaint_settings.cfg")))
        }
    }

    /// Serialize a color as "r,g,b,a"
    pub fn color_to_str(c: Rgba<u8>) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a color from "r,g,b,a" (alpha optional, defaults to 255)
    pub fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = match parts.get(3) {
            Some(a) => a.trim().parse::<u8>().ok()?,
            None => 255,
        };
        Some(Rgba([r, g, b, a]))
    }

    pub fn to_config_string(&self) -> String {
        let blend_str = if self.soft_ink { "soft" } else { "replace" };
        format!(
            "transparent_threshold={}\n\
             boundary_threshold={}\n\
             scan_order={}\n\
             palette_size={}\n\
             palette_seed={}\n\
             palette_saturation={}\n\
             palette_value={}\n\
             base_color={}\n\
             brush_tint={}\n\
             blend_mode={blend_str}\n\
             soft_ink_strength={}\n\
             facing_threshold={}\n\
             facing_epsilon={}\n\
             orient_to_stroke={}\n",
            self.transparent_threshold,
            self.boundary_threshold,
            self.scan_order.name(),
            self.palette_size,
            self.palette_seed,
            self.palette_saturation,
            self.palette_value,
            Self::color_to_str(self.base_color),
            Self::color_to_str(self.brush_tint),
            self.soft_ink_strength,
            self.facing_threshold,
            self.facing_epsilon,
            self.orient_to_stroke,
        )
    }

    /// Parse settings text. Unknown keys are ignored and unparsable values
    /// keep their defaults.
    pub fn parse(content: &str) -> Self {
        let d = Self::default();
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "transparent_threshold" => {
                    s.transparent_threshold = val.parse().unwrap_or(d.transparent_threshold);
                }
                "boundary_threshold" => {
                    s.boundary_threshold = val.parse().unwrap_or(d.boundary_threshold);
                }
                "scan_order" => {
                    s.scan_order = ScanOrder::from_name(val).unwrap_or(d.scan_order);
                }
                "palette_size" => {
                    s.palette_size = val.parse().unwrap_or(d.palette_size);
                }
                "palette_seed" => {
                    s.palette_seed = val.parse().unwrap_or(d.palette_seed);
                }
                "palette_saturation" => {
                    s.palette_saturation = val.parse().unwrap_or(d.palette_saturation);
                }
                "palette_value" => {
                    s.palette_value = val.parse().unwrap_or(d.palette_value);
                }
                "base_color" => {
                    if let Some(c) = Self::str_to_color(val) { s.base_color = c; }
                }
                "brush_tint" => {
                    if let Some(c) = Self::str_to_color(val) { s.brush_tint = c; }
                }
                "blend_mode" => {
                    s.soft_ink = match val {
                        "soft" => true,
                        "replace" => false,
                        _ => d.soft_ink,
                    };
                }
                "soft_ink_strength" => {
                    s.soft_ink_strength = val.parse().unwrap_or(d.soft_ink_strength);
                }
                "facing_threshold" => {
                    s.facing_threshold = val.parse().unwrap_or(d.facing_threshold);
                }
                "facing_epsilon" => {
                    s.facing_epsilon = val.parse().unwrap_or(d.facing_epsilon);
                }
                "orient_to_stroke" => {
                    s.orient_to_stroke = val.parse().unwrap_or(d.orient_to_stroke);
                }
                _ => {}
            }
        }
        s
    }

    /// Load settings from `path` (returns default if file missing or corrupt)
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Load settings from the platform location.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Save settings to the platform location
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        self.save_to(&path)
    }

    // ---- views for the subsystems -------------------------------------------

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            transparent_threshold: self.transparent_threshold,
            boundary_threshold: self.boundary_threshold,
            scan_order: self.scan_order,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::generate(
            self.palette_size,
            self.palette_saturation,
            self.palette_value,
            self.palette_seed,
        )
    }

    pub fn blend_mode(&self) -> BlendMode {
        if self.soft_ink {
            BlendMode::SoftInk {
                strength: self.soft_ink_strength,
            }
        } else {
            BlendMode::Replace
        }
    }

    pub fn brush_options(&self) -> BrushOptions {
        BrushOptions {
            blend: self.blend_mode(),
            tint: self.brush_tint,
            orient_to_stroke: self.orient_to_stroke,
            rotation: 0.0,
            facing_threshold: self.facing_threshold,
            facing_epsilon: self.facing_epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_text() {
        let s = Settings {
            scan_order: ScanOrder::RowMajor,
            palette_size: 5,
            palette_seed: 42,
            base_color: Rgba([1, 2, 3, 4]),
            soft_ink: true,
            soft_ink_strength: 0.5,
            orient_to_stroke: false,
            ..Settings::default()
        };
        assert_eq!(Settings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let s = Settings::parse(
            "palette_size=lots\n\
             boundary_threshold=0.75\n\
             base_color=300,0,0\n\
             scan_order=diagonal\n\
             unknown_key=1\n\
             not a setting\n",
        );
        assert_eq!(s.palette_size, 12);
        assert_eq!(s.boundary_threshold, 0.75);
        assert_eq!(s.base_color, PAPER_WHITE);
        assert_eq!(s.scan_order, ScanOrder::ColumnMajor);
    }

    #[test]
    fn test_bad_flags_keep_their_defaults() {
        let s = Settings::parse("orient_to_stroke=yes
blend_mode=sofft
");
        assert!(s.orient_to_stroke);
        assert!(!s.soft_ink);

        let s = Settings::parse("orient_to_stroke=false
blend_mode=soft
");
        assert!(!s.orient_to_stroke);
        assert!(s.soft_ink);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Settings::str_to_color("10, 20, 30"), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(Settings::str_to_color("1,2,3,4"), Some(Rgba([1, 2, 3, 4])));
        assert_eq!(Settings::str_to_color("1,2"), None);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("regionpaint_settings.cfg");
        let s = Settings {
            facing_threshold: 4.0,
            ..Settings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
        assert_eq!(Settings::load_from(&dir.path().join("missing.cfg")), Settings::default());
    }

    #[test]
    fn test_blend_mode_view() {
        let s = Settings {
            soft_ink: true,
            soft_ink_strength: 0.1,
            ..Settings::default()
        };
        assert_eq!(s.blend_mode(), BlendMode::SoftInk { strength: 0.1 });
        assert_eq!(Settings::default().brush_options().blend, BlendMode::Replace);
    }
}
