use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::regions::{LineRun, Palette, Point, RegionError, RegionStore, encode};
use crate::{log_info, log_warn};

/// Extension of packed (bincode) form files.
pub const PACKED_EXTENSION: &str = "rgnb";

/// Magic header for packed form files
const PACKED_MAGIC_V1: &str = "RGN1";

/// Maximum number of forms accepted from one file.
const MAX_FORMS: usize = 1 << 20;

/// Maximum pixels all forms of one file may cover together.
const MAX_TOTAL_PIXELS: usize = 1 << 28;

/// One region as shipped: its runs only. Colors come from the runtime
/// palette by array position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub lines: Vec<LineRun>,
}

/// Point written by the older editor export
#[derive(Deserialize)]
struct LegacyPoint {
    x: i32,
    y: i32,
}

/// Accepts both the run-length form and the legacy point-list form.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnyFormRecord {
    Runs { lines: Vec<LineRun> },
    Points { points: Vec<LegacyPoint> },
}

impl AnyFormRecord {
    fn into_runs(self) -> Vec<LineRun> {
        match self {
            AnyFormRecord::Runs { lines } => lines,
            AnyFormRecord::Points { points } => {
                encode(points.into_iter().map(|p| Point::new(p.x, p.y)))
            }
        }
    }
}

/// Packed serializable form file
#[derive(Serialize, Deserialize)]
struct PackedForms {
    magic: String,
    forms: Vec<Vec<LineRun>>,
}

/// Error type for form file operations
#[derive(Debug)]
pub enum FormIoError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
    Region(RegionError),
}

impl std::fmt::Display for FormIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormIoError::Io(e) => write!(f, "I/O error: {}", e),
            FormIoError::Serialize(e) => write!(f, "Serialization error: {}", e),
            FormIoError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
            FormIoError::Region(e) => write!(f, "Invalid region data: {}", e),
        }
    }
}

impl std::error::Error for FormIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormIoError::Io(e) => Some(e),
            FormIoError::Region(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FormIoError {
    fn from(e: std::io::Error) -> Self {
        FormIoError::Io(e)
    }
}

impl From<serde_json::Error> for FormIoError {
    fn from(e: serde_json::Error) -> Self {
        FormIoError::Serialize(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for FormIoError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        FormIoError::Serialize(e.to_string())
    }
}

impl From<RegionError> for FormIoError {
    fn from(e: RegionError) -> Self {
        FormIoError::Region(e)
    }
}

/// Reject the whole file on the first malformed run.
fn validate_forms(forms: &[Vec<LineRun>]) -> Result<(), FormIoError> {
    if forms.len() > MAX_FORMS {
        return Err(FormIoError::InvalidFormat(format!(
            "{} forms exceeds the limit of {}",
            forms.len(),
            MAX_FORMS
        )));
    }
    let mut total: usize = 0;
    for run in forms.iter().flatten() {
        run.validate()?;
        total = total.saturating_add(run.len());
    }
    if total > MAX_TOTAL_PIXELS {
        return Err(FormIoError::InvalidFormat(format!(
            "forms cover {} pixels, more than the limit of {}",
            total, MAX_TOTAL_PIXELS
        )));
    }
    Ok(())
}

// ============================================================================
// JSON FORMS
// ============================================================================

pub fn forms_to_json_string(forms: &[Vec<LineRun>]) -> Result<String, FormIoError> {
    let records: Vec<FormRecord> = forms
        .iter()
        .map(|lines| FormRecord { lines: lines.clone() })
        .collect();
    Ok(serde_json::to_string(&records)?)
}

/// Parse a JSON form array. Legacy `{"points":[...]}` records are re-encoded
/// into runs.
pub fn forms_from_json_str(json: &str) -> Result<Vec<Vec<LineRun>>, FormIoError> {
    let records: Vec<AnyFormRecord> = serde_json::from_str(json)?;
    let forms: Vec<Vec<LineRun>> = records.into_iter().map(AnyFormRecord::into_runs).collect();
    validate_forms(&forms)?;
    Ok(forms)
}

pub fn save_forms_json(forms: &[Vec<LineRun>], path: &Path) -> Result<(), FormIoError> {
    let json = forms_to_json_string(forms)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_forms_json(path: &Path) -> Result<Vec<Vec<LineRun>>, FormIoError> {
    let json = std::fs::read_to_string(path)?;
    forms_from_json_str(&json)
}

// ============================================================================
// PACKED FORMS
// ============================================================================

pub fn save_forms_packed(forms: &[Vec<LineRun>], path: &Path) -> Result<(), FormIoError> {
    let packed = PackedForms {
        magic: PACKED_MAGIC_V1.to_string(),
        forms: forms.to_vec(),
    };
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, &packed)?;
    Ok(())
}

pub fn load_forms_packed(path: &Path) -> Result<Vec<Vec<LineRun>>, FormIoError> {
    let raw = std::fs::read(path)?;
    if raw.len() < 12 {
        return Err(FormIoError::InvalidFormat("File too small".into()));
    }

    // bincode encodes a String as: 8-byte length prefix + UTF-8 data.
    // The magic string is 4 chars, so bytes 8..12 hold it.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != PACKED_MAGIC_V1 {
        return Err(FormIoError::InvalidFormat(format!("Unknown magic '{}'", magic)));
    }

    let packed: PackedForms = bincode::deserialize(&raw)?;
    validate_forms(&packed.forms)?;
    Ok(packed.forms)
}

// ============================================================================
// DISPATCH
// ============================================================================

fn is_packed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(PACKED_EXTENSION))
        .unwrap_or(false)
}

/// Save forms as JSON, or packed when the extension is `.rgnb`.
pub fn save_forms(forms: &[Vec<LineRun>], path: &Path) -> Result<(), FormIoError> {
    if is_packed(path) {
        save_forms_packed(forms, path)?;
    } else {
        save_forms_json(forms, path)?;
    }
    log_info!("saved {} forms to {}", forms.len(), path.display());
    Ok(())
}

pub fn load_forms(path: &Path) -> Result<Vec<Vec<LineRun>>, FormIoError> {
    let result = if is_packed(path) {
        load_forms_packed(path)
    } else {
        load_forms_json(path)
    };
    match &result {
        Ok(forms) => log_info!("loaded {} forms from {}", forms.len(), path.display()),
        Err(e) => log_warn!("failed to load forms from {}: {}", path.display(), e),
    }
    result
}

/// Load a form file straight into a colored [`RegionStore`].
pub fn load_region_store(path: &Path, palette: &Palette) -> Result<RegionStore, FormIoError> {
    let forms = load_forms(path)?;
    Ok(RegionStore::from_forms(&forms, palette)?)
}

// ============================================================================
// IMAGES
// ============================================================================

/// Load any raster format the `image` crate understands as RGBA8.
pub fn load_rgba_image(path: &Path) -> Result<RgbaImage, String> {
    let img = image::open(path).map_err(|e| format!("could not open '{}': {}", path.display(), e))?;
    Ok(img.into_rgba8())
}

/// Save an RGBA image; the format follows the file extension.
pub fn save_rgba_image(img: &RgbaImage, path: &Path) -> Result<(), String> {
    img.save(path)
        .map_err(|e| format!("could not write '{}': {}", path.display(), e))
}
