// ============================================================================
// regionpaint CLI — batch segmentation, stroke replay and form inspection
// ============================================================================
//
// Usage examples:
//   regionpaint segment -i drawing.png -o drawing.json --preview
//   regionpaint segment -i "pages/*.png" --output-dir forms/ --packed
//   regionpaint paint --forms drawing.json --width 512 --height 512 \
//       --strokes strokes.json --brush tip.png --brush-size 24 -o painted.png
//   regionpaint inspect --forms drawing.rgnb
//
// Everything runs synchronously on the current thread except the per-region
// encode/decode inside the region store, which uses rayon.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use regionpaint::brush::{BlendMode, BrushMask};
use regionpaint::io::{
    PACKED_EXTENSION, load_forms, load_region_store, load_rgba_image, save_forms, save_rgba_image,
};
use regionpaint::regions::{
    AlphaGrid, Palette, Region, ScanOrder, SegmentOptions, Segmentation, decode, segment,
    segment_with_preview,
};
use regionpaint::session::{PointerEvent, Session};
use regionpaint::settings::Settings;
use regionpaint::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Paint-by-region toolkit.
#[derive(Parser, Debug)]
#[command(
    name = "regionpaint",
    about = "Segment line art into paintable regions and paint inside them",
    long_about = "Turn line-art images into run-length region forms, replay brush\n\
                  strokes against those forms, and inspect form files.\n\n\
                  Example:\n  \
                  regionpaint segment -i drawing.png -o drawing.json --preview\n  \
                  regionpaint paint --forms drawing.json --width 512 --height 512 \\\n    \
                  --strokes strokes.json -o painted.png"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, value_name = "FILE.cfg")]
    pub config: Option<PathBuf>,

    /// Print per-file progress and timing.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Segment images into region forms.
    Segment(SegmentArgs),
    /// Replay recorded pointer events against a form file and save the canvas.
    Paint(PaintArgs),
    /// Print per-region statistics of a form file.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "pages/*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output form file. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write `<stem>_preview.png` with every region flood-colored.
    #[arg(long)]
    pub preview: bool,

    /// Write packed `.rgnb` forms instead of JSON.
    #[arg(long)]
    pub packed: bool,

    /// Palette size (overrides the settings file).
    #[arg(long, value_name = "N")]
    pub colors: Option<usize>,

    /// Palette shuffle seed (overrides the settings file).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u32>,

    /// Seed scan order: column or row.
    #[arg(long, value_name = "ORDER")]
    pub scan: Option<String>,
}

#[derive(Args, Debug)]
pub struct PaintArgs {
    /// Form file (.json or .rgnb).
    #[arg(long, value_name = "FILE")]
    pub forms: PathBuf,

    /// Canvas width in pixels.
    #[arg(long)]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long)]
    pub height: u32,

    /// JSON array of pointer events: {"kind":"down|move|up","x":..,"y":..}.
    #[arg(long, value_name = "FILE")]
    pub strokes: PathBuf,

    /// Brush tip image. Without it a solid square tip is used.
    #[arg(long, value_name = "PNG")]
    pub brush: Option<PathBuf>,

    /// Brush tip size in pixels (square).
    #[arg(long, value_name = "PX")]
    pub brush_size: Option<u32>,

    /// Ink color "r,g,b[,a]". Tints an image tip; fills a solid tip.
    #[arg(long, value_name = "RGBA")]
    pub color: Option<String>,

    /// Blend softly instead of replacing pixels.
    #[arg(long)]
    pub soft: bool,

    /// Output image path.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Form file (.json or .rgnb).
    #[arg(long, value_name = "FILE")]
    pub forms: PathBuf,
}

/// Default solid tip edge length.
const DEFAULT_BRUSH_SIZE: u32 = 8;

/// Default ink for a solid tip.
const DEFAULT_INK: image::Rgba<u8> = image::Rgba([20, 20, 20, 255]);

// ============================================================================
// Public entry point
// ============================================================================

/// Run the selected subcommand and return an OS exit code.
/// `0` = success, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match &args.command {
        Command::Segment(a) => run_segment(a, &settings, args.verbose),
        Command::Paint(a) => run_paint(a, &settings, args.verbose),
        Command::Inspect(a) => run_inspect(a),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// segment
// ============================================================================

fn run_segment(args: &SegmentArgs, settings: &Settings, verbose: bool) -> Result<(), String> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err("no input files matched the given pattern(s).".into());
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(format!(
            "{} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        ));
    }

    let mut options = settings.segment_options();
    if let Some(name) = &args.scan {
        options.scan_order = ScanOrder::from_name(name)
            .ok_or_else(|| format!("unknown scan order '{}' (use column or row)", name))?;
    }
    let palette = Palette::generate(
        args.colors.unwrap_or(settings.palette_size),
        settings.palette_saturation,
        settings.palette_value,
        args.seed.unwrap_or(settings.palette_seed),
    );

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            format!("could not create output directory '{}': {}", dir.display(), e)
        })?;
    }

    let ext = if args.packed { PACKED_EXTENSION } else { "json" };
    let total = inputs.len();
    let multi = total > 1;
    let mut color_index = 0;
    let mut failures = 0;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            ext,
        ) else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            failures += 1;
            continue;
        };

        match segment_one(input_path, &output_path, &palette, &options, color_index, args.preview)
        {
            Ok(seg) => {
                color_index = seg.next_color_index;
                if verbose || multi {
                    println!(
                        "  → {} ({} regions, {:.0}ms)",
                        output_path.display(),
                        seg.regions.len(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("segment {}: {}", input_path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} file(s) failed", failures, total));
    }
    Ok(())
}

fn segment_one(
    input: &Path,
    output: &Path,
    palette: &Palette,
    options: &SegmentOptions,
    color_index: usize,
    preview: bool,
) -> Result<Segmentation, String> {
    let img = load_rgba_image(input)?;

    let seg = if preview {
        let (seg, preview_img) = segment_with_preview(&img, palette, options, color_index)
            .map_err(|e| format!("segmentation failed: {}", e))?;
        save_rgba_image(&preview_img, &preview_path(output))?;
        seg
    } else {
        let grid = AlphaGrid::from_rgba_image(&img);
        segment(&grid, palette, options, color_index)
            .map_err(|e| format!("segmentation failed: {}", e))?
    };

    let forms: Vec<_> = seg.regions.iter().map(|r| r.encode()).collect();
    save_forms(&forms, output).map_err(|e| format!("save failed: {}", e))?;
    log_info!(
        "segmented {} into {} regions",
        input.display(),
        seg.regions.len()
    );
    Ok(seg)
}

// ============================================================================
// paint
// ============================================================================

fn run_paint(args: &PaintArgs, settings: &Settings, verbose: bool) -> Result<(), String> {
    let start = Instant::now();

    let store = load_region_store(&args.forms, &settings.palette())
        .map_err(|e| format!("could not load forms '{}': {}", args.forms.display(), e))?;

    let color = match &args.color {
        Some(s) => Some(
            Settings::str_to_color(s).ok_or_else(|| format!("invalid color '{}'", s))?,
        ),
        None => None,
    };

    let mut options = settings.brush_options();
    if args.soft {
        options.blend = BlendMode::SoftInk {
            strength: settings.soft_ink_strength,
        };
    }

    let brush = match &args.brush {
        Some(path) => {
            let tip = load_rgba_image(path)?;
            if let Some(c) = color {
                options.tint = c;
            }
            match args.brush_size {
                Some(size) => BrushMask::resized(&tip, size, size),
                None => BrushMask::from_rgba_image(&tip),
            }
        }
        None => {
            let size = args.brush_size.unwrap_or(DEFAULT_BRUSH_SIZE).max(1);
            BrushMask::solid(size, size, color.unwrap_or(DEFAULT_INK))
        }
    };

    let json = std::fs::read_to_string(&args.strokes)
        .map_err(|e| format!("could not read strokes '{}': {}", args.strokes.display(), e))?;
    let events: Vec<PointerEvent> = serde_json::from_str(&json)
        .map_err(|e| format!("invalid strokes '{}': {}", args.strokes.display(), e))?;

    let mut session = Session::new(
        store,
        args.width,
        args.height,
        settings.base_color,
        brush,
        options,
    )
    .with_path(args.forms.clone());

    let written = session.replay(events.iter().copied());
    // A recording may end mid-stroke.
    session.pointer_up();

    save_rgba_image(session.canvas().as_rgba_image(), &args.output)?;
    session.mark_clean();

    if verbose {
        println!(
            "{}: {} events, {} pixels written → {} ({:.0}ms)",
            session.display_title(),
            events.len(),
            written,
            args.output.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

fn run_inspect(args: &InspectArgs) -> Result<(), String> {
    let forms = load_forms(&args.forms)
        .map_err(|e| format!("could not load forms '{}': {}", args.forms.display(), e))?;

    println!("{}: {} regions", args.forms.display(), forms.len());
    let mut total = 0;
    for (i, runs) in forms.iter().enumerate() {
        let points = decode(runs).map_err(|e| format!("form {}: {}", i, e))?;
        let region = Region::from_points(i, image::Rgba([0, 0, 0, 255]), points);
        total += region.len();
        match region.bounds() {
            Some((x0, y0, x1, y1)) => println!(
                "  #{:<4} {:>6} runs {:>8} px  ({},{})-({},{})",
                i,
                runs.len(),
                region.len(),
                x0,
                y0,
                x1,
                y1
            ),
            None => println!("  #{:<4} {:>6} runs {:>8} px", i, runs.len(), region.len()),
        }
    }
    println!("total: {} px", total);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the form output path for a single input image.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input, same stem, form extension
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    ext: &str,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}.{}", stem, ext)))
}

/// `forms/page.json` → `forms/page_preview.png`
fn preview_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "forms".to_string());
    let parent = output.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_preview.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_priority() {
        let input = Path::new("art/page.png");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.json")), None, "json"),
            Some(PathBuf::from("x.json"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), "rgnb"),
            Some(PathBuf::from("out/page.rgnb"))
        );
        assert_eq!(
            build_output_path(input, None, None, "json"),
            Some(PathBuf::from("art/page.json"))
        );
    }

    #[test]
    fn test_preview_path() {
        assert_eq!(
            preview_path(Path::new("forms/page.json")),
            PathBuf::from("forms/page_preview.png")
        );
    }

    #[test]
    fn test_resolve_inputs_dedups_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let a = dir.path().join("a.png").to_string_lossy().into_owned();
        let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
        let inputs = resolve_inputs(&[a.clone(), pattern]);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0], PathBuf::from(a));
    }

    #[test]
    fn test_parse_subcommands() {
        let args = CliArgs::try_parse_from([
            "regionpaint",
            "segment",
            "-i",
            "a.png",
            "--packed",
            "--scan",
            "row",
            "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Segment(s) => {
                assert!(s.packed);
                assert_eq!(s.scan.as_deref(), Some("row"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_segment_then_inspect_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("art.png");
        let mut img = image::RgbaImage::from_pixel(5, 3, image::Rgba([0, 0, 0, 0]));
        for y in 0..3 {
            img.put_pixel(2, y, image::Rgba([0, 0, 0, 255]));
        }
        img.save(&input).unwrap();

        let args = SegmentArgs {
            input: vec![input.to_string_lossy().into_owned()],
            output: None,
            output_dir: Some(dir.path().join("out")),
            preview: true,
            packed: false,
            colors: Some(3),
            seed: None,
            scan: None,
        };
        run_segment(&args, &Settings::default(), false).unwrap();

        let forms_path = dir.path().join("out").join("art.json");
        assert_eq!(load_forms(&forms_path).unwrap().len(), 2);
        assert!(dir.path().join("out").join("art_preview.png").exists());
        run_inspect(&InspectArgs { forms: forms_path }).unwrap();
    }
}
