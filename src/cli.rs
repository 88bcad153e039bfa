// ============================================================================
// InstaEdit CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   instaedit --input photo.png --preset vivid --output result.png
//   instaedit -i photo.jpg -o out.png                (format inferred from ext)
//   instaedit -i *.jpg --params edit.json --output-dir processed/ --format png
//   instaedit -i photo.png --params edit.json --mask mask.json -o out.png
//
// All processing runs synchronously on the current thread; only the pixel
// loops inside the engine fan out across cores.
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::io::{SaveFormat, TiffCompression, encode_and_write, load_image};
use crate::mask::Mask;
use crate::params::{FilterParams, TextProperties, preset};
use crate::session::EditSession;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// InstaEdit headless image processor.
///
/// Apply tone filters, rotation, a text overlay, and a behind-subject mask
/// composite to image files — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "instaedit",
    about = "InstaEdit headless batch photo editor",
    long_about = "Apply an edit parameter file (filters, rotation, text overlay) and an\n\
                  optional segmentation-mask composite to image files. Supports PNG,\n\
                  JPEG, WEBP, BMP, and TIFF output.\n\n\
                  Example:\n  \
                  instaedit --input photo.png --params edit.json --output result.png\n  \
                  instaedit -i *.jpg --preset vivid --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// JSON edit parameter file: `{"preset": ..., "filters": {...},
    /// "text": {...}, "rotation": ...}`. Every field optional.
    #[arg(short, long, value_name = "EDIT.json")]
    pub params: Option<PathBuf>,

    /// Built-in filter preset name (original, vivid, mono, warm, cool,
    /// crisp). Applied before any --params filters.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Rotation in degrees, applied on top of any --params rotation.
    #[arg(long, default_value_t = 0.0, value_name = "DEG")]
    pub rotate: f32,

    /// Segmentation mask file (JSON 2-D array of 0/1 rows, as returned by the
    /// mask service). Triggers the behind-subject composite after rendering.
    #[arg(long, value_name = "MASK.json")]
    pub mask: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's
    /// extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tiff.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// TIFF compression mode: none, lzw, deflate (default: none).
    #[arg(long, default_value = "none", value_name = "MODE")]
    pub tiff_compression: String,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Edit parameter file shape. Every field is optional; omitted fields keep
/// the session defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditSpec {
    preset: Option<String>,
    filters: Option<FilterParams>,
    text: Option<TextProperties>,
    rotation: f32,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = args
        .format
        .as_deref()
        .and_then(SaveFormat::from_name)
        .unwrap_or_else(|| {
            args.output
                .as_deref()
                .map(SaveFormat::from_path)
                .unwrap_or_default()
        });
    let tiff_compression = match args.tiff_compression.to_lowercase().as_str() {
        "lzw" => TiffCompression::Lzw,
        "deflate" => TiffCompression::Deflate,
        _ => TiffCompression::None,
    };

    let edit = match load_edit_spec(&args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mask = match &args.mask {
        Some(path) => match load_mask(path) {
            Ok(m) => Some(m),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                any_failure = true;
                continue;
            }
        };

        match run_one(
            input_path,
            &output_path,
            &edit,
            mask.as_ref(),
            save_format,
            args.quality,
            tiff_compression,
        ) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("{}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    edit: &EditSpec,
    mask: Option<&Mask>,
    format: SaveFormat,
    quality: u8,
    tiff_compression: TiffCompression,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let img = load_image(input).map_err(|e| format!("load failed: {}", e))?;
    log_info!("loaded {} ({}x{})", input.display(), img.width(), img.height());

    // -- Step 2: Session render ------------------------------------------
    let mut session = EditSession::new();
    session.load_image(img);

    if let Some(name) = &edit.preset {
        session.filters = preset(name).ok_or_else(|| format!("unknown preset '{}'", name))?;
    }
    if let Some(filters) = &edit.filters {
        session.filters = *filters;
    }
    if let Some(text) = &edit.text {
        // Keep the seeded center anchor unless the file positions the text.
        let (seed_x, seed_y) = (session.text.x, session.text.y);
        session.text = text.clone();
        if text.x == 0.0 && text.y == 0.0 {
            session.text.x = seed_x;
            session.text.y = seed_y;
        }
    }
    session.set_rotation(edit.rotation);

    session.render().ok_or("render produced no output")?;

    // -- Step 3: Behind-subject composite (optional) ----------------------
    if let Some(mask) = mask {
        session
            .composite_behind_subject(mask)
            .ok_or("behind-subject composite skipped (is a rotation active?)")?;
    }

    // -- Step 4: Save -----------------------------------------------------
    let out_img = session.working().ok_or("no rendered buffer to save")?;
    encode_and_write(out_img, output, format, quality, tiff_compression)
        .map_err(|e| format!("save failed: {}", e))?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_edit_spec(args: &CliArgs) -> Result<EditSpec, String> {
    let mut edit = match &args.params {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .map_err(|e| format!("could not read params '{}': {}", path.display(), e))?;
            serde_json::from_str(&src)
                .map_err(|e| format!("invalid params file '{}': {}", path.display(), e))?
        }
        None => EditSpec::default(),
    };
    if args.preset.is_some() && edit.preset.is_none() {
        edit.preset = args.preset.clone();
    }
    if preset_name_invalid(&edit) {
        return Err(format!("unknown preset '{}'", edit.preset.as_deref().unwrap_or("")));
    }
    edit.rotation += args.rotate;
    Ok(edit)
}

fn preset_name_invalid(edit: &EditSpec) -> bool {
    edit.preset.as_deref().is_some_and(|n| preset(n).is_none())
}

/// Parse a mask file: a JSON 2-D array of numbers where exactly 1 marks
/// foreground (the segmentation service serializes floats).
fn load_mask(path: &Path) -> Result<Mask, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read mask '{}': {}", path.display(), e))?;
    let rows: Vec<Vec<f64>> = serde_json::from_str(&src)
        .map_err(|e| format!("invalid mask file '{}': {}", path.display(), e))?;
    let rows: Vec<Vec<u8>> = rows
        .iter()
        .map(|r| r.iter().map(|&v| u8::from(v == 1.0)).collect())
        .collect();
    Mask::from_rows(&rows).ok_or_else(|| format!("mask '{}' is empty or ragged", path.display()))
}

/// Resolve glob patterns / literal paths to concrete files, preserving
/// argument order and skipping non-files.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for pattern in patterns {
        match glob::glob(pattern) {
            Ok(paths) => {
                let mut matched = false;
                for path in paths.flatten() {
                    if path.is_file() {
                        out.push(path);
                        matched = true;
                    }
                }
                // A literal path with glob metacharacters in its name still
                // resolves; a miss falls through to the literal check.
                if !matched {
                    let p = PathBuf::from(pattern);
                    if p.is_file() {
                        out.push(p);
                    }
                }
            }
            Err(_) => {
                let p = PathBuf::from(pattern);
                if p.is_file() {
                    out.push(p);
                }
            }
        }
    }
    out
}

fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(dir) = output_dir {
        let stem = input.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(format.extension());
        return Some(dir.join(name));
    }
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    // Neither flag: write next to the input as "<stem>_edited.<ext>",
    // mirroring the source's "edited-image.png" download naming.
    let stem = input.file_stem()?;
    let mut name = stem.to_os_string();
    name.push("_edited.");
    name.push(format.extension());
    Some(input.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_prefers_explicit_output() {
        let p = build_output_path(
            Path::new("in/a.png"),
            Some(Path::new("out.jpg")),
            None,
            SaveFormat::Png,
        );
        assert_eq!(p.unwrap(), PathBuf::from("out.jpg"));
    }

    #[test]
    fn output_path_in_dir_uses_stem_and_format_ext() {
        let p = build_output_path(
            Path::new("shots/photo.jpg"),
            None,
            Some(Path::new("out")),
            SaveFormat::Tiff,
        );
        assert_eq!(p.unwrap(), PathBuf::from("out/photo.tiff"));
    }

    #[test]
    fn output_path_default_appends_edited_suffix() {
        let p = build_output_path(Path::new("dir/pic.png"), None, None, SaveFormat::Png);
        assert_eq!(p.unwrap(), PathBuf::from("dir/pic_edited.png"));
    }

    #[test]
    fn edit_spec_parses_partial_json() {
        let edit: EditSpec = serde_json::from_str(
            r#"{"preset": "vivid", "rotation": 90.0, "filters": {"hue": 45.0}}"#,
        )
        .unwrap();
        assert_eq!(edit.preset.as_deref(), Some("vivid"));
        assert_eq!(edit.rotation, 90.0);
        assert_eq!(edit.filters.unwrap().hue, 45.0);
        assert!(edit.text.is_none());
    }
}
