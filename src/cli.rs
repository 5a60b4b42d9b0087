// ============================================================================
// CompareFE CLI — headless difference / ELA rendering via command-line flags
// ============================================================================
//
// Usage examples:
//   comparefe --diff before.png after.png -o diff.png
//   comparefe --ela photo.jpg -o ela.png --quality 90 --scale 40
//   comparefe --ela photo.jpg                       (writes photo_ela.png next to input)
//
// No GUI is opened in CLI mode. Pixel work still runs on the rayon pool, but
// the invocation itself is synchronous: load, compute, write, exit.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{encode_and_write, load_image};
use crate::ops::{diff, ela};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// CompareFE headless comparison renderer.
///
/// Render difference maps and error-level-analysis views without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "comparefe",
    about = "CompareFE headless comparison renderer",
    long_about = "Render a pixel difference map of two images, or an error level\n\
                  analysis (ELA) view of one image, without opening the GUI.\n\
                  Supports PNG, JPEG, WEBP, BMP, and TIFF inputs.\n\n\
                  Example:\n  \
                  comparefe --diff before.png after.png -o diff.png\n  \
                  comparefe --ela photo.jpg --quality 90 --scale 40"
)]
pub struct CliArgs {
    /// Compute the difference map of two images (A then B).
    /// Mismatched sizes are contain-fitted into a max-dimensions frame first.
    #[arg(long, num_args = 2, value_names = ["IMAGE_A", "IMAGE_B"], conflicts_with = "ela")]
    pub diff: Option<Vec<PathBuf>>,

    /// Compute the error level analysis view of one image.
    #[arg(long, value_name = "IMAGE")]
    pub ela: Option<PathBuf>,

    /// Output file path. PNG unless the extension says .jpg/.jpeg.
    /// Defaults to "<first input stem>_diff.png" / "<stem>_ela.png" next to the input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// JPEG re-encode quality used by the ELA pass (1-100).
    #[arg(short, long, default_value_t = ela::DEFAULT_QUALITY, value_name = "1-100")]
    pub quality: u8,

    /// Residual amplification factor used by the ELA pass.
    #[arg(short, long, default_value_t = ela::DEFAULT_SCALE, value_name = "FACTOR")]
    pub scale: u32,

    /// Print timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when a CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--diff" || a == "--ela")
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the requested computation and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let result = if let Some(pair) = &args.diff {
        run_diff(pair, &args)
    } else if let Some(input) = &args.ela {
        run_ela(input, &args)
    } else {
        Err("nothing to do: pass --diff A B or --ela IMAGE.".to_string())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_diff(pair: &[PathBuf], args: &CliArgs) -> Result<(), String> {
    let [path_a, path_b] = pair else {
        return Err("--diff requires exactly two image paths.".to_string());
    };

    let start = Instant::now();
    let a = load_image(path_a).map_err(|e| format!("{}: {}", path_a.display(), e))?;
    let b = load_image(path_b).map_err(|e| format!("{}: {}", path_b.display(), e))?;
    if args.verbose {
        println!(
            "loaded {} ({}x{}) and {} ({}x{}) in {:.0}ms",
            a.name,
            a.width,
            a.height,
            b.name,
            b.width,
            b.height,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    let compute_start = Instant::now();
    let result = diff::compute_difference(&a.pixels, &b.pixels).map_err(|e| e.to_string())?;
    if args.verbose {
        println!(
            "difference {}x{} computed in {:.0}ms",
            result.width(),
            result.height(),
            compute_start.elapsed().as_secs_f64() * 1000.0
        );
    }

    let output = output_path(path_a, args.output.as_deref(), "diff");
    encode_and_write(&result, &output, args.quality)?;
    println!("{}", output.display());
    Ok(())
}

fn run_ela(input: &Path, args: &CliArgs) -> Result<(), String> {
    let start = Instant::now();
    let image = load_image(input).map_err(|e| format!("{}: {}", input.display(), e))?;

    let result =
        ela::compute_ela(&image.pixels, args.quality, args.scale).map_err(|e| e.to_string())?;
    if args.verbose {
        println!(
            "ELA {}x{} (quality {}, scale {}) computed in {:.0}ms",
            result.width(),
            result.height(),
            args.quality.clamp(1, 100),
            args.scale,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    let output = output_path(input, args.output.as_deref(), "ela");
    encode_and_write(&result, &output, args.quality)?;
    println!("{}", output.display());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Explicit `--output` when given, otherwise `<stem>_<suffix>.png` next to
/// the input file.
fn output_path(input: &Path, output: Option<&Path>, suffix: &str) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_{}.png", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_lands_next_to_the_input() {
        let out = output_path(Path::new("shots/before.png"), None, "diff");
        assert_eq!(out, PathBuf::from("shots/before_diff.png"));
    }

    #[test]
    fn explicit_output_wins() {
        let out = output_path(
            Path::new("a.png"),
            Some(Path::new("/tmp/result.jpg")),
            "ela",
        );
        assert_eq!(out, PathBuf::from("/tmp/result.jpg"));
    }
}
