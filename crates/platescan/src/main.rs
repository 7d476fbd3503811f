//! platescan: measure circles, oil and plate coverage across a batch of
//! plate photographs.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin platescan -- [OPTIONS] <INPUT>
//! ```
//!
//! `INPUT` is a single image or a directory walked recursively for
//! `--extension` files. Progress is logged to stderr; set `RUST_LOG=debug`
//! for per-stage timings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use platescan::{BatchOptions, StdClock, run_batch};
use platescan_pipeline::{AnalysisConfig, Crop, DegenerateMetricPolicy, HoughParams, NoCirclesPolicy};

/// Batch-analyze plate photographs.
///
/// For every image: crop, detect and paint circles, paint oil and plate
/// pixels, save the annotated image, and append a row to the CSV report.
#[derive(Parser)]
#[command(name = "platescan", version)]
struct Cli {
    /// Image file, or directory to search recursively.
    input: PathBuf,

    /// Directory receiving annotated images and the report.
    #[arg(long, default_value = BatchOptions::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// File extension matched when INPUT is a directory (case-insensitive).
    #[arg(long, default_value = platescan::DEFAULT_EXTENSION)]
    extension: String,

    /// Pixels cropped from the top edge.
    #[arg(long, default_value_t = 0)]
    top: u32,

    /// Pixels cropped from the right edge.
    #[arg(long, default_value_t = 0)]
    right: u32,

    /// Pixels cropped from the bottom edge.
    #[arg(long, default_value_t = 0)]
    bottom: u32,

    /// Pixels cropped from the left edge.
    #[arg(long, default_value_t = 0)]
    left: u32,

    /// Pixels whose green channel is above this are plate.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_PLATE_LOW)]
    plate_low: u8,

    /// Pixels whose HSV value is below this are oil.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_OIL_HIGH)]
    oil_high: u8,

    /// Smallest circle radius searched for, in pixels.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MIN_RADIUS)]
    min_radius: u32,

    /// Largest circle radius searched for, in pixels.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MAX_RADIUS)]
    max_radius: u32,

    /// Treat an image with no detected circle as a failure.
    #[arg(long)]
    fail_on_no_circles: bool,

    /// Treat an image with neither oil nor plate pixels as a failure
    /// instead of reporting NaN.
    #[arg(long)]
    fail_on_degenerate: bool,

    /// Also write the circle, oil and plate channels as grayscale PNGs.
    #[arg(long)]
    save_overlays: bool,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other analysis parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalysisConfig {
        crop: Crop::new(cli.top, cli.right, cli.bottom, cli.left),
        plate_low: cli.plate_low,
        oil_high: cli.oil_high,
        hough: HoughParams {
            min_radius: cli.min_radius,
            max_radius: cli.max_radius,
            ..HoughParams::default()
        },
        no_circles: if cli.fail_on_no_circles {
            NoCirclesPolicy::Fail
        } else {
            NoCirclesPolicy::Empty
        },
        degenerate_metric: if cli.fail_on_degenerate {
            DegenerateMetricPolicy::Fail
        } else {
            DegenerateMetricPolicy::Nan
        },
        ..AnalysisConfig::default()
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Config: {config:?}");

    let options = BatchOptions {
        input: cli.input,
        output_dir: cli.output_dir,
        extension: cli.extension,
        save_overlays: cli.save_overlays,
        config,
    };

    match run_batch(&options, &StdClock) {
        Ok(summary) => {
            for failure in &summary.failures {
                tracing::warn!(
                    "not in report: {} ({}: {})",
                    failure.path.display(),
                    failure.kind,
                    failure.message
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
