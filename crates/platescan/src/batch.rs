//! Sequential batch runner.
//!
//! For every input, in sorted order: read, analyze, save the annotated
//! image (and optionally its channel overlays), then append one report
//! row. A failing input is logged and skipped; it never leaves a partial
//! row behind and never stops the batch.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use platescan_pipeline::color::overlay_channel;
use platescan_pipeline::{AnalysisConfig, AnalysisMetrics, Clock, Layer, analyze_with_diagnostics};
use platescan_report::{ReportRow, TIMESTAMP_FORMAT, format_row, header_line, report_file_name};

use crate::error::{BatchError, ImageError};
use crate::inputs::{DEFAULT_EXTENSION, collect_inputs};
use crate::output::{IMAGES_DIR, annotated_path, overlay_path, save_gray, save_rgb};

/// Everything one batch run needs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// A single image or a directory to walk.
    pub input: PathBuf,
    /// Root of all outputs.
    pub output_dir: PathBuf,
    /// Extension matched while walking a directory.
    pub extension: String,
    /// Also write per-layer channel images.
    pub save_overlays: bool,
    /// Analysis configuration shared by every image.
    pub config: AnalysisConfig,
}

impl BatchOptions {
    /// Default output directory name.
    pub const DEFAULT_OUTPUT_DIR: &'static str = "results";

    /// Options with default output directory, extension and config.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: PathBuf::from(Self::DEFAULT_OUTPUT_DIR),
            extension: DEFAULT_EXTENSION.to_owned(),
            save_overlays: false,
            config: AnalysisConfig::default(),
        }
    }
}

/// An input that produced no report row.
#[derive(Debug, Clone)]
pub struct Failure {
    /// The input file.
    pub path: PathBuf,
    /// Short error kind (see [`ImageError::kind`]).
    pub kind: &'static str,
    /// Human-readable error.
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// The report written.
    pub report_path: PathBuf,
    /// Inputs that produced a report row.
    pub processed: usize,
    /// Inputs that did not.
    pub failures: Vec<Failure>,
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Analyze every input and write the report.
///
/// The configuration is validated and the inputs enumerated before any
/// output is created.
///
/// # Errors
///
/// Returns [`BatchError`] for problems that affect the whole run. Per-image
/// problems are recorded in [`BatchSummary::failures`] instead.
pub fn run_batch<C: Clock>(options: &BatchOptions, clock: &C) -> Result<BatchSummary, BatchError> {
    options
        .config
        .validate()
        .map_err(BatchError::InvalidConfig)?;
    let inputs = collect_inputs(&options.input, &options.extension)?;
    tracing::info!(
        "Found {} image(s) under {}",
        inputs.len(),
        options.input.display()
    );

    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    let report_path = options.output_dir.join(report_file_name(&timestamp));
    let mut report = ReportWriter::create(&report_path)?;

    let images_dir = options.output_dir.join(IMAGES_DIR);
    let total = inputs.len();
    let mut processed = 0;
    let mut failures = Vec::new();

    for (i, path) in inputs.iter().enumerate() {
        let index = i + 1;
        tracing::info!("[{index}/{total}] {}", path.display());

        match process_one(path, &images_dir, options, clock) {
            Ok(metrics) => {
                report.append(&ReportRow {
                    index,
                    path: path.display().to_string(),
                    metrics,
                })?;
                processed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), kind = e.kind(), "skipping image: {e}");
                failures.push(Failure {
                    path: path.clone(),
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Report written to {} ({processed} row(s), {} failure(s))",
        report_path.display(),
        failures.len()
    );
    Ok(BatchSummary {
        report_path,
        processed,
        failures,
    })
}

/// Analyze and persist one input, returning its report metrics.
///
/// # Errors
///
/// Returns [`ImageError`] for read, analysis, or save failures.
pub fn process_one<C: Clock>(
    path: &Path,
    images_dir: &Path,
    options: &BatchOptions,
    clock: &C,
) -> Result<AnalysisMetrics, ImageError> {
    let bytes = fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (result, diagnostics) = analyze_with_diagnostics(&bytes, &options.config, clock)?;
    tracing::debug!("{}\n{}", path.display(), diagnostics.report());

    let annotated = annotated_path(images_dir, path);
    save_rgb(&result.image, &annotated)?;

    if options.save_overlays {
        for layer in Layer::ALL {
            let gray = overlay_channel(&result.image, &options.config.colors, layer);
            save_gray(&gray, &overlay_path(&annotated, layer))?;
        }
    }

    Ok(result.metrics)
}

/// Streaming report file: header on creation, one flushed line per row.
struct ReportWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ReportWriter {
    fn create(path: &Path) -> Result<Self, BatchError> {
        let report_error = |source| BatchError::Report {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(report_error)?;
        }
        let file = File::create(path).map_err(report_error)?;
        let mut writer = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        };
        writer.write_line(&header_line())?;
        Ok(writer)
    }

    fn append(&mut self, row: &ReportRow) -> Result<(), BatchError> {
        self.write_line(&format_row(row))
    }

    fn write_line(&mut self, line: &str) -> Result<(), BatchError> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|source| BatchError::Report {
                path: self.path.clone(),
                source,
            })
    }
}
