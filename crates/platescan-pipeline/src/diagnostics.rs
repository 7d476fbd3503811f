//! Analysis diagnostics: timing and counts for each stage.
//!
//! Every call to [`analyze_with_diagnostics`] collects these alongside
//! the analysis result. They are meant for threshold tuning and for
//! explaining why an image produced the numbers it did.
//!
//! Time is read through the [`Clock`] trait so this crate stays free of
//! platform clocks; the caller decides where "now" comes from.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Loaded;
use crate::types::{AnalysisConfig, AnalysisResult, PipelineError};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single image analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Decode and crop.
    pub load: StageDiagnostics,
    /// Rim mask, circle transform and disk painting.
    pub circles: StageDiagnostics,
    /// Oil mask.
    pub oil: StageDiagnostics,
    /// Plate mask.
    pub plate: StageDiagnostics,
    /// Percentage computation.
    pub finalize: StageDiagnostics,
    /// Total wall-clock duration of the analysis (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: AnalysisSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Decode and crop metrics.
    Load {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width before cropping.
        source_width: u32,
        /// Decoded height before cropping.
        source_height: u32,
        /// Width after cropping.
        width: u32,
        /// Height after cropping.
        height: u32,
    },
    /// Circle detection metrics.
    Circles {
        /// Edge pixels of the rim mask.
        rim_edge_pixel_count: u64,
        /// Edge pixels the circle transform voted with.
        hough_edge_pixel_count: u64,
        /// Accumulator peaks considered.
        candidate_count: usize,
        /// Circles accepted.
        circle_count: usize,
        /// Pixels carrying the circle color after painting.
        circle_pixel_count: u64,
    },
    /// Oil mask metrics.
    Oil {
        /// HSV value threshold (exclusive upper bound).
        oil_high: u8,
        /// Selected pixels.
        pixel_count: u64,
    },
    /// Plate mask metrics.
    Plate {
        /// Green threshold (exclusive lower bound).
        plate_low: u8,
        /// Selected pixels.
        pixel_count: u64,
    },
    /// Percentage metrics.
    Finalize {
        /// Oil share of oil plus plate, in percent (`NaN` when undefined).
        oil_plate_percent: f64,
        /// Whether both oil and plate were empty.
        degenerate: bool,
    },
}

/// High-level summary counts for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Cropped image width in pixels.
    pub image_width: u32,
    /// Cropped image height in pixels.
    pub image_height: u32,
    /// Cropped pixel count.
    pub pixel_count: u64,
    /// Number of circles.
    pub circle_count: usize,
    /// Final percentage.
    pub oil_plate_percent: f64,
}

impl AnalysisDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Load", &self.load),
            ("Circles", &self.circles),
            ("Oil", &self.oil),
            ("Plate", &self.plate),
            ("Finalize", &self.finalize),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Circles: {}  |  Oil / Plate: {:?}%",
            self.summary.circle_count, self.summary.oil_plate_percent,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Load {
            input_bytes,
            source_width,
            source_height,
            width,
            height,
        } => format!("{input_bytes} bytes -> {source_width}x{source_height} -> crop {width}x{height}"),
        StageMetrics::Circles {
            rim_edge_pixel_count,
            hough_edge_pixel_count,
            candidate_count,
            circle_count,
            circle_pixel_count,
        } => format!(
            "rim edges={rim_edge_pixel_count} voting edges={hough_edge_pixel_count} candidates={candidate_count} circles={circle_count} pixels={circle_pixel_count}"
        ),
        StageMetrics::Oil {
            oil_high,
            pixel_count,
        } => format!("value<{oil_high} pixels={pixel_count}"),
        StageMetrics::Plate {
            plate_low,
            pixel_count,
        } => format!("green>{plate_low} pixels={pixel_count}"),
        StageMetrics::Finalize {
            oil_plate_percent,
            degenerate,
        } => {
            if *degenerate {
                "oil and plate both empty".to_owned()
            } else {
                format!("oil/plate={oil_plate_percent:.2}%")
            }
        }
    }
}

/// Analyze one image, timing every stage with `clock`.
///
/// # Errors
///
/// Returns the same errors as [`crate::analyze`].
pub fn analyze_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &AnalysisConfig,
    clock: &C,
) -> Result<(AnalysisResult, AnalysisDiagnostics), PipelineError> {
    config.validate()?;
    let total_start = clock.now();

    let start = clock.now();
    let loaded = Loaded::decode(image_bytes, config.clone())?;
    let source = loaded.source_dimensions();
    let cropped = loaded.dimensions();
    let load = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Load {
            input_bytes: image_bytes.len(),
            source_width: source.width,
            source_height: source.height,
            width: cropped.width,
            height: cropped.height,
        },
    };

    let start = clock.now();
    let circle_masked = loaded.mask_circles()?;
    let circles = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Circles {
            rim_edge_pixel_count: circle_masked.rim_edge_pixel_count(),
            hough_edge_pixel_count: circle_masked.hough_edge_pixel_count(),
            candidate_count: circle_masked.candidate_count(),
            circle_count: circle_masked.circles().len(),
            circle_pixel_count: circle_masked.circle_pixel_count(),
        },
    };

    let start = clock.now();
    let oil_masked = circle_masked.mask_oil()?;
    let oil = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Oil {
            oil_high: config.oil_high,
            pixel_count: oil_masked.oil_pixel_count(),
        },
    };

    let start = clock.now();
    let plate_masked = oil_masked.mask_plate()?;
    let plate = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Plate {
            plate_low: config.plate_low,
            pixel_count: plate_masked.plate_pixel_count(),
        },
    };

    let start = clock.now();
    let finalized = plate_masked.finalize()?;
    let metrics = *finalized.metrics();
    let finalize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Finalize {
            oil_plate_percent: metrics.oil_plate_percent,
            degenerate: metrics.total_oil_pixels + metrics.total_plate_pixels == 0,
        },
    };

    let total_duration = clock.elapsed(&total_start);
    let diagnostics = AnalysisDiagnostics {
        load,
        circles,
        oil,
        plate,
        finalize,
        total_duration,
        summary: AnalysisSummary {
            image_width: cropped.width,
            image_height: cropped.height,
            pixel_count: metrics.total_pixels,
            circle_count: metrics.total_circles,
            oil_plate_percent: metrics.oil_plate_percent,
        },
    };

    Ok((finalized.into_result(), diagnostics))
}
