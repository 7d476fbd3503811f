//! platescan-pipeline: Pure plate image analysis (sans-IO).
//!
//! Measures one photographed plate through:
//! decode + crop -> circle detection and painting -> oil mask ->
//! plate mask -> oil/plate percentage.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and images and returns structured data. Filesystem
//! interaction and reporting live in `platescan`.

pub mod blur;
pub mod canny;
pub mod circles;
pub mod color;
pub mod crop;
pub mod diagnostics;
pub mod edge;
pub mod hough;
pub mod pipeline;
pub mod region;
pub mod threshold;
pub mod types;

pub use diagnostics::{AnalysisDiagnostics, Clock, analyze_with_diagnostics};
pub use hough::HoughOutcome;
pub use pipeline::{Analysis, CircleMasked, Finalized, Loaded, OilMasked, Pending, PlateMasked};
pub use types::{
    AdaptiveMethod, AdaptiveThreshold, AnalysisConfig, AnalysisMetrics, AnalysisResult, Channel,
    Circle, Crop, DegenerateMetricPolicy, Dimensions, GrayImage, HoughParams, Layer, MaskColor,
    MaskColors, NoCirclesPolicy, PipelineError, RgbImage, oil_plate_percent,
};

/// Run the full analysis on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration and
/// produces the annotated image, the detected circles and the counts.
///
/// # Pipeline steps
///
/// 1. Decode and crop
/// 2. Detect circles on the inverted adaptive-threshold rim mask and paint them
/// 3. Paint oil (HSV value below `oil_high`)
/// 4. Paint plate (green above `plate_low`)
/// 5. Compute `oil / (oil + plate) * 100`
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::InvalidCrop`] if the crop leaves no pixels.
/// Returns [`PipelineError::NoCircles`] or [`PipelineError::DegenerateMetric`]
/// only when the corresponding policy in `config` asks for failure.
pub fn analyze(
    image_bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, PipelineError> {
    config.validate()?;
    run(pipeline::Loaded::decode(image_bytes, config.clone())?)
}

/// Run the full analysis on an already-decoded image.
///
/// # Errors
///
/// Same as [`analyze`], minus the decoding errors.
pub fn analyze_image(
    image: &RgbImage,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, PipelineError> {
    config.validate()?;
    run(pipeline::Loaded::from_image(image, config.clone())?)
}

fn run(loaded: pipeline::Loaded) -> Result<AnalysisResult, PipelineError> {
    Ok(loaded
        .mask_circles()?
        .mask_oil()?
        .mask_plate()?
        .finalize()?
        .into_result())
}
