//! Incremental analysis: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use platescan_pipeline::{Analysis, AnalysisConfig, PipelineError};
//! # fn run(jpeg: Vec<u8>) -> Result<(), PipelineError> {
//! let finalized = Analysis::new(jpeg, AnalysisConfig::default())
//!     .load()?
//!     .mask_circles()?
//!     .mask_oil()?
//!     .mask_plate()?
//!     .finalize()?;
//!
//! let percent = finalized.metrics().oil_plate_percent;
//! let result = finalized.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, so the
//! order `Loaded -> CircleMasked -> OilMasked -> PlateMasked -> Finalized`
//! is enforced by the types. Every state carries the working image and
//! the counts gathered so far; nothing is shared between images.
//!
//! All three overlays are painted onto the same working image in order.
//! Where a later mask selects a pixel an earlier one already painted, the
//! later color wins.

use crate::circles::detect_and_mask;
use crate::region::{mask_oil, mask_plate};
use crate::types::{
    AnalysisConfig, AnalysisMetrics, AnalysisResult, Circle, DegenerateMetricPolicy, Dimensions,
    GrayImage, Layer, NoCirclesPolicy, PipelineError, RgbImage, oil_plate_percent,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Analysis state before any processing has occurred.
///
/// Call [`load`](Self::load) to decode and crop.
#[must_use = "analysis stages are consumed by advancing, call .load() to continue"]
pub struct Pending {
    config: AnalysisConfig,
    source: Vec<u8>,
}

impl Pending {
    /// Decode the source bytes, apply the crop, and advance to [`Loaded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] for unusable bytes, and
    /// [`PipelineError::InvalidCrop`] if the margins leave no pixels.
    pub fn load(self) -> Result<Loaded, PipelineError> {
        Loaded::decode(&self.source, self.config)
    }
}

// ───────────────────────── Stage 1: Loaded ───────────────────────────

/// Cropped working image, nothing painted yet.
#[must_use = "analysis stages are consumed by advancing, call .mask_circles() to continue"]
pub struct Loaded {
    config: AnalysisConfig,
    image: RgbImage,
    source_dimensions: Dimensions,
}

impl Loaded {
    /// Decode `bytes` and crop by `config.crop`.
    ///
    /// # Errors
    ///
    /// See [`Pending::load`].
    pub fn decode(bytes: &[u8], config: AnalysisConfig) -> Result<Self, PipelineError> {
        let decoded = crate::crop::decode(bytes)?;
        let source_dimensions = Dimensions {
            width: decoded.width(),
            height: decoded.height(),
        };
        let image = crate::crop::crop_image(&decoded, config.crop)?;
        Ok(Self {
            config,
            image,
            source_dimensions,
        })
    }

    /// Start from an already-decoded image, applying `config.crop`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCrop`] if the margins leave no pixels.
    pub fn from_image(image: &RgbImage, config: AnalysisConfig) -> Result<Self, PipelineError> {
        let source_dimensions = Dimensions {
            width: image.width(),
            height: image.height(),
        };
        let image = crate::crop::crop_rgb(image, config.crop)?;
        Ok(Self {
            config,
            image,
            source_dimensions,
        })
    }

    /// The cropped working image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Dimensions after cropping.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        dimensions_of(&self.image)
    }

    /// Dimensions of the decoded image before cropping.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source_dimensions
    }

    /// Detect circles and paint them, advancing to [`CircleMasked`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoCircles`] when nothing is found and the
    /// configured [`NoCirclesPolicy`] is [`NoCirclesPolicy::Fail`].
    pub fn mask_circles(self) -> Result<CircleMasked, PipelineError> {
        let detection = detect_and_mask(&self.image, &self.config);
        if detection.circle_count() == 0 && self.config.no_circles == NoCirclesPolicy::Fail {
            return Err(PipelineError::NoCircles);
        }
        Ok(CircleMasked {
            config: self.config,
            total_pixels: dimensions_of(&detection.image).pixel_count(),
            image: detection.image,
            circles: detection.outcome.into_circles(),
            circle_pixel_count: detection.circle_pixel_count,
            rim_edge_pixel_count: detection.rim_edge_pixel_count,
            hough_edge_pixel_count: detection.hough_edge_pixel_count,
            candidate_count: detection.candidate_count,
        })
    }
}

// ───────────────────────── Stage 2: CircleMasked ─────────────────────

/// Working image with circle disks painted.
#[must_use = "analysis stages are consumed by advancing, call .mask_oil() to continue"]
pub struct CircleMasked {
    config: AnalysisConfig,
    image: RgbImage,
    total_pixels: u64,
    circles: Vec<Circle>,
    circle_pixel_count: u64,
    rim_edge_pixel_count: u64,
    hough_edge_pixel_count: u64,
    candidate_count: usize,
}

impl CircleMasked {
    /// Working image with disks painted.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Detected circles, strongest first. Empty when none were found.
    #[must_use]
    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Pixels carrying the circle color on its channel.
    #[must_use]
    pub const fn circle_pixel_count(&self) -> u64 {
        self.circle_pixel_count
    }

    /// Edge pixels of the rim mask fed to the circle transform.
    #[must_use]
    pub const fn rim_edge_pixel_count(&self) -> u64 {
        self.rim_edge_pixel_count
    }

    /// Edge pixels the circle transform voted with.
    #[must_use]
    pub const fn hough_edge_pixel_count(&self) -> u64 {
        self.hough_edge_pixel_count
    }

    /// Accumulator peaks the circle transform considered.
    #[must_use]
    pub const fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Paint oil pixels, advancing to [`OilMasked`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if the working image is empty.
    pub fn mask_oil(self) -> Result<OilMasked, PipelineError> {
        let masked = mask_oil(&self.image, self.config.oil_high, self.config.colors.oil)?;
        Ok(OilMasked {
            config: self.config,
            image: masked.image,
            total_pixels: self.total_pixels,
            circles: self.circles,
            circle_pixel_count: self.circle_pixel_count,
            oil_pixel_count: masked.pixel_count,
        })
    }
}

// ───────────────────────── Stage 3: OilMasked ────────────────────────

/// Working image with circles and oil painted.
#[must_use = "analysis stages are consumed by advancing, call .mask_plate() to continue"]
pub struct OilMasked {
    config: AnalysisConfig,
    image: RgbImage,
    total_pixels: u64,
    circles: Vec<Circle>,
    circle_pixel_count: u64,
    oil_pixel_count: u64,
}

impl OilMasked {
    /// Working image with circles and oil painted.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Pixels selected by the oil mask.
    #[must_use]
    pub const fn oil_pixel_count(&self) -> u64 {
        self.oil_pixel_count
    }

    /// Paint plate pixels, advancing to [`PlateMasked`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if the working image is empty.
    pub fn mask_plate(self) -> Result<PlateMasked, PipelineError> {
        let masked = mask_plate(&self.image, self.config.plate_low, self.config.colors.plate)?;
        Ok(PlateMasked {
            config: self.config,
            image: masked.image,
            metrics: AnalysisMetrics {
                total_pixels: self.total_pixels,
                total_circles: self.circles.len(),
                total_circle_pixels: self.circle_pixel_count,
                total_oil_pixels: self.oil_pixel_count,
                total_plate_pixels: masked.pixel_count,
                oil_plate_percent: f64::NAN,
            },
            circles: self.circles,
        })
    }
}

// ───────────────────────── Stage 4: PlateMasked ──────────────────────

/// Working image with all three overlays painted; percentage not yet computed.
#[must_use = "analysis stages are consumed by advancing, call .finalize() to continue"]
pub struct PlateMasked {
    config: AnalysisConfig,
    image: RgbImage,
    circles: Vec<Circle>,
    metrics: AnalysisMetrics,
}

impl PlateMasked {
    /// Working image with all overlays painted.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Pixels selected by the plate mask.
    #[must_use]
    pub const fn plate_pixel_count(&self) -> u64 {
        self.metrics.total_plate_pixels
    }

    /// Compute the oil/plate percentage, advancing to [`Finalized`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateMetric`] when oil and plate are
    /// both empty and the configured [`DegenerateMetricPolicy`] is
    /// [`DegenerateMetricPolicy::Fail`]. With the default policy the
    /// percentage is `NaN` instead.
    pub fn finalize(self) -> Result<Finalized, PipelineError> {
        let mut metrics = self.metrics;
        metrics.oil_plate_percent =
            match oil_plate_percent(metrics.total_oil_pixels, metrics.total_plate_pixels) {
                Some(percent) => percent,
                None => match self.config.degenerate_metric {
                    DegenerateMetricPolicy::Nan => f64::NAN,
                    DegenerateMetricPolicy::Fail => return Err(PipelineError::DegenerateMetric),
                },
            };
        Ok(Finalized {
            config: self.config,
            image: self.image,
            circles: self.circles,
            metrics,
        })
    }
}

// ───────────────────────── Stage 5: Finalized ────────────────────────

/// Completed analysis of one image.
#[must_use = "call .into_result() to extract the AnalysisResult"]
pub struct Finalized {
    config: AnalysisConfig,
    image: RgbImage,
    circles: Vec<Circle>,
    metrics: AnalysisMetrics,
}

impl Finalized {
    /// The annotated image carrying all three overlays.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Detected circles.
    #[must_use]
    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Counts and percentage.
    #[must_use]
    pub const fn metrics(&self) -> &AnalysisMetrics {
        &self.metrics
    }

    /// Dimensions of the annotated image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        dimensions_of(&self.image)
    }

    /// The designated channel of `layer`'s mask color, as a grayscale image.
    ///
    /// Pixels of that overlay read as the mask color's channel value.
    #[must_use = "returns the channel image"]
    pub fn overlay_channel(&self, layer: Layer) -> GrayImage {
        crate::color::overlay_channel(&self.image, &self.config.colors, layer)
    }

    /// Consume the analysis and return the [`AnalysisResult`].
    #[must_use]
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            image: self.image,
            circles: self.circles,
            metrics: self.metrics,
        }
    }
}

/// Entry point for the incremental API.
pub struct Analysis;

impl Analysis {
    /// Store source bytes and config without processing anything.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: AnalysisConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
}

fn dimensions_of(image: &RgbImage) -> Dimensions {
    Dimensions {
        width: image.width(),
        height: image.height(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Channel, MaskColor, MaskColors};
    use image::Rgb;

    /// Dark strip on the left, bright green plate on the right.
    fn strip_image() -> RgbImage {
        RgbImage::from_fn(40, 20, |x, _| {
            if x < 10 {
                Rgb([10, 10, 10])
            } else {
                Rgb([0, 230, 0])
            }
        })
    }

    #[test]
    fn stages_accumulate_counts() {
        let loaded = Loaded::from_image(&strip_image(), AnalysisConfig::default()).unwrap();
        assert_eq!(loaded.dimensions().pixel_count(), 800);

        let circles = loaded.mask_circles().unwrap();
        assert!(circles.circles().is_empty());
        assert_eq!(circles.circle_pixel_count(), 0);

        let oil = circles.mask_oil().unwrap();
        assert_eq!(oil.oil_pixel_count(), 200);

        let plate = oil.mask_plate().unwrap();
        assert_eq!(plate.plate_pixel_count(), 600);

        let done = plate.finalize().unwrap();
        let metrics = done.metrics();
        assert_eq!(metrics.total_pixels, 800);
        assert_eq!(metrics.total_circles, 0);
        assert!((metrics.oil_plate_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn crop_is_applied_on_load() {
        let config = AnalysisConfig {
            crop: crate::types::Crop::new(2, 0, 3, 10),
            ..AnalysisConfig::default()
        };
        let loaded = Loaded::from_image(&strip_image(), config).unwrap();
        assert_eq!(
            loaded.dimensions(),
            Dimensions {
                width: 30,
                height: 15
            }
        );
        assert_eq!(
            loaded.source_dimensions(),
            Dimensions {
                width: 40,
                height: 20
            }
        );
        // The dark strip was cropped away entirely.
        let done = loaded
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(done.metrics().total_oil_pixels, 0);
        assert!(done.metrics().oil_plate_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn no_circles_fails_only_when_asked() {
        let img = RgbImage::from_pixel(30, 30, Rgb([0, 230, 0]));
        let config = AnalysisConfig {
            no_circles: NoCirclesPolicy::Fail,
            ..AnalysisConfig::default()
        };
        let result = Loaded::from_image(&img, config).unwrap().mask_circles();
        assert!(matches!(result, Err(PipelineError::NoCircles)));

        let lenient = Loaded::from_image(&img, AnalysisConfig::default())
            .unwrap()
            .mask_circles();
        assert!(lenient.is_ok());
    }

    #[test]
    fn degenerate_metric_is_nan_by_default() {
        // Mid gray: neither dark enough for oil nor green enough for plate.
        let img = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        let done = Loaded::from_image(&img, AnalysisConfig::default())
            .unwrap()
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize()
            .unwrap();
        assert!(done.metrics().oil_plate_percent.is_nan());
    }

    #[test]
    fn degenerate_metric_fails_when_asked() {
        let img = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        let config = AnalysisConfig {
            degenerate_metric: DegenerateMetricPolicy::Fail,
            ..AnalysisConfig::default()
        };
        let result = Loaded::from_image(&img, config)
            .unwrap()
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize();
        assert!(matches!(result, Err(PipelineError::DegenerateMetric)));
    }

    #[test]
    fn plate_color_overwrites_oil_color() {
        // Oil paint that keeps green bright enough to be selected as plate.
        let config = AnalysisConfig {
            colors: MaskColors {
                oil: MaskColor::new([0, 230, 255], Channel::Blue),
                ..MaskColors::default()
            },
            ..AnalysisConfig::default()
        };
        let img = RgbImage::from_pixel(16, 16, Rgb([20, 60, 20]));
        let done = Loaded::from_image(&img, config)
            .unwrap()
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(done.metrics().total_oil_pixels, 256);
        assert_eq!(done.metrics().total_plate_pixels, 256);
        assert!(
            done.image()
                .pixels()
                .all(|p| *p == MaskColors::DEFAULT_PLATE.pixel())
        );
    }

    #[test]
    fn overlay_channels_isolate_each_layer() {
        let done = Loaded::from_image(&strip_image(), AnalysisConfig::default())
            .unwrap()
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize()
            .unwrap();
        let oil = done.overlay_channel(Layer::Oil);
        let plate = done.overlay_channel(Layer::Plate);
        assert_eq!(oil.get_pixel(0, 0).0[0], 255);
        assert_eq!(oil.get_pixel(30, 0).0[0], 0);
        assert_eq!(plate.get_pixel(30, 0).0[0], 255);
        assert_eq!(plate.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn painted_circles_are_excluded_from_plate() {
        // A mid-green disk on a white plate: both pass the plate test, so
        // only the circle paint can keep pixels out of the plate count.
        let img = RgbImage::from_fn(120, 120, |x, y| {
            let (dx, dy) = (i64::from(x) - 60, i64::from(y) - 60);
            if dx * dx + dy * dy <= 20 * 20 {
                Rgb([0, 210, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let done = Loaded::from_image(&img, AnalysisConfig::default())
            .unwrap()
            .mask_circles()
            .unwrap()
            .mask_oil()
            .unwrap()
            .mask_plate()
            .unwrap()
            .finalize()
            .unwrap();

        let metrics = done.metrics();
        assert_eq!(metrics.total_circles, 1, "got {:?}", done.circles());
        assert!(metrics.total_circle_pixels > 0);
        let expected = std::f64::consts::PI * 400.0;
        assert!(
            (metrics.total_circle_pixels as f64 / expected - 1.0).abs() < 0.3,
            "circle pixels {}",
            metrics.total_circle_pixels
        );
        assert_eq!(
            metrics.total_plate_pixels,
            metrics.total_pixels - metrics.total_circle_pixels
        );
        assert_eq!(metrics.total_oil_pixels, 0);
        assert!(metrics.oil_plate_percent.abs() < f64::EPSILON);

        let circle = done.circles()[0];
        assert_eq!(
            *done.image().get_pixel(circle.x, circle.y),
            MaskColors::DEFAULT_CIRCLE.pixel()
        );
        assert_eq!(*done.image().get_pixel(2, 2), MaskColors::DEFAULT_PLATE.pixel());
    }

    #[test]
    fn pending_rejects_empty_bytes() {
        let result = Analysis::new(Vec::new(), AnalysisConfig::default()).load();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }
}
