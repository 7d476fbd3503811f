//! Shared types for the platescan analysis pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// single-channel intermediates without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`, the working image type of every stage.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pixels removed from each edge of the decoded image.
///
/// A margin of `0` leaves that edge at its natural boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crop {
    /// Rows removed from the top.
    pub top: u32,
    /// Columns removed from the right.
    pub right: u32,
    /// Rows removed from the bottom.
    pub bottom: u32,
    /// Columns removed from the left.
    pub left: u32,
}

impl Crop {
    /// Create a crop from `(top, right, bottom, left)` margins.
    #[must_use]
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Dimensions left after applying this crop to `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCrop`] if the margins consume the
    /// whole width or height.
    pub fn apply_to(self, source: Dimensions) -> Result<Dimensions, PipelineError> {
        let invalid = || PipelineError::InvalidCrop {
            crop: self,
            width: source.width,
            height: source.height,
        };
        let width = source
            .width
            .checked_sub(self.left)
            .and_then(|w| w.checked_sub(self.right))
            .filter(|&w| w > 0)
            .ok_or_else(invalid)?;
        let height = source
            .height
            .checked_sub(self.top)
            .and_then(|h| h.checked_sub(self.bottom))
            .filter(|&h| h > 0)
            .ok_or_else(invalid)?;
        Ok(Dimensions { width, height })
    }
}

/// One color channel of an RGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Index of this channel within an `Rgb<u8>` pixel.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Fixed color painted over the pixels of one detected region.
///
/// `channel` is the channel on which the region is later recovered:
/// a pixel belongs to the overlay when its `channel` value equals
/// `rgb[channel]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskColor {
    /// Paint color in RGB order.
    pub rgb: [u8; 3],
    /// Channel used to recover the overlay by exact match.
    pub channel: Channel,
}

impl MaskColor {
    /// Create a mask color.
    #[must_use]
    pub const fn new(rgb: [u8; 3], channel: Channel) -> Self {
        Self { rgb, channel }
    }

    /// The paint color as an `image` pixel.
    #[must_use]
    pub const fn pixel(self) -> image::Rgb<u8> {
        image::Rgb(self.rgb)
    }

    /// Value of the designated channel in the paint color.
    #[must_use]
    pub const fn key(self) -> u8 {
        self.rgb[self.channel.index()]
    }

    /// Whether `pixel` matches this color on its designated channel.
    #[must_use]
    pub const fn matches(self, pixel: &image::Rgb<u8>) -> bool {
        pixel.0[self.channel.index()] == self.key()
    }
}

/// The three overlay colors, one per region kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskColors {
    /// Painted over detected circle disks.
    pub circle: MaskColor,
    /// Painted over dark (oil) pixels.
    pub oil: MaskColor,
    /// Painted over bright-green (plate) pixels.
    pub plate: MaskColor,
}

impl MaskColors {
    pub const DEFAULT_CIRCLE: MaskColor = MaskColor::new([255, 0, 0], Channel::Red);
    pub const DEFAULT_OIL: MaskColor = MaskColor::new([0, 0, 255], Channel::Blue);
    pub const DEFAULT_PLATE: MaskColor = MaskColor::new([0, 255, 0], Channel::Green);

    /// `true` when every overlay is recovered from its own channel.
    #[must_use]
    pub fn channels_distinct(&self) -> bool {
        self.circle.channel != self.oil.channel
            && self.circle.channel != self.plate.channel
            && self.oil.channel != self.plate.channel
    }
}

impl Default for MaskColors {
    fn default() -> Self {
        Self {
            circle: Self::DEFAULT_CIRCLE,
            oil: Self::DEFAULT_OIL,
            plate: Self::DEFAULT_PLATE,
        }
    }
}

impl MaskColors {
    /// The color painted for `layer`.
    #[must_use]
    pub const fn for_layer(&self, layer: Layer) -> MaskColor {
        match layer {
            Layer::Circles => self.circle,
            Layer::Oil => self.oil,
            Layer::Plate => self.plate,
        }
    }
}

/// One of the three overlays painted onto the working image, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Circles,
    Oil,
    Plate,
}

impl Layer {
    /// All layers in paint order.
    pub const ALL: [Self; 3] = [Self::Circles, Self::Oil, Self::Plate];

    /// Lowercase name used in file suffixes and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Circles => "circles",
            Self::Oil => "oil",
            Self::Plate => "plate",
        }
    }
}

/// How the local reference level of the adaptive threshold is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveMethod {
    /// Unweighted mean of the block.
    Mean,
    /// Gaussian-weighted mean of the block.
    #[default]
    Gaussian,
}

/// Parameters of the inverted adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThreshold {
    /// Local reference computation.
    pub method: AdaptiveMethod,
    /// Side of the square neighborhood in pixels. Odd, at least 3.
    pub block_size: u32,
    /// Subtracted from the local reference before comparing.
    pub offset: i16,
}

impl Default for AdaptiveThreshold {
    fn default() -> Self {
        Self {
            method: AdaptiveMethod::default(),
            block_size: 41,
            offset: 3,
        }
    }
}

/// Parameters of the gradient Hough circle transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Inverse ratio of accumulator resolution to image resolution.
    pub accumulator_resolution: u32,
    /// Minimum distance in pixels between two accepted centers.
    pub min_center_distance: f64,
    /// High threshold of the internal edge pass (the low one is half).
    pub edge_threshold: f32,
    /// Votes a center needs, summed over its small peak window.
    pub accumulator_threshold: u32,
    /// Share of a circle's circumference its rim edges must cover.
    pub min_rim_fraction: f64,
    /// Smallest radius searched, in pixels.
    pub min_radius: u32,
    /// Largest radius searched, in pixels.
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            accumulator_resolution: 1,
            min_center_distance: 30.0,
            edge_threshold: 50.0,
            accumulator_threshold: 30,
            min_rim_fraction: 0.5,
            min_radius: 0,
            max_radius: 80,
        }
    }
}

/// What to do when the circle detector finds nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoCirclesPolicy {
    /// Report zero circles and leave the image unchanged.
    #[default]
    Empty,
    /// Fail the image with [`PipelineError::NoCircles`].
    Fail,
}

/// What to do when neither oil nor plate pixels were found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegenerateMetricPolicy {
    /// Report the oil/plate percentage as `NaN`.
    #[default]
    Nan,
    /// Fail the image with [`PipelineError::DegenerateMetric`].
    Fail,
}

/// Configuration for one analysis run, shared by every image of a batch.
///
/// Defaults reproduce the reference tuning: 5x5-equivalent blur,
/// block-41 inverted Gaussian threshold, Canny 10/250, Hough radius
/// range `[0, 80]`, oil below value 70, plate above green 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Margins trimmed from the decoded image.
    pub crop: Crop,

    /// Gaussian blur sigma applied to the luminance before thresholding.
    pub blur_sigma: f32,

    /// Inverted adaptive threshold producing the rim mask.
    pub threshold: AdaptiveThreshold,

    /// Canny low threshold on the rim mask.
    pub canny_low: f32,

    /// Canny high threshold on the rim mask.
    pub canny_high: f32,

    /// Circle transform parameters.
    pub hough: HoughParams,

    /// Pixels whose HSV value is strictly below this are oil.
    pub oil_high: u8,

    /// Pixels whose green channel is strictly above this are plate.
    pub plate_low: u8,

    /// Overlay colors.
    pub colors: MaskColors,

    /// Behavior when no circle is detected.
    pub no_circles: NoCirclesPolicy,

    /// Behavior when the oil/plate percentage has a zero denominator.
    pub degenerate_metric: DegenerateMetricPolicy,
}

impl AnalysisConfig {
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;
    pub const DEFAULT_CANNY_LOW: f32 = 10.0;
    pub const DEFAULT_CANNY_HIGH: f32 = 250.0;
    pub const DEFAULT_OIL_HIGH: u8 = 70;
    pub const DEFAULT_PLATE_LOW: u8 = 200;
    pub const DEFAULT_MIN_RADIUS: u32 = 0;
    pub const DEFAULT_MAX_RADIUS: u32 = 80;

    /// Check parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if !self.blur_sigma.is_finite() {
            return invalid(format!("blur sigma must be finite, got {}", self.blur_sigma));
        }
        let block = self.threshold.block_size;
        if block < 3 || block % 2 == 0 {
            return invalid(format!(
                "threshold block size must be odd and at least 3, got {block}"
            ));
        }
        if !(self.canny_low > 0.0 && self.canny_high.is_finite()) {
            return invalid(format!(
                "canny thresholds must be positive and finite, got {}/{}",
                self.canny_low, self.canny_high
            ));
        }
        if self.canny_low > self.canny_high {
            return invalid(format!(
                "canny low threshold {} exceeds high threshold {}",
                self.canny_low, self.canny_high
            ));
        }
        let hough = &self.hough;
        if hough.accumulator_resolution == 0 {
            return invalid("accumulator resolution must be at least 1".to_owned());
        }
        if !(hough.min_center_distance.is_finite() && hough.min_center_distance >= 0.0) {
            return invalid(format!(
                "minimum center distance must be finite and non-negative, got {}",
                hough.min_center_distance
            ));
        }
        if !(hough.edge_threshold > 0.0 && hough.edge_threshold.is_finite()) {
            return invalid(format!(
                "hough edge threshold must be positive and finite, got {}",
                hough.edge_threshold
            ));
        }
        if !(hough.min_rim_fraction > 0.0 && hough.min_rim_fraction.is_finite()) {
            return invalid(format!(
                "minimum rim fraction must be positive and finite, got {}",
                hough.min_rim_fraction
            ));
        }
        if hough.max_radius == 0 {
            return invalid("maximum radius must be positive".to_owned());
        }
        if hough.min_radius > hough.max_radius {
            return invalid(format!(
                "minimum radius {} exceeds maximum radius {}",
                hough.min_radius, hough.max_radius
            ));
        }
        if !self.colors.channels_distinct() {
            return invalid("mask colors must use three distinct channels".to_owned());
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crop: Crop::default(),
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            threshold: AdaptiveThreshold::default(),
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            hough: HoughParams::default(),
            oil_high: Self::DEFAULT_OIL_HIGH,
            plate_low: Self::DEFAULT_PLATE_LOW,
            colors: MaskColors::default(),
            no_circles: NoCirclesPolicy::default(),
            degenerate_metric: DegenerateMetricPolicy::default(),
        }
    }
}

/// A detected circle in cropped-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    /// Center column.
    pub x: u32,
    /// Center row.
    pub y: u32,
    /// Radius in pixels.
    pub radius: u32,
}

/// Scalar results for one analyzed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Pixels in the cropped image.
    pub total_pixels: u64,
    /// Number of detected circles.
    pub total_circles: usize,
    /// Pixels carrying the circle color on its channel after circle masking.
    pub total_circle_pixels: u64,
    /// Pixels selected by the oil mask.
    pub total_oil_pixels: u64,
    /// Pixels selected by the plate mask.
    pub total_plate_pixels: u64,
    /// `oil / (oil + plate) * 100`, or `NaN` when both are zero.
    pub oil_plate_percent: f64,
}

/// Oil share of the combined oil and plate area, in percent.
///
/// Returns `None` when both counts are zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn oil_plate_percent(oil_pixels: u64, plate_pixels: u64) -> Option<f64> {
    let total = oil_pixels + plate_pixels;
    if total == 0 {
        return None;
    }
    Some(oil_pixels as f64 / total as f64 * 100.0)
}

/// Final output of the analysis of one image.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Cropped image with circle, oil and plate overlays painted in order.
    pub image: RgbImage,
    /// Circles found by the detector.
    pub circles: Vec<Circle>,
    /// Counts and the derived percentage.
    pub metrics: AnalysisMetrics,
}

impl AnalysisResult {
    /// Dimensions of the annotated image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Errors that can occur while analyzing one image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The crop margins leave no pixels.
    #[error("crop {crop:?} leaves no pixels of a {width}x{height} image")]
    InvalidCrop {
        /// Requested margins.
        crop: Crop,
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// A stage received an image it cannot process.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The circle detector found nothing and the policy forbids it.
    #[error("no circles detected")]
    NoCircles,

    /// Oil and plate are both empty and the policy forbids it.
    #[error("oil and plate masks are both empty; oil/plate percentage is undefined")]
    DegenerateMetric,

    /// Analysis configuration is invalid.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Stable short name of the error kind, used in logs and summaries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ImageDecode(_) | Self::EmptyInput => "load",
            Self::InvalidCrop { .. } => "invalid-crop",
            Self::InvalidImage(_) => "invalid-image",
            Self::NoCircles => "detection",
            Self::DegenerateMetric => "degenerate-metric",
            Self::InvalidConfig(_) => "invalid-config",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Crop tests ---

    #[test]
    fn crop_removes_each_margin() {
        let dims = Crop::new(3, 5, 7, 11)
            .apply_to(Dimensions {
                width: 100,
                height: 50,
            })
            .unwrap();
        assert_eq!(
            dims,
            Dimensions {
                width: 84,
                height: 40
            }
        );
    }

    #[test]
    fn zero_crop_keeps_dimensions() {
        let source = Dimensions {
            width: 13,
            height: 9,
        };
        assert_eq!(Crop::default().apply_to(source).unwrap(), source);
    }

    #[test]
    fn crop_consuming_width_is_rejected() {
        let result = Crop::new(0, 6, 0, 4).apply_to(Dimensions {
            width: 10,
            height: 10,
        });
        assert!(matches!(result, Err(PipelineError::InvalidCrop { .. })));
    }

    #[test]
    fn crop_exceeding_height_is_rejected() {
        let result = Crop::new(8, 0, 8, 0).apply_to(Dimensions {
            width: 10,
            height: 10,
        });
        assert!(matches!(result, Err(PipelineError::InvalidCrop { .. })));
    }

    // --- Mask color tests ---

    #[test]
    fn mask_color_matches_on_designated_channel_only() {
        let color = MaskColors::DEFAULT_CIRCLE;
        assert!(color.matches(&image::Rgb([255, 10, 20])));
        assert!(!color.matches(&image::Rgb([254, 0, 0])));
    }

    #[test]
    fn default_colors_are_channel_distinct() {
        assert!(MaskColors::default().channels_distinct());
    }

    // --- Percentage tests ---

    #[test]
    fn percent_of_thirty_and_seventy() {
        let pct = oil_plate_percent(30, 70).unwrap();
        assert!((pct - 30.0).abs() < 1e-12);
    }

    #[test]
    fn percent_with_zero_denominator_is_none() {
        assert!(oil_plate_percent(0, 0).is_none());
    }

    #[test]
    fn percent_all_oil_is_hundred() {
        let pct = oil_plate_percent(12, 0).unwrap();
        assert!((pct - 100.0).abs() < 1e-12);
    }

    // --- Config tests ---

    #[test]
    fn default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn even_block_size_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.threshold.block_size = 40;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn inverted_radius_range_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.hough.min_radius = 90;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn non_positive_rim_fraction_is_rejected() {
        for fraction in [0.0, -0.5, f64::NAN] {
            let mut config = AnalysisConfig::default();
            config.hough.min_rim_fraction = fraction;
            assert!(
                matches!(config.validate(), Err(PipelineError::InvalidConfig(_))),
                "{fraction} accepted"
            );
        }
    }

    #[test]
    fn colliding_mask_channels_are_rejected() {
        let mut config = AnalysisConfig::default();
        config.colors.oil = MaskColor::new([0, 0, 255], Channel::Red);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn canny_low_above_high_is_rejected() {
        let config = AnalysisConfig {
            canny_low: 300.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_round_trip_fills_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"oil_high": 55}"#).unwrap();
        assert_eq!(config.oil_high, 55);
        assert_eq!(config.plate_low, AnalysisConfig::DEFAULT_PLATE_LOW);
        assert_eq!(config.hough, HoughParams::default());
    }

    #[test]
    fn nested_config_fields_default_individually() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"hough": {"max_radius": 50}, "crop": {"top": 4}}"#).unwrap();
        assert_eq!(config.hough.max_radius, 50);
        assert_eq!(config.hough.accumulator_threshold, 30);
        assert_eq!(config.crop, Crop::new(4, 0, 0, 0));
    }

    #[test]
    fn layers_map_to_their_colors() {
        let colors = MaskColors::default();
        assert_eq!(colors.for_layer(Layer::Circles), MaskColors::DEFAULT_CIRCLE);
        assert_eq!(colors.for_layer(Layer::Oil), MaskColors::DEFAULT_OIL);
        assert_eq!(colors.for_layer(Layer::Plate), MaskColors::DEFAULT_PLATE);
        assert_eq!(Layer::ALL.map(Layer::name), ["circles", "oil", "plate"]);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(PipelineError::EmptyInput.kind(), "load");
        assert_eq!(PipelineError::NoCircles.kind(), "detection");
        assert_eq!(PipelineError::DegenerateMetric.kind(), "degenerate-metric");
    }
}
