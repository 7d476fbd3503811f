//! Circle detection and circle overlay painting.
//!
//! Rims are found on a binarized copy of the image:
//!
//! 1. luminance
//! 2. Gaussian blur (`blur_sigma`)
//! 3. inverted adaptive threshold (dark-against-surroundings becomes white)
//! 4. Canny (`canny_low`, `canny_high`)
//! 5. gradient Hough circle transform
//!
//! Every circle found is then painted as a solid disk of the circle mask
//! color onto a copy of the *original* image, never onto the binarized
//! intermediates.

use imageproc::drawing::draw_filled_circle_mut;

use crate::hough::{HoughOutcome, hough_circles};
use crate::types::{AnalysisConfig, GrayImage, MaskColor, RgbImage};

/// Output of the circle stage.
#[derive(Debug, Clone)]
pub struct CircleDetection {
    /// Copy of the input with every detected disk painted.
    pub image: RgbImage,
    /// What the detector found.
    pub outcome: HoughOutcome,
    /// Pixels of `image` matching the circle color on its channel.
    pub circle_pixel_count: u64,
    /// Edge pixels of the Canny pass over the rim mask.
    pub rim_edge_pixel_count: u64,
    /// Edge pixels the circle transform voted with.
    pub hough_edge_pixel_count: u64,
    /// Accumulator peaks considered by the circle transform.
    pub candidate_count: usize,
}

impl CircleDetection {
    /// Number of detected circles.
    #[must_use]
    pub fn circle_count(&self) -> usize {
        self.outcome.circles().len()
    }
}

/// Build the binary rim edge map the circle transform runs on.
#[must_use = "returns the rim edge map"]
pub fn rim_edges(image: &RgbImage, config: &AnalysisConfig) -> GrayImage {
    let luma = crate::color::to_luminance(image);
    let smooth = crate::blur::gaussian_blur(&luma, config.blur_sigma);
    let rims = crate::threshold::adaptive_threshold_inv(&smooth, &config.threshold);
    crate::edge::canny(&rims, config.canny_low, config.canny_high)
}

/// Detect circles in `image` and paint them with `config.colors.circle`.
///
/// When nothing is found the returned image equals the input and both
/// counts are zero; whether that is acceptable is the caller's policy.
#[must_use = "returns the annotated image and counts"]
pub fn detect_and_mask(image: &RgbImage, config: &AnalysisConfig) -> CircleDetection {
    let edges = rim_edges(image, config);
    let rim_edge_pixel_count = crate::edge::count_edge_pixels(&edges);
    let search = hough_circles(&edges, &config.hough);

    let mut annotated = image.clone();
    let circle_pixel_count = match &search.outcome {
        HoughOutcome::NoCirclesFound => 0,
        HoughOutcome::Circles(circles) => {
            let color = config.colors.circle;
            for circle in circles {
                paint_disk(&mut annotated, circle.x, circle.y, circle.radius, color);
            }
            count_matching(&annotated, color)
        }
    };

    CircleDetection {
        image: annotated,
        outcome: search.outcome,
        circle_pixel_count,
        rim_edge_pixel_count,
        hough_edge_pixel_count: search.edge_pixel_count,
        candidate_count: search.candidate_count,
    }
}

/// Pixels whose designated channel equals the mask color's value there.
#[must_use]
pub fn count_matching(image: &RgbImage, color: MaskColor) -> u64 {
    image.pixels().map(|p| u64::from(color.matches(p))).sum()
}

#[allow(clippy::cast_possible_wrap)]
fn paint_disk(image: &mut RgbImage, x: u32, y: u32, radius: u32, color: MaskColor) {
    draw_filled_circle_mut(
        image,
        (x as i32, y as i32),
        radius as i32,
        color.pixel(),
    );
}
