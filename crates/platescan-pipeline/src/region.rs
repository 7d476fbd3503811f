//! Threshold-based region masks: oil and plate.
//!
//! Each mask selects pixels by a per-pixel predicate over one derived
//! scalar, repaints the selection with the region's mask color on a copy
//! of the input, and reports how many pixels were selected.
//!
//! - **Oil**: HSV value (brightness) strictly below `oil_high`.
//! - **Plate**: green channel strictly above `plate_low`.
//!
//! The pipeline applies oil, then plate, onto the same working image.
//! Where both predicates hold, the plate color overwrites the oil color.

use image::Rgb;

use crate::color::hsv_value;
use crate::types::{Channel, MaskColor, PipelineError, RgbImage};

/// Output of one mask stage.
#[derive(Debug, Clone)]
pub struct RegionMask {
    /// Copy of the input with selected pixels repainted.
    pub image: RgbImage,
    /// Number of selected pixels.
    pub pixel_count: u64,
}

/// Repaint dark pixels (HSV value `< oil_high`) with `color`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if `image` has no pixels.
pub fn mask_oil(
    image: &RgbImage,
    oil_high: u8,
    color: MaskColor,
) -> Result<RegionMask, PipelineError> {
    mask_where(image, color, |p| hsv_value(*p) < oil_high)
}

/// Repaint bright-green pixels (green `> plate_low`) with `color`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if `image` has no pixels.
pub fn mask_plate(
    image: &RgbImage,
    plate_low: u8,
    color: MaskColor,
) -> Result<RegionMask, PipelineError> {
    mask_where(image, color, |p| p.0[Channel::Green.index()] > plate_low)
}

/// Repaint every pixel satisfying `selected` with `color`.
///
/// Pixels that do not satisfy the predicate are copied unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if `image` has no pixels.
pub fn mask_where(
    image: &RgbImage,
    color: MaskColor,
    selected: impl Fn(&Rgb<u8>) -> bool,
) -> Result<RegionMask, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "cannot mask a {}x{} image",
            image.width(),
            image.height()
        )));
    }

    let mut out = image.clone();
    let mut pixel_count = 0u64;
    for pixel in out.pixels_mut() {
        if selected(pixel) {
            *pixel = color.pixel();
            pixel_count += 1;
        }
    }
    Ok(RegionMask {
        image: out,
        pixel_count,
    })
}
