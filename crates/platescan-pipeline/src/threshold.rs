//! Inverted adaptive thresholding.
//!
//! Each pixel is compared with the (mean or Gaussian-weighted) level of
//! the `block_size x block_size` window around it. Pixels at least
//! `offset` darker than their surroundings become foreground (255),
//! everything else background (0). Plate rims are darker than the plate
//! around them, so the foreground traces the rims.
//!
//! Borders replicate the outermost pixels.

use image::Luma;

use crate::blur::sigma_for_kernel;
use crate::types::{AdaptiveMethod, AdaptiveThreshold, GrayImage};

/// Binarize `image` against its local reference level, inverted.
///
/// A pixel is foreground when `pixel <= reference - offset`.
/// `block_size` is expected odd; an even value is treated as the next
/// odd size.
#[must_use = "returns the binary threshold image"]
pub fn adaptive_threshold_inv(image: &GrayImage, params: &AdaptiveThreshold) -> GrayImage {
    let radius = params.block_size / 2;
    let reference = match params.method {
        AdaptiveMethod::Mean => imageproc::filter::box_filter(image, radius, radius),
        AdaptiveMethod::Gaussian => {
            imageproc::filter::gaussian_blur_f32(image, sigma_for_kernel(2 * radius + 1))
        }
    };

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = i16::from(image.get_pixel(x, y).0[0]);
        let level = i16::from(reference.get_pixel(x, y).0[0]);
        if pixel <= level.saturating_sub(params.offset) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
