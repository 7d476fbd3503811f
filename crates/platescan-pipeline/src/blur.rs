//! Gaussian smoothing for noise suppression before thresholding.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Besides the plain
//! sigma-driven blur, [`sigma_for_kernel`] maps an odd kernel size to the
//! sigma a fixed-size Gaussian kernel of that size implies, which lets the
//! pipeline and the adaptive threshold describe their smoothing by
//! window size.

use crate::types::GrayImage;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Sigma implied by a Gaussian kernel of side `kernel_size`.
///
/// `0.3 * ((k - 1) / 2 - 1) + 0.8`: a 5x5 kernel gives 1.1, a 41x41
/// kernel gives 6.5.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    let half = (kernel_size.max(1) - 1) as f32 * 0.5;
    0.3f32.mul_add(half - 1.0, 0.8)
}
