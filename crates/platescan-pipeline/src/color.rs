//! Scalar projections of RGB pixels.
//!
//! The circle stage works on luminance; the oil stage works on the HSV
//! value (brightness) channel. Both are derived per pixel, so they live
//! here as plain functions over `Rgb<u8>` plus whole-image wrappers.

use image::{Luma, Rgb};

use crate::types::{Channel, GrayImage, Layer, MaskColors, RgbImage};

/// ITU-R BT.601 luma in 8-bit fixed point: `0.299*R + 0.587*G + 0.114*B`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn luminance(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    // Weights scaled by 2^14, rounded; sum is exactly 16384.
    let y = 4899 * u32::from(r) + 9617 * u32::from(g) + 1868 * u32::from(b);
    ((y + (1 << 13)) >> 14) as u8
}

/// HSV value channel: the largest of the three components.
#[must_use]
pub fn hsv_value(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    r.max(g).max(b)
}

/// Convert an RGB image to single-channel luminance.
#[must_use = "returns the luminance image"]
pub fn to_luminance(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luminance(*image.get_pixel(x, y))])
    })
}

/// Copy one raw channel of an RGB image into a grayscale image.
#[must_use = "returns the channel image"]
pub fn channel_image(image: &RgbImage, channel: Channel) -> GrayImage {
    let i = channel.index();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[i]])
    })
}

/// The designated channel of `layer`'s mask color, as a grayscale image.
///
/// Pixels painted with that overlay read as the mask color's channel value.
#[must_use = "returns the channel image"]
pub fn overlay_channel(image: &RgbImage, colors: &MaskColors, layer: Layer) -> GrayImage {
    channel_image(image, colors.for_layer(layer).channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_of_extremes() {
        assert_eq!(luminance(Rgb([0, 0, 0])), 0);
        assert_eq!(luminance(Rgb([255, 255, 255])), 255);
    }

    #[test]
    fn luminance_weights_green_over_red_over_blue() {
        let r = luminance(Rgb([255, 0, 0]));
        let g = luminance(Rgb([0, 255, 0]));
        let b = luminance(Rgb([0, 0, 255]));
        assert_eq!((r, g, b), (76, 150, 29));
    }

    #[test]
    fn gray_pixels_keep_their_level() {
        for level in [1u8, 64, 128, 200, 254] {
            assert_eq!(luminance(Rgb([level; 3])), level);
        }
    }

    #[test]
    fn value_is_channel_maximum() {
        assert_eq!(hsv_value(Rgb([10, 200, 30])), 200);
        assert_eq!(hsv_value(Rgb([0, 0, 69])), 69);
    }

    #[test]
    fn luminance_image_keeps_dimensions() {
        let img = RgbImage::from_pixel(7, 5, Rgb([90, 90, 90]));
        let luma = to_luminance(&img);
        assert_eq!(luma.dimensions(), (7, 5));
        assert_eq!(luma.get_pixel(3, 3).0[0], 90);
    }

    #[test]
    fn channel_image_copies_raw_values() {
        let img = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        assert_eq!(channel_image(&img, Channel::Red).get_pixel(0, 0).0[0], 1);
        assert_eq!(channel_image(&img, Channel::Green).get_pixel(2, 1).0[0], 2);
        assert_eq!(channel_image(&img, Channel::Blue).get_pixel(1, 1).0[0], 3);
    }
}
