//! Image decoding and fixed-margin cropping.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! cropped RGB working image every later stage operates on.

use image::DynamicImage;

use crate::types::{Crop, Dimensions, PipelineError, RgbImage};

/// Decode raw image bytes, sniffing the format from the content.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Convert an already-decoded image to RGB and apply `crop`.
///
/// Alpha is dropped. A margin of `0` keeps that edge where it is.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidCrop`] if the margins leave no pixels.
pub fn crop_image(image: &DynamicImage, crop: Crop) -> Result<RgbImage, PipelineError> {
    let rgb = image.to_rgb8();
    crop_rgb(&rgb, crop)
}

/// Apply `crop` to an RGB image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidCrop`] if the margins leave no pixels.
pub fn crop_rgb(image: &RgbImage, crop: Crop) -> Result<RgbImage, PipelineError> {
    let Dimensions { width, height } = crop.apply_to(Dimensions {
        width: image.width(),
        height: image.height(),
    })?;
    if crop == Crop::default() {
        return Ok(image.clone());
    }
    Ok(image::imageops::crop_imm(image, crop.left, crop.top, width, height).to_image())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGB image as PNG bytes.
    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    /// Each pixel encodes its own coordinates so crops can be located.
    #[allow(clippy::cast_possible_truncation)]
    fn coordinate_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn zero_crop_keeps_whole_image() {
        let img = coordinate_image(17, 31);
        let decoded = decode(&encode_png(&img)).unwrap();
        let cropped = crop_image(&decoded, Crop::default()).unwrap();
        assert_eq!(cropped, img);
    }

    #[test]
    fn cropped_size_subtracts_margins() {
        let img = coordinate_image(40, 30);
        let cropped = crop_rgb(&img, Crop::new(2, 3, 4, 5)).unwrap();
        assert_eq!(cropped.width(), 40 - 5 - 3);
        assert_eq!(cropped.height(), 30 - 2 - 4);
    }

    #[test]
    fn crop_origin_is_top_left_margin() {
        let img = coordinate_image(40, 30);
        let cropped = crop_rgb(&img, Crop::new(2, 3, 4, 5)).unwrap();
        assert_eq!(cropped.get_pixel(0, 0).0, [5, 2, 7]);
        // Last kept column and row sit just inside the right/bottom margins.
        let (w, h) = cropped.dimensions();
        assert_eq!(cropped.get_pixel(w - 1, h - 1).0, [36, 25, 7]);
    }

    #[test]
    fn zero_trailing_margins_keep_natural_boundary() {
        let img = coordinate_image(20, 10);
        let cropped = crop_rgb(&img, Crop::new(3, 0, 0, 4)).unwrap();
        assert_eq!(cropped.dimensions(), (16, 7));
        assert_eq!(cropped.get_pixel(15, 6).0, [19, 9, 7]);
    }

    #[test]
    fn crop_consuming_image_is_rejected() {
        let img = coordinate_image(10, 10);
        let result = crop_rgb(&img, Crop::new(5, 0, 5, 0));
        assert!(matches!(result, Err(PipelineError::InvalidCrop { .. })));
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = image::RgbaImage::from_pixel(3, 3, image::Rgba([10, 20, 30, 0]));
        let cropped = crop_image(&DynamicImage::ImageRgba8(rgba), Crop::default()).unwrap();
        assert_eq!(cropped.get_pixel(1, 1).0, [10, 20, 30]);
    }
}
