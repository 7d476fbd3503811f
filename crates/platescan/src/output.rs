//! Output layout and image persistence.
//!
//! Annotated images land in `<images_dir>/<input's parent directory name>/<input file name>`.
//! Paths are composed explicitly; the process working directory is never
//! changed.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use platescan_pipeline::Layer;

use crate::error::ImageError;

/// Subdirectory of the output directory holding annotated images.
pub const IMAGES_DIR: &str = "images";

/// Where the annotated copy of `input` is written.
///
/// An input without a named parent directory (e.g. `plate.jpg`) is
/// written directly into `images_dir`.
#[must_use]
pub fn annotated_path(images_dir: &Path, input: &Path) -> PathBuf {
    let mut path = images_dir.to_path_buf();
    if let Some(parent) = input.parent().and_then(Path::file_name) {
        path.push(parent);
    }
    path.push(input.file_name().unwrap_or(input.as_os_str()));
    path
}

/// Where the grayscale channel image of `layer` is written, next to the
/// annotated image: `<stem>_<layer>.png`.
#[must_use]
pub fn overlay_path(annotated: &Path, layer: Layer) -> PathBuf {
    let stem = annotated
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    annotated.with_file_name(format!("{stem}_{}.png", layer.name()))
}

/// Save an RGB image, creating parent directories as needed.
///
/// The format follows the file extension.
///
/// # Errors
///
/// Returns [`ImageError::CreateDir`] or [`ImageError::Save`].
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<(), ImageError> {
    ensure_parent(path)?;
    image.save(path).map_err(|source| ImageError::Save {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a grayscale image, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ImageError::CreateDir`] or [`ImageError::Save`].
pub fn save_gray(image: &GrayImage, path: &Path) -> Result<(), ImageError> {
    ensure_parent(path)?;
    image.save(path).map_err(|source| ImageError::Save {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_parent(path: &Path) -> Result<(), ImageError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| ImageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::TempDir;
    use image::Rgb;

    #[test]
    fn annotated_path_mirrors_parent_directory_name() {
        let out = annotated_path(Path::new("results/images"), Path::new("/data/plates/day1/a.jpg"));
        assert_eq!(out, PathBuf::from("results/images/day1/a.jpg"));
    }

    #[test]
    fn bare_file_name_goes_straight_into_images_dir() {
        let out = annotated_path(Path::new("results/images"), Path::new("a.jpg"));
        assert_eq!(out, PathBuf::from("results/images/a.jpg"));
    }

    #[test]
    fn overlay_paths_sit_next_to_annotated_image() {
        let annotated = Path::new("results/images/day1/a.jpg");
        assert_eq!(
            overlay_path(annotated, Layer::Circles),
            PathBuf::from("results/images/day1/a_circles.png")
        );
        assert_eq!(
            overlay_path(annotated, Layer::Plate),
            PathBuf::from("results/images/day1/a_plate.png")
        );
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = TempDir::new("output-save");
        let path = dir.path().join("images/day1/a.png");
        let img = RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]));
        save_rgb(&img, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn unknown_extension_is_a_save_error() {
        let dir = TempDir::new("output-unknown");
        let path = dir.path().join("a.nope");
        let img = RgbImage::new(2, 2);
        let err = save_rgb(&img, &path).unwrap_err();
        assert_eq!(err.kind(), "save");
    }
}
