//! Canny edge detection over precomputed Sobel gradients.
//!
//! Unlike `imageproc::edges::canny`, this variant does not blur its
//! input: the pipeline runs Canny on an already-binarized rim mask, and
//! the circle transform needs the very same gradients to orient its
//! votes, so [`Gradients`] is computed once and shared.
//!
//! Hysteresis visits all 8 neighbors and bounds-checks every neighbor
//! coordinate, so edges touching the image border are safe
//! (see <https://github.com/image-rs/imageproc/issues/705>).

use image::Luma;
use imageproc::definitions::Image;

use crate::types::GrayImage;

/// Horizontal and vertical 3x3 Sobel responses of a grayscale image.
pub struct Gradients {
    gx: Image<Luma<i16>>,
    gy: Image<Luma<i16>>,
}

impl Gradients {
    /// Compute Sobel gradients of `image`.
    #[must_use]
    pub fn sobel(image: &GrayImage) -> Self {
        Self {
            gx: imageproc::gradients::horizontal_sobel(image),
            gy: imageproc::gradients::vertical_sobel(image),
        }
    }

    /// Width and height of the gradient images.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.gx.dimensions()
    }

    /// Gradient vector `(gx, gy)` at `(x, y)`.
    #[must_use]
    pub fn at(&self, x: u32, y: u32) -> (f32, f32) {
        (
            f32::from(self.gx.get_pixel(x, y).0[0]),
            f32::from(self.gy.get_pixel(x, y).0[0]),
        )
    }

    /// Euclidean gradient magnitude at `(x, y)`.
    #[must_use]
    pub fn magnitude(&self, x: u32, y: u32) -> f32 {
        let (gx, gy) = self.at(x, y);
        gx.hypot(gy)
    }
}

/// Run Canny on `image` without pre-blurring.
///
/// Returns a binary image: 255 for edge pixels, 0 otherwise.
/// `low_threshold` must not exceed `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny_with_gradients(&Gradients::sobel(image), low_threshold, high_threshold)
}

/// Run non-maximum suppression and hysteresis on precomputed gradients.
#[must_use = "returns the binary edge map"]
pub fn canny_with_gradients(
    gradients: &Gradients,
    low_threshold: f32,
    high_threshold: f32,
) -> GrayImage {
    let thinned = non_maximum_suppression(gradients);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Keep only pixels whose magnitude is a maximum across the edge.
///
/// The outermost ring of pixels is always suppressed.
fn non_maximum_suppression(gradients: &Gradients) -> Image<Luma<f32>> {
    let (w, h) = gradients.dimensions();
    let mut out = Image::from_pixel(w, h, Luma([0.0f32]));
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (gx, gy) = gradients.at(x, y);
            let magnitude = gx.hypot(gy);
            if magnitude == 0.0 {
                continue;
            }
            let mut angle = gy.atan2(gx).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            let (a, b) = if (22.5..67.5).contains(&angle) {
                ((x + 1, y + 1), (x - 1, y - 1))
            } else if (67.5..112.5).contains(&angle) {
                ((x, y - 1), (x, y + 1))
            } else if (112.5..157.5).contains(&angle) {
                ((x - 1, y + 1), (x + 1, y - 1))
            } else {
                ((x - 1, y), (x + 1, y))
            };
            if magnitude >= gradients.magnitude(a.0, a.1)
                && magnitude >= gradients.magnitude(b.0, b.1)
            {
                out.put_pixel(x, y, Luma([magnitude]));
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges 8-connected to them.
fn hysteresis(input: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (w, h) = input.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if input.get_pixel(x, y).0[0] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (Some(nx), Some(ny)) =
                        (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    if input.get_pixel(nx, ny).0[0] >= low && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, Luma([255]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
