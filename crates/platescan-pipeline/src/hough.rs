//! Gradient Hough circle transform.
//!
//! Works in two passes, like the classic gradient method:
//!
//! 1. **Center voting.** Edges of the input are found with an internal
//!    Canny pass (`edge_threshold / 2`, `edge_threshold`). Every edge pixel
//!    casts one vote per radius along its gradient line, in both
//!    directions, into a 2D accumulator of resolution
//!    `1 / accumulator_resolution`. Votes land between cells, so each one
//!    is split bilinearly over its four neighbors.
//! 2. **Peak extraction.** The accumulator is Gaussian-smoothed and local
//!    maxima are found by suppression over a disk. Each peak is scored by
//!    the raw votes within [`REFINE_RADIUS`] cells and its center is the
//!    vote-weighted centroid of that window. Peaks scoring more than
//!    `accumulator_threshold` become candidates, strongest first.
//! 3. **Radius estimation.** For each candidate not within
//!    `min_center_distance` of an accepted center, edge pixels inside the
//!    search window are binned by their rounded distance to the center.
//!    A radius is supported when its three-bin window holds at least
//!    `min_rim_fraction` of its circumference and touches at least half
//!    of the angular sectors around the center. The best-supported radius
//!    wins; a candidate with none is dropped.

use image::Luma;
use imageproc::definitions::Image;

use crate::canny::{Gradients, canny_with_gradients};
use crate::edge::{clamp_thresholds, count_edge_pixels};
use crate::types::{Circle, GrayImage, HoughParams};

/// Gaussian sigma, in accumulator cells, applied before peak search.
const ACCUMULATOR_SIGMA: f32 = 1.0;

/// Radius, in cells, of the disk a peak must dominate.
const NMS_RADIUS: i64 = 2;

/// Radius, in cells, of the window scored and centroided around a peak.
const REFINE_RADIUS: i64 = 2;

/// Angular sectors a rim is checked against.
const RIM_SECTORS: u32 = 16;

/// Sectors a supported radius must touch.
const MIN_RIM_SECTORS: u32 = RIM_SECTORS / 2;

/// Result of a circle search.
///
/// The empty case is a distinct variant so callers decide explicitly
/// what "nothing found" means for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoughOutcome {
    /// No candidate center gathered enough support.
    NoCirclesFound,
    /// Accepted circles, strongest center first. Never empty.
    Circles(Vec<Circle>),
}

impl HoughOutcome {
    /// Detected circles (empty slice for [`Self::NoCirclesFound`]).
    #[must_use]
    pub fn circles(&self) -> &[Circle] {
        match self {
            Self::NoCirclesFound => &[],
            Self::Circles(circles) => circles,
        }
    }

    /// Consume the outcome and return the circle list.
    #[must_use]
    pub fn into_circles(self) -> Vec<Circle> {
        match self {
            Self::NoCirclesFound => Vec::new(),
            Self::Circles(circles) => circles,
        }
    }
}

/// Circle search output plus the counts the diagnostics report.
#[derive(Debug, Clone)]
pub struct HoughSearch {
    /// Found circles, or the explicit empty variant.
    pub outcome: HoughOutcome,
    /// Edge pixels produced by the internal Canny pass.
    pub edge_pixel_count: u64,
    /// Accumulator peaks above the vote threshold.
    pub candidate_count: usize,
}

/// A scored accumulator peak, in image coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f64,
    y: f64,
    score: f32,
}

/// Search `image` for circles.
#[must_use = "returns the circle search result"]
pub fn hough_circles(image: &GrayImage, params: &HoughParams) -> HoughSearch {
    let gradients = Gradients::sobel(image);
    let (low, high) = clamp_thresholds(params.edge_threshold / 2.0, params.edge_threshold);
    let edges = canny_with_gradients(&gradients, low, high);
    let edge_pixel_count = count_edge_pixels(&edges);

    let max_radius = params.max_radius.max(1);
    let min_radius = params.min_radius.clamp(1, max_radius);
    let resolution = params.accumulator_resolution.max(1);

    let accumulator = Accumulator::vote(&edges, &gradients, resolution, min_radius, max_radius);
    #[allow(clippy::cast_precision_loss)]
    let candidates = accumulator.candidates(params.accumulator_threshold as f32);
    let candidate_count = candidates.len();

    let min_distance_sq = params.min_center_distance * params.min_center_distance;
    let mut accepted: Vec<(f64, f64, u32)> = Vec::new();
    for candidate in candidates {
        let crowded = accepted.iter().any(|&(ax, ay, _)| {
            let (dx, dy) = (ax - candidate.x, ay - candidate.y);
            dx.mul_add(dx, dy * dy) < min_distance_sq
        });
        if crowded {
            continue;
        }
        if let Some(radius) = estimate_radius(
            &edges,
            (candidate.x, candidate.y),
            min_radius,
            max_radius,
            params.min_rim_fraction,
        ) {
            accepted.push((candidate.x, candidate.y, radius));
        }
    }

    let outcome = if accepted.is_empty() {
        HoughOutcome::NoCirclesFound
    } else {
        HoughOutcome::Circles(
            accepted
                .into_iter()
                .map(|(x, y, radius)| Circle {
                    x: to_pixel(x),
                    y: to_pixel(y),
                    radius,
                })
                .collect(),
        )
    };

    HoughSearch {
        outcome,
        edge_pixel_count,
        candidate_count,
    }
}

/// Center-vote accumulator. Cell `(i, j)` sits at image point
/// `(i * resolution, j * resolution)`.
struct Accumulator {
    votes: Image<Luma<f32>>,
    resolution: u32,
}

impl Accumulator {
    /// Cast votes from every edge pixel along its gradient line.
    #[allow(clippy::cast_precision_loss)]
    fn vote(
        edges: &GrayImage,
        gradients: &Gradients,
        resolution: u32,
        min_radius: u32,
        max_radius: u32,
    ) -> Self {
        let width = edges.width().div_ceil(resolution);
        let height = edges.height().div_ceil(resolution);
        let mut votes = Image::<Luma<f32>>::new(width, height);
        let scale = resolution as f32;
        let x_limit = width.saturating_sub(1) as f32;
        let y_limit = height.saturating_sub(1) as f32;

        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel.0[0] == 0 {
                continue;
            }
            let (gx, gy) = gradients.at(x, y);
            let magnitude = gx.hypot(gy);
            if magnitude == 0.0 {
                continue;
            }
            let (ux, uy) = (gx / magnitude, gy / magnitude);
            let (px, py) = (x as f32, y as f32);

            for sign in [1.0f32, -1.0] {
                for r in min_radius..=max_radius {
                    let step = sign * r as f32;
                    let ax = ux.mul_add(step, px) / scale;
                    let ay = uy.mul_add(step, py) / scale;
                    // The ray leaves the rectangle for good once it is out.
                    if ax < 0.0 || ay < 0.0 || ax >= x_limit || ay >= y_limit {
                        break;
                    }
                    bilinear_add(&mut votes, ax, ay);
                }
            }
        }

        Self { votes, resolution }
    }

    /// Smoothed local maxima whose raw window score beats `threshold`,
    /// strongest first, as image-space centers.
    fn candidates(&self, threshold: f32) -> Vec<Candidate> {
        let (width, height) = self.votes.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let smoothed = imageproc::filter::gaussian_blur_f32(&self.votes, ACCUMULATOR_SIGMA);
        let neighborhood = disk_offsets(NMS_RADIUS);

        let mut found: Vec<(Candidate, u64)> = Vec::new();
        for cy in 0..i64::from(height) {
            for cx in 0..i64::from(width) {
                let value = sample(&smoothed, cx, cy).unwrap_or(0.0);
                if value <= 0.0 {
                    continue;
                }
                let order = linear_index(cx, cy, width);
                let dominated = neighborhood.iter().any(|&(dx, dy)| {
                    let (nx, ny) = (cx + dx, cy + dy);
                    sample(&smoothed, nx, ny).is_some_and(|other| {
                        other > value || (other == value && linear_index(nx, ny, width) < order)
                    })
                });
                if dominated {
                    continue;
                }
                if let Some(candidate) = self.refine(cx, cy)
                    && candidate.score > threshold
                {
                    found.push((candidate, order));
                }
            }
        }

        found.sort_by(|a, b| b.0.score.total_cmp(&a.0.score).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(candidate, _)| candidate).collect()
    }

    /// Score the raw votes around cell `(cx, cy)` and locate their centroid.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn refine(&self, cx: i64, cy: i64) -> Option<Candidate> {
        let mut total = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        for (dx, dy) in disk_offsets(REFINE_RADIUS).into_iter().chain([(0, 0)]) {
            let (nx, ny) = (cx + dx, cy + dy);
            if let Some(v) = sample(&self.votes, nx, ny) {
                let v = f64::from(v);
                total += v;
                sum_x += v * nx as f64;
                sum_y += v * ny as f64;
            }
        }
        if total <= 0.0 {
            return None;
        }
        let scale = f64::from(self.resolution);
        Some(Candidate {
            x: sum_x / total * scale,
            y: sum_y / total * scale,
            score: total as f32,
        })
    }
}

/// Split one vote at sub-cell position `(x, y)` over its four neighbors.
///
/// `x` and `y` must be non-negative and below `width - 1`, `height - 1`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bilinear_add(votes: &mut Image<Luma<f32>>, x: f32, y: f32) {
    let (x0, y0) = (x as u32, y as u32);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    votes.get_pixel_mut(x0, y0).0[0] += (1.0 - fx) * (1.0 - fy);
    votes.get_pixel_mut(x0 + 1, y0).0[0] += fx * (1.0 - fy);
    votes.get_pixel_mut(x0, y0 + 1).0[0] += (1.0 - fx) * fy;
    votes.get_pixel_mut(x0 + 1, y0 + 1).0[0] += fx * fy;
}

/// Offsets within a disk of `radius`, excluding the origin.
fn disk_offsets(radius: i64) -> Vec<(i64, i64)> {
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if (dx, dy) != (0, 0) && dx * dx + dy * dy <= radius * radius {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Value at `(x, y)`, or `None` outside the image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample(image: &Image<Luma<f32>>, x: i64, y: i64) -> Option<f32> {
    let (width, height) = image.dimensions();
    if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
        return None;
    }
    Some(image.get_pixel(x as u32, y as u32).0[0])
}

#[allow(clippy::cast_sign_loss)]
fn linear_index(x: i64, y: i64, width: u32) -> u64 {
    y as u64 * u64::from(width) + x as u64
}

/// Pick the best-supported radius around `center`, if any is supported.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn estimate_radius(
    edges: &GrayImage,
    center: (f64, f64),
    min_radius: u32,
    max_radius: u32,
    min_rim_fraction: f64,
) -> Option<u32> {
    let (cx, cy) = center;
    let reach = f64::from(max_radius) + 1.0;
    let x0 = (cx - reach).floor().max(0.0) as u32;
    let y0 = (cy - reach).floor().max(0.0) as u32;
    let x1 = ((cx + reach).ceil().max(0.0) as u32).min(edges.width().saturating_sub(1));
    let y1 = ((cy + reach).ceil().max(0.0) as u32).min(edges.height().saturating_sub(1));

    let bins = max_radius as usize + 2;
    let mut counts = vec![0u32; bins];
    let mut sectors = vec![0u32; bins];
    for y in y0..=y1 {
        for x in x0..=x1 {
            if edges.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            let (dx, dy) = (f64::from(x) - cx, f64::from(y) - cy);
            let bin = dx.hypot(dy).round() as usize;
            if bin < bins {
                counts[bin] += 1;
                sectors[bin] |= 1 << sector_of(dx, dy);
            }
        }
    }

    let mut best: Option<(u32, u32)> = None;
    for r in min_radius..=max_radius {
        let i = r as usize;
        let support = counts[i - 1] + counts[i] + counts[i + 1];
        let covered = (sectors[i - 1] | sectors[i] | sectors[i + 1]).count_ones();
        let needed = min_rim_fraction * std::f64::consts::TAU * f64::from(r);
        if f64::from(support) < needed || covered < MIN_RIM_SECTORS {
            continue;
        }
        if best.is_none_or(|(_, s)| support > s) {
            best = Some((r, support));
        }
    }
    best.map(|(r, _)| r)
}

/// Angular sector, `0..RIM_SECTORS`, of the direction `(dx, dy)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sector_of(dx: f64, dy: f64) -> u32 {
    let turn = (dy.atan2(dx) + std::f64::consts::PI) / std::f64::consts::TAU;
    ((turn * f64::from(RIM_SECTORS)) as u32).min(RIM_SECTORS - 1)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixel(coordinate: f64) -> u32 {
    coordinate.round().max(0.0) as u32
}
